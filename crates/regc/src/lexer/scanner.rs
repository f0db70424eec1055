//! Buffered scanner over the logos token stream

use logos::Logos;

use super::token::{Token, TokenKind};
use crate::common::{CompileError, CompileResult, Span};

/// Lexer with a peek buffer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
    /// Peeked tokens (supports multi-token lookahead)
    peeked: Vec<Token>,
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            peeked: Vec::new(),
            at_eof: false,
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> CompileResult<Token> {
        if !self.peeked.is_empty() {
            return Ok(self.peeked.remove(0));
        }

        self.scan_token()
    }

    fn scan_token(&mut self) -> CompileResult<Token> {
        if self.at_eof {
            let len = self.inner.source().len();
            return Ok(Token::new(TokenKind::Eof, Span::new(len, len)));
        }

        match self.inner.next() {
            Some(Ok(kind)) => Ok(Token::new(kind, self.inner.span().into())),
            Some(Err(())) => Err(CompileError::lexer(
                format!("unexpected character '{}'", self.inner.slice()),
                self.inner.span().into(),
            )),
            None => {
                self.at_eof = true;
                let len = self.inner.source().len();
                Ok(Token::new(TokenKind::Eof, Span::new(len, len)))
            }
        }
    }

    /// Peek at the next token without consuming it
    pub fn peek(&mut self) -> CompileResult<&Token> {
        self.peek_at(0)
    }

    /// Peek at the token at offset (0 = next, 1 = after next)
    pub fn peek_at(&mut self, offset: usize) -> CompileResult<&Token> {
        while self.peeked.len() <= offset {
            let token = self.scan_token()?;
            self.peeked.push(token);
        }
        Ok(&self.peeked[offset])
    }

    /// Check if the next token matches the expected kind
    pub fn check(&mut self, expected: &TokenKind) -> CompileResult<bool> {
        Ok(std::mem::discriminant(&self.peek()?.kind) == std::mem::discriminant(expected))
    }

    /// Check the token after the next one (2-token lookahead)
    pub fn check_lookahead(&mut self, expected: &TokenKind) -> CompileResult<bool> {
        let token = self.peek_at(1)?;
        Ok(std::mem::discriminant(&token.kind) == std::mem::discriminant(expected))
    }

    /// Consume the next token if it matches, return true if consumed
    pub fn match_token(&mut self, expected: &TokenKind) -> CompileResult<bool> {
        if self.check(expected)? {
            self.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Expect a specific token kind, error if not found
    pub fn expect(&mut self, expected: TokenKind) -> CompileResult<Token> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token.kind) == std::mem::discriminant(&expected) {
            Ok(token)
        } else {
            Err(CompileError::parser(
                format!("expected {}, found {}", expected, token.kind),
                token.span,
            ))
        }
    }

    /// Tokenize the entire source, ending with `Eof`
    pub fn tokenize_all(mut self) -> CompileResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_and_perms() {
        let source = "fn let struct region uni mut imm const out opaq as";
        let kinds: Vec<_> = Lexer::new(source)
            .tokenize_all()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect();

        assert_eq!(
            kinds,
            vec![
                TokenKind::Fn,
                TokenKind::Let,
                TokenKind::Struct,
                TokenKind::Region,
                TokenKind::Uni,
                TokenKind::Mut,
                TokenKind::Imm,
                TokenKind::Const,
                TokenKind::Out,
                TokenKind::Opaq,
                TokenKind::As,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_perm_names() {
        assert_eq!(TokenKind::Imm.perm_name(), Some("imm"));
        assert_eq!(TokenKind::Fn.perm_name(), None);
    }

    #[test]
    fn test_literals() {
        let source = "42 0xFF 1.5 counter";
        let mut lexer = Lexer::new(source);

        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::IntLiteral(s) if s == "42"));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::HexLiteral(s) if s == "0xFF"));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::FloatLiteral(s) if s == "1.5"));
        assert!(matches!(
            lexer.next_token().unwrap().kind,
            TokenKind::Identifier(s) if s == "counter"
        ));
    }

    #[test]
    fn test_operators() {
        let source = "+ - == != <= >= && || -> & ? ~";
        let kinds: Vec<_> = Lexer::new(source)
            .tokenize_all()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect();

        assert_eq!(
            kinds,
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::Arrow,
                TokenKind::Amp,
                TokenKind::Question,
                TokenKind::Tilde,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lookahead_keeps_order() {
        let mut lexer = Lexer::new("a b c");
        assert!(lexer.check_lookahead(&TokenKind::Identifier(String::new())).unwrap());
        assert!(matches!(&lexer.peek_at(2).unwrap().kind, TokenKind::Identifier(s) if s == "c"));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Identifier(s) if s == "a"));
        assert!(lexer.match_token(&TokenKind::Identifier(String::new())).unwrap());
        assert!(lexer.expect(TokenKind::Semi).is_err());
    }

    #[test]
    fn test_comments_and_error() {
        let mut lexer = Lexer::new("fn // line\n/* block */ main");
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Fn));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Identifier(s) if s == "main"));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Eof));

        let err = Lexer::new("a $ b").tokenize_all().unwrap_err();
        assert_eq!(err.span(), Some(Span::new(2, 3)));
    }
}
