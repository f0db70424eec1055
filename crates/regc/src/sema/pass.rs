//! Analyzer passes and the state threaded through them

use crate::ir::TypeId;

/// Analyzer passes in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pass {
    /// Register top-level names
    Global,
    NameResolution,
    TypeCheck,
    /// Move and control-flow checks
    Flow,
}

impl Pass {
    pub const ALL: [Pass; 4] = [Pass::Global, Pass::NameResolution, Pass::TypeCheck, Pass::Flow];

    pub fn name(self) -> &'static str {
        match self {
            Pass::Global => "global",
            Pass::NameResolution => "resolve",
            Pass::TypeCheck => "typecheck",
            Pass::Flow => "flow",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// What holds for the program once this pass has run
    pub fn postcondition(self) -> &'static str {
        match self {
            Pass::Global => "every top-level name is bound to exactly one declaration",
            Pass::NameResolution => "every known name use points at its declaration",
            Pass::TypeCheck => "every expression carries its type and every coercion is classified",
            Pass::Flow => "no moved unique reference is used again",
        }
    }
}

/// Per-walk context handed to each node handler
#[derive(Debug, Clone, PartialEq)]
pub struct PassState {
    pub pass: Pass,
    /// Return type of the function being walked
    pub fn_ret: Option<TypeId>,
    pub loop_depth: u32,
}

impl PassState {
    pub fn new(pass: Pass) -> Self {
        Self {
            pass,
            fn_ret: None,
            loop_depth: 0,
        }
    }

    /// Fresh state for the body of a function returning `ret`
    pub fn enter_fn(&mut self, ret: TypeId) {
        self.fn_ret = Some(ret);
        self.loop_depth = 0;
    }

    pub fn in_loop(&self) -> bool {
        self.loop_depth > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_names_round_trip() {
        for pass in Pass::ALL {
            assert_eq!(Pass::from_name(pass.name()), Some(pass));
        }
        assert_eq!(Pass::from_name("codegen"), None);
    }

    #[test]
    fn test_passes_are_ordered() {
        assert!(Pass::Global < Pass::NameResolution);
        assert!(Pass::TypeCheck < Pass::Flow);
    }

    #[test]
    fn test_enter_fn_resets_loops() {
        let mut state = PassState::new(Pass::TypeCheck);
        state.loop_depth = 2;
        assert!(state.in_loop());
        state.enter_fn(TypeId::default());
        assert!(!state.in_loop());
        assert_eq!(state.fn_ret, Some(TypeId::default()));
    }
}
