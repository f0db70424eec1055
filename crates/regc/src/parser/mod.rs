//! Recursive descent parser producing the IR

#[allow(clippy::module_inception)]
mod parser;

pub use parser::Parser;
