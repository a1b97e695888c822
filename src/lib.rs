pub mod ast;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod resolver;
mod span;

pub use interpreter::{Interpreter, Store, Value};
pub use span::Span;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] parser::ParseError),
    #[error(transparent)]
    Resolve(#[from] resolver::ResolveError),
    #[error(transparent)]
    Runtime(#[from] interpreter::RuntimeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Run the name resolver before interpreting.
    pub check_names: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { check_names: true }
    }
}

/// Lexes, parses, optionally resolves, and runs `source`, failing on the
/// first error of any stage.
pub fn interpret(source: &str, options: Options) -> Result<Store, Error> {
    let program = parser::program(source)?;
    if options.check_names {
        resolver::resolve(&program)?;
    }
    Ok(Interpreter::run(&program)?)
}
