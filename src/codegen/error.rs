//! Compile-time error types.
//!
//! These are exactly the fatal kinds spec.md §7 enumerates, plus the one
//! extension this crate adds for a quirk it chooses to reject rather
//! than miscompile (`UnsupportedCapture`, SPEC_FULL.md §11 decision 3).
//! `Format` exists only so `?` works against `std::fmt::Write`, the same
//! reason this codebase's other code generator carries it.

#[derive(Debug)]
pub enum CompileError {
    /// A form whose shape the expression compiler doesn't recognize:
    /// not a pair, symbol, string, boolean, or integer literal.
    UnrecognizedForm(String),
    /// `if` with an operand count other than exactly three.
    IfArity { found: usize },
    /// `lambda` without exactly a flat parameter list and one body
    /// expression.
    LambdaArity,
    /// `define` naming a global that is already in the defined set.
    DoubleDefinition(String),
    /// A name referenced but never defined by end-of-compilation.
    UndefinedGlobal(String),
    /// A `lambda` body refers to a binding captured from an enclosing
    /// procedure frame; this crate rejects rather than miscompiles it.
    UnsupportedCapture(String),
    /// A formatting error while writing into the assembly buffers.
    Format(std::fmt::Error),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::UnrecognizedForm(form) => {
                write!(f, "compile error: unrecognized form: {}", form)
            }
            CompileError::IfArity { found } => write!(
                f,
                "compile error: if requires exactly 3 operands, found {}",
                found
            ),
            CompileError::LambdaArity => write!(
                f,
                "compile error: lambda requires a parameter list and one body expression"
            ),
            CompileError::DoubleDefinition(name) => {
                write!(f, "compile error: {} is already defined", name)
            }
            CompileError::UndefinedGlobal(name) => {
                write!(f, "compile error: undefined global: {}", name)
            }
            CompileError::UnsupportedCapture(name) => write!(
                f,
                "compile error: lambda captures non-global variable {} from an enclosing scope, which is not supported",
                name
            ),
            CompileError::Format(e) => write!(f, "assembly generation error: {}", e),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<std::fmt::Error> for CompileError {
    fn from(e: std::fmt::Error) -> Self {
        CompileError::Format(e)
    }
}
