//! A single-pass, non-optimizing compiler from a small parenthesized
//! functional dialect to 32-bit x86 assembly text.
//!
//! [`compile_source`] is the one entry point: it reads a complete
//! source string and returns GNU-assembler text ready to hand to an
//! assembler targeting 32-bit x86 ELF (`.text`/`.rodata`/`.data`,
//! `int 0x80` Linux syscalls, entry symbols `_start`/`main`). There is
//! no configuration beyond [`CompilerConfig`], no environment
//! variables, and no on-disk state — the whole thing is one pure
//! function from a string to a string or an error.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod env;
pub mod label;
pub mod reader;
pub mod value;

pub use codegen::{CodeGen, CompileError, ProgramError};
pub use config::CompilerConfig;

/// Compiles a complete program read from `source`, using the default
/// [`CompilerConfig`].
pub fn compile_source(source: &str) -> Result<String, ProgramError> {
    codegen::compile_program(source, &CompilerConfig::new())
}

/// Compiles a complete program read from `source` with a caller-supplied
/// configuration.
pub fn compile_source_with_config(
    source: &str,
    config: &CompilerConfig,
) -> Result<String, ProgramError> {
    codegen::compile_program(source, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_source_runs_the_whole_pipeline() {
        let program = compile_source(r#"(display "hi")(newline)"#).unwrap();
        assert!(program.contains("_start:"));
        assert!(program.contains("hi"));
    }

    #[test]
    fn a_malformed_source_string_is_reported_as_a_read_error() {
        let err = compile_source("(display \"unterminated").unwrap_err();
        assert!(matches!(err, ProgramError::Read(_)));
    }
}
