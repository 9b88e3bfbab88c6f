//! `+` and `-`: the only two arithmetic special forms (spec.md §4.6).
//!
//! Both operands are compiled, both are checked with `ensure_integer`,
//! and the raw machine op runs directly on the tagged representation
//! rather than untagging first. `tagged(a) + tagged(b)` lands one tag
//! step away from `tagged(a+b)` in either direction, so the tag is
//! repaired with a single `inc`/`dec` instead of shift-and-retag:
//!
//! - `(4a+1) + (4b+1) = 4(a+b)+2`, which `dec` turns into `4(a+b)+1`.
//! - `(4a+1) - (4b+1) = 4(a-b)+0`, which `inc` turns into `4(a-b)+1`.

use crate::ast::Form;
use crate::codegen::compiler::{self, Scope};
use crate::codegen::emitter::Operand;
use crate::codegen::error::CompileError;
use crate::codegen::runtime;
use crate::codegen::state::CodeGen;

#[derive(Debug, Clone, Copy)]
pub enum ArithOp {
    Add,
    Sub,
}

/// Compiles `(+ x y)` or `(- x y)`, leaving the tagged result in `%eax`.
pub fn compile(
    cg: &mut CodeGen,
    op: ArithOp,
    operands: &[Form],
    scope: &Scope,
) -> Result<(), CompileError> {
    let name = match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
    };
    let [x, y] = operands else {
        return Err(CompileError::UnrecognizedForm(format!(
            "({} ...) requires exactly 2 operands",
            name
        )));
    };

    compiler::compile_expr(cg, x, scope)?;
    cg.emitter.insn1("push", &Operand::Reg("eax"))?;
    cg.abstract_stack.push();
    compiler::compile_expr(cg, y, scope)?;

    runtime::ensure_integer(cg);
    cg.emitter
        .insn1("call", &Operand::Sym("ensure_integer".into()))?;

    cg.emitter.insn1("pop", &Operand::Reg("ebx"))?;
    cg.abstract_stack.pop();
    cg.emitter
        .insn2("xchg", &Operand::Reg("eax"), &Operand::Reg("ebx"))?;
    cg.emitter
        .insn1("call", &Operand::Sym("ensure_integer".into()))?;

    match op {
        ArithOp::Add => {
            cg.emitter
                .insn2("add", &Operand::Reg("ebx"), &Operand::Reg("eax"))?;
            cg.emitter.insn1("dec", &Operand::Reg("eax"))?;
        }
        ArithOp::Sub => {
            cg.emitter
                .insn2("sub", &Operand::Reg("ebx"), &Operand::Reg("eax"))?;
            cg.emitter.insn1("inc", &Operand::Reg("eax"))?;
        }
    }
    Ok(())
}
