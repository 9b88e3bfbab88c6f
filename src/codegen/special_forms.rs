//! The special-form dispatch table: `begin`, `if`, `lambda`, `+`, `-`
//! (spec.md §4.5) — exactly these five names get special treatment
//! when they appear as the head of a pair; anything else is a general
//! application.

use crate::ast::Form;
use crate::codegen::arithmetic::{self, ArithOp};
use crate::codegen::compiler::{self, Scope};
use crate::codegen::control_flow;
use crate::codegen::emitter::Operand;
use crate::codegen::error::CompileError;
use crate::codegen::procedure;
use crate::codegen::runtime;
use crate::codegen::state::CodeGen;

/// Compiles `(head operand...)`. `()` with no head is a compile error —
/// there's no "call nothing" form in this language.
pub fn compile_pair(
    cg: &mut CodeGen,
    items: &[Form],
    scope: &Scope,
) -> Result<(), CompileError> {
    let Some((head, operands)) = items.split_first() else {
        return Err(CompileError::UnrecognizedForm("()".to_string()));
    };

    if let Some(name) = head.as_symbol() {
        match name {
            "begin" => return control_flow::compile_begin(cg, operands, scope),
            "if" => return control_flow::compile_if(cg, operands, scope),
            "lambda" => return procedure::compile_lambda(cg, operands, scope),
            "+" => return arithmetic::compile(cg, ArithOp::Add, operands, scope),
            "-" => return arithmetic::compile(cg, ArithOp::Sub, operands, scope),
            _ => {}
        }
    }

    compile_application(cg, head, operands, scope)
}

/// A general application `(proc arg...)`: spec.md §4.4's calling
/// convention. Arguments are pushed in source order, the procedure
/// expression is compiled last (so it ends up in `%eax`, the register
/// `ensure_procedure` checks), and the callee is entered through the
/// code address stored at `+4` of the procedure object.
fn compile_application(
    cg: &mut CodeGen,
    proc_expr: &Form,
    args: &[Form],
    scope: &Scope,
) -> Result<(), CompileError> {
    for arg in args {
        compiler::compile_expr(cg, arg, scope)?;
        cg.emitter.use_text();
        cg.emitter.insn1("push", &Operand::Reg("eax"))?;
        cg.abstract_stack.push();
    }
    compiler::compile_expr(cg, proc_expr, scope)?;

    runtime::ensure_procedure(cg);
    cg.emitter.use_text();
    cg.emitter
        .insn1("call", &Operand::Sym("ensure_procedure".into()))?;
    cg.emitter
        .insn2("mov", &Operand::Disp(4, "eax"), &Operand::Reg("ebx"))?;
    cg.emitter
        .insn2("mov", &Operand::Imm(args.len() as i32), &Operand::Reg("edx"))?;
    cg.emitter.insn1("call", &Operand::Absolute("ebx"))?;

    for _ in args {
        cg.abstract_stack.pop();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::env::Env;

    fn scope() -> Scope {
        Scope::toplevel(Env::new())
    }

    #[test]
    fn plus_dispatches_to_arithmetic() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        let items = vec![Form::symbol("+"), Form::Int(1), Form::Int(2)];
        compile_pair(&mut cg, &items, &scope()).unwrap();
        let program = cg.emitter.into_program();
        assert!(program.contains("add %ebx, %eax"));
    }

    #[test]
    fn an_unrecognized_head_is_a_general_application() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        let items = vec![Form::symbol("f"), Form::Int(1)];
        compile_pair(&mut cg, &items, &scope()).unwrap();
        let program = cg.emitter.into_program();
        assert!(program.contains("call ensure_procedure"));
        assert!(program.contains("call *%ebx"));
    }

    #[test]
    fn empty_pair_is_rejected() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        let err = compile_pair(&mut cg, &[], &scope()).unwrap_err();
        assert!(matches!(err, CompileError::UnrecognizedForm(_)));
    }

    #[test]
    fn application_passes_the_argument_count_in_edx() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        let items = vec![
            Form::symbol("f"),
            Form::Int(1),
            Form::Int(2),
            Form::Int(3),
        ];
        compile_pair(&mut cg, &items, &scope()).unwrap();
        let program = cg.emitter.into_program();
        assert!(program.contains("mov $3, %edx"));
    }
}
