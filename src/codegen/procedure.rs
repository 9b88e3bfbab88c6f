//! `lambda`: the one form that introduces a new procedure value
//! (spec.md §4.5). Builds on [`crate::codegen::runtime::emit_procedure`]
//! for the actual prologue/epilogue, same as the always-present
//! `display`/`newline`/`eq?` built-ins — a lambda expression is not
//! otherwise special as a procedure, only in where its code comes from
//! and where its value gets pushed.

use crate::ast::Form;
use crate::codegen::compiler::{self, Scope};
use crate::codegen::emitter::Operand;
use crate::codegen::error::CompileError;
use crate::codegen::runtime;
use crate::codegen::state::CodeGen;
use std::rc::Rc;

/// `(lambda (p1 p2 ...) body)`. Requires a flat parameter list and
/// exactly one body expression (spec.md §4.5) — no variadic tail, no
/// implicit `begin` wrapping several body forms.
pub fn compile_lambda(
    cg: &mut CodeGen,
    operands: &[Form],
    scope: &Scope,
) -> Result<(), CompileError> {
    let [params_form, body] = operands else {
        return Err(CompileError::LambdaArity);
    };
    let params = flat_params(params_form)?;

    let inner_scope = Scope::for_procedure(&scope.env, &params);
    let body = body.clone();
    let value_label = runtime::emit_procedure(cg, params.len(), move |cg| {
        compiler::compile_expr(cg, &body, &inner_scope)
    })?;

    cg.emitter.use_text();
    cg.emitter
        .insn2("mov", &Operand::SymAddr(value_label), &Operand::Reg("eax"))?;
    Ok(())
}

fn flat_params(form: &Form) -> Result<Vec<Rc<str>>, CompileError> {
    let items = form.as_list().ok_or(CompileError::LambdaArity)?;
    items
        .iter()
        .map(|item| match item {
            Form::Symbol(name) => Ok(name.clone()),
            _ => Err(CompileError::LambdaArity),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::env::Env;

    #[test]
    fn a_lambda_with_no_params_compiles_to_a_procedure_value() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        let operands = vec![Form::list(vec![]), Form::Int(1)];
        compile_lambda(&mut cg, &operands, &Scope::toplevel(Env::new())).unwrap();
        let program = cg.emitter.into_program();
        assert!(program.contains("0xca11ab1e"));
        assert!(program.contains("jmp k_"));
    }

    #[test]
    fn a_lambda_body_can_read_its_own_parameter() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        let operands = vec![
            Form::list(vec![Form::symbol("x")]),
            Form::symbol("x"),
        ];
        compile_lambda(&mut cg, &operands, &Scope::toplevel(Env::new())).unwrap();
        let program = cg.emitter.into_program();
        assert!(program.contains("4(%ebp)"));
    }

    #[test]
    fn a_non_list_parameter_form_is_rejected() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        let operands = vec![Form::symbol("x"), Form::Int(1)];
        let err = compile_lambda(&mut cg, &operands, &Scope::toplevel(Env::new())).unwrap_err();
        assert!(matches!(err, CompileError::LambdaArity));
    }

    #[test]
    fn capturing_an_enclosing_local_is_rejected() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        let outer = Env::new().extend_with_args(&[Rc::from("x")]);
        let outer_scope = Scope { env: outer, frame_start: 0 };
        let operands = vec![Form::list(vec![Form::symbol("y")]), Form::symbol("x")];
        let err = compile_lambda(&mut cg, &operands, &outer_scope).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedCapture(name) if name == "x"));
    }
}
