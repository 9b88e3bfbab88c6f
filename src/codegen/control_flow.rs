//! `begin` and `if` — the two control-flow special forms spec.md §4.5
//! recognizes. Neither needs the abstract stack: each leaves exactly
//! one value in `%eax`, matching every other compiled expression.

use crate::ast::Form;
use crate::codegen::compiler::{self, Scope};
use crate::codegen::emitter::Operand;
use crate::codegen::error::CompileError;
use crate::codegen::state::CodeGen;
use crate::value::{VAL_FALSE, VAL_UNSPECIFIED};

/// `(begin e1 e2 ... en)`. Every expression but the last is compiled
/// and its result simply overwritten by the next one — "discarding" is
/// a bookkeeping idea, not a distinct instruction sequence. An empty
/// body yields the fixed unspecified-value bit pattern (spec.md §9,
/// SPEC_FULL.md §11 decision 2).
pub fn compile_begin(cg: &mut CodeGen, body: &[Form], scope: &Scope) -> Result<(), CompileError> {
    let Some((last, init)) = body.split_last() else {
        cg.emitter.use_text();
        cg.emitter
            .insn2("mov", &Operand::Imm(VAL_UNSPECIFIED), &Operand::Reg("eax"))?;
        return Ok(());
    };
    for expr in init {
        compiler::compile_expr(cg, expr, scope)?;
    }
    compiler::compile_expr(cg, last, scope)
}

/// `(if test then else)`. Exactly three operands; no two-armed `if`
/// without an else (spec.md §4.5 — the reader never produces one
/// anyway, since there's no special-cased two-operand shape).
pub fn compile_if(cg: &mut CodeGen, operands: &[Form], scope: &Scope) -> Result<(), CompileError> {
    let [test, then_branch, else_branch] = operands else {
        return Err(CompileError::IfArity { found: operands.len() });
    };

    let else_label = cg.labels.fresh();
    let end_label = cg.labels.fresh();

    compiler::compile_expr(cg, test, scope)?;
    cg.emitter.use_text();
    cg.emitter
        .insn2("cmpl", &Operand::Imm(VAL_FALSE), &Operand::Reg("eax"))?;
    cg.emitter.insn1("je", &Operand::Sym(else_label.clone()))?;

    compiler::compile_expr(cg, then_branch, scope)?;
    cg.emitter.insn1("jmp", &Operand::Sym(end_label.clone()))?;

    cg.emitter.label(&else_label)?;
    compiler::compile_expr(cg, else_branch, scope)?;

    cg.emitter.label(&end_label)
        .map_err(CompileError::from)
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
    fn empty_begin_yields_the_unspecified_value() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        compile_begin(&mut cg, &[], &scope()).unwrap();
        let program = cg.emitter.into_program();
        assert!(program.contains(&format!("${}", VAL_UNSPECIFIED)));
    }

    #[test]
    fn begin_compiles_every_expression_but_only_keeps_the_last() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        compile_begin(
            &mut cg,
            &[Form::Int(1), Form::Int(2), Form::Int(3)],
            &scope(),
        )
        .unwrap();
        let program = cg.emitter.into_program();
        assert_eq!(program.matches("mov $").count(), 3);
    }

    #[test]
    fn if_requires_exactly_three_operands() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        let err = compile_if(&mut cg, &[Form::Bool(true)], &scope()).unwrap_err();
        assert!(matches!(err, CompileError::IfArity { found: 1 }));
    }

    #[test]
    fn if_compares_against_the_false_singleton_and_branches() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        compile_if(
            &mut cg,
            &[Form::Bool(true), Form::Int(1), Form::Int(0)],
            &scope(),
        )
        .unwrap();
        let program = cg.emitter.into_program();
        assert!(program.contains(&format!("cmpl ${}, %eax", VAL_FALSE)));
        assert!(program.contains("je k_"));
        assert!(program.contains("jmp k_"));
    }
}
