//! The expression compiler: the dispatch point every compiled form
//! passes through, per spec.md §4.2's shape (pair, symbol, string,
//! integer, boolean) — one that always leaves its result in `%eax`.

use crate::ast::Form;
use crate::codegen::error::CompileError;
use crate::codegen::special_forms;
use crate::codegen::state::CodeGen;
use crate::env::{Binding, Env};
use crate::value;
use std::rc::Rc;

/// The lexical environment plus the boundary marking where the
/// *current* procedure's own parameters start — everything in `env`
/// before that boundary belongs to an enclosing frame. Needed to
/// reproduce spec.md §9's capture rejection: a reference below the
/// boundary that isn't a global is a nested lambda closing over an
/// outer local, which this compiler refuses rather than miscompiles
/// (SPEC_FULL.md §11 decision 3).
#[derive(Debug, Clone)]
pub struct Scope {
    pub env: Env,
    pub frame_start: usize,
}

impl Scope {
    pub fn toplevel(env: Env) -> Scope {
        let frame_start = env.len();
        Scope { env, frame_start }
    }

    /// A scope for a freshly entered procedure body: extends `env`
    /// with `params` and moves the frame boundary up to right before
    /// them, so they (and only they) count as local.
    pub fn for_procedure(env: &Env, params: &[Rc<str>]) -> Scope {
        let frame_start = env.len();
        Scope { env: env.extend_with_args(params), frame_start }
    }
}

/// Compiles one expression, leaving its value in `%eax`.
pub fn compile_expr(cg: &mut CodeGen, form: &Form, scope: &Scope) -> Result<(), CompileError> {
    tracing::trace!(form = %form, "compile_expr");
    match form {
        Form::Int(n) => {
            cg.emitter.use_text();
            cg.emitter.insn2(
                "mov",
                &crate::codegen::emitter::Operand::Imm(value::tagged_integer(*n)),
                &crate::codegen::emitter::Operand::Reg("eax"),
            )?;
            Ok(())
        }
        Form::Bool(b) => {
            let v = if *b { value::VAL_TRUE } else { value::VAL_FALSE };
            cg.emitter.use_text();
            cg.emitter.insn2(
                "mov",
                &crate::codegen::emitter::Operand::Imm(v),
                &crate::codegen::emitter::Operand::Reg("eax"),
            )?;
            Ok(())
        }
        Form::Eof => {
            cg.emitter.use_text();
            cg.emitter.insn2(
                "mov",
                &crate::codegen::emitter::Operand::Imm(value::VAL_EOF),
                &crate::codegen::emitter::Operand::Reg("eax"),
            )?;
            Ok(())
        }
        Form::Str(s) => compile_string_literal(cg, s),
        Form::Symbol(name) => compile_symbol_ref(cg, name, scope),
        Form::Pair(items) => special_forms::compile_pair(cg, items, scope),
    }
}

fn compile_string_literal(cg: &mut CodeGen, s: &str) -> Result<(), CompileError> {
    use crate::codegen::emitter::Operand;
    let label = cg.labels.fresh();
    cg.emitter.use_rodata();
    cg.emitter.align4()?;
    cg.emitter.label(&label)?;
    cg.emitter.int_hex(value::MAGIC_STRING)?;
    cg.emitter.int_word(s.len() as i64)?;
    cg.emitter.ascii(s)?;
    cg.emitter.use_text();
    cg.emitter
        .insn2("mov", &Operand::SymAddr(label), &Operand::Reg("eax"))?;
    Ok(())
}

fn compile_symbol_ref(cg: &mut CodeGen, name: &str, scope: &Scope) -> Result<(), CompileError> {
    use crate::codegen::emitter::Operand;
    match scope.env.lookup(name) {
        Some(Binding::Arg(i)) => {
            if !scope.env.is_local(scope.frame_start, name) {
                return Err(CompileError::UnsupportedCapture(name.to_string()));
            }
            let disp = 4 * (*i as i32 + 1);
            cg.emitter.use_text();
            cg.emitter
                .insn2("mov", &Operand::Disp(disp, "ebp"), &Operand::Reg("eax"))?;
            Ok(())
        }
        Some(Binding::Captured(_)) => {
            // Never constructed today (see crate::env), kept exhaustive
            // so a future upvalue variant can't silently fall through here.
            Err(CompileError::UnsupportedCapture(name.to_string()))
        }
        None => {
            let label = cg.globals.label_for(name);
            cg.emitter.use_text();
            cg.emitter
                .insn2("mov", &Operand::Sym(label), &Operand::Reg("eax"))?;
            Ok(())
        }
    }
}
