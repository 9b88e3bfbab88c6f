//! Runtime helpers: the fixed assembly fragments every program can call
//! into but none of them are generated from source text.
//!
//! Each `ensure_*` check takes its argument in `%eax` (the top-of-stack
//! register) and returns normally through it, or jumps to the matching
//! fixed error stub, which prints a message and exits with status 1
//! (spec.md §6). Registration goes through [`crate::codegen::header::HeaderAccumulator`]
//! so a program that never calls `ensure_string` never pays for it, but
//! two call sites that both need `ensure_integer` only get one copy.
//!
//! `report_error`, its four message stubs, and the `display`/`newline`/
//! `eq?` primitives are unconditionally present in every program (decision
//! 5 and decision 6 in SPEC_FULL.md §11) — they're cheap, and whether a
//! program needs them isn't knowable without already having compiled it.

use crate::codegen::emitter::Operand;
use crate::codegen::state::CodeGen;
use crate::value::{MAGIC_PROCEDURE, MAGIC_STRING, TAG_MASK, VAL_FALSE};
use std::fmt;

pub(crate) const SYS_WRITE: i32 = 4;
pub(crate) const SYS_EXIT: i32 = 1;
pub(crate) const STDOUT: i32 = 1;

/// Registers the four fixed check helpers lazily: call this before
/// emitting a `call ensure_integer` and the header will carry it,
/// otherwise it won't.
pub fn ensure_procedure(cg: &mut CodeGen) {
    register_error_stub(cg, "not_procedure", "type error: not a procedure");
    cg.header.register("ensure_procedure", |e| {
        e.use_text();
        e.label("ensure_procedure")?;
        e.insn2("test", &Operand::Imm(TAG_MASK as i32), &Operand::Reg("eax"))?;
        e.insn1("jnz", &Operand::Sym("not_procedure".into()))?;
        e.insn2(
            "cmpl",
            &Operand::ImmHex(MAGIC_PROCEDURE),
            &Operand::Indirect("eax"),
        )?;
        e.insn1("jnz", &Operand::Sym("not_procedure".into()))?;
        e.insn0("ret")
    });
}

pub fn ensure_string(cg: &mut CodeGen) {
    register_error_stub(cg, "notstring", "type error: not a string");
    cg.header.register("ensure_string", |e| {
        e.use_text();
        e.label("ensure_string")?;
        e.insn2("test", &Operand::Imm(TAG_MASK as i32), &Operand::Reg("eax"))?;
        e.insn1("jnz", &Operand::Sym("notstring".into()))?;
        e.insn2(
            "cmpl",
            &Operand::ImmHex(MAGIC_STRING),
            &Operand::Indirect("eax"),
        )?;
        e.insn1("jnz", &Operand::Sym("notstring".into()))?;
        e.insn0("ret")
    });
}

pub fn ensure_integer(cg: &mut CodeGen) {
    // Deliberately missing trailing newline (spec.md §9) — preserved
    // byte-for-byte rather than normalized away. The rodata label is
    // `not_int_msg`, not the mechanical `not_an_integer_msg` every other
    // stub gets (spec.md §6's reserved-names list spells it out).
    register_error_stub_named(cg, "not_an_integer", "not_int_msg", "type error: not an integer");
    cg.header.register("ensure_integer", |e| {
        e.use_text();
        e.label("ensure_integer")?;
        e.insn2("test", &Operand::Imm(1), &Operand::Reg("eax"))?;
        e.insn1("je", &Operand::Sym("not_an_integer".into()))?;
        e.insn0("ret")
    });
}

pub fn ensure_arity(cg: &mut CodeGen) {
    register_error_stub(cg, "argument_count_wrong", "error: wrong number of arguments");
}

/// `report_error`: prints the string value in `%eax` to stdout and exits
/// with status 1. Always present (decision 5) — every error stub ends
/// by falling into it.
fn emit_report_error(cg: &mut CodeGen) {
    cg.header.register("report_error", |e| {
        e.use_text();
        e.label("report_error")?;
        e.insn2("mov", &Operand::Reg("eax"), &Operand::Reg("ecx"))?;
        e.insn2("mov", &Operand::Disp(4, "ecx"), &Operand::Reg("edx"))?;
        e.insn2("lea", &Operand::Disp(8, "ecx"), &Operand::Reg("ecx"))?;
        e.insn2("mov", &Operand::Imm(STDOUT), &Operand::Reg("ebx"))?;
        e.insn2("mov", &Operand::Imm(SYS_WRITE), &Operand::Reg("eax"))?;
        e.insn1("int", &Operand::ImmHex(0x80))?;
        e.insn2("mov", &Operand::Imm(1), &Operand::Reg("ebx"))?;
        e.insn2("mov", &Operand::Imm(SYS_EXIT), &Operand::Reg("eax"))?;
        e.insn1("int", &Operand::ImmHex(0x80))
    });
}

/// A fixed error stub: a string constant in `.rodata` plus a tiny bit of
/// `.text` that loads its address and falls into `report_error`. `msg`
/// gets a trailing newline; see [`register_error_stub_raw`] for the one
/// exception (`not_an_integer`).
fn register_error_stub(cg: &mut CodeGen, name: &'static str, msg: &'static str) {
    register_error_stub_raw(cg, name, &format!("{}\n", msg));
}

fn register_error_stub_raw(cg: &mut CodeGen, name: &'static str, msg: &str) {
    let data_label = format!("{}_msg", name);
    register_error_stub_named(cg, name, &data_label, msg);
}

fn register_error_stub_named(cg: &mut CodeGen, name: &'static str, data_label: &str, msg: &str) {
    emit_report_error(cg);
    let msg = msg.to_string();
    let data_label = data_label.to_string();
    cg.header.register(name, move |e| {
        e.use_rodata();
        e.align4()?;
        e.label(&data_label)?;
        e.int_hex(MAGIC_STRING)?;
        e.int_word(msg.len() as i64)?;
        e.ascii(&msg)?;
        e.use_text();
        e.label(name)?;
        e.insn2(
            "mov",
            &Operand::SymAddr(data_label),
            &Operand::Reg("eax"),
        )?;
        e.insn1("jmp", &Operand::Sym("report_error".into()))
    });
}

/// `newline_string`: the fixed single-character string `"\n"`, the one
/// reserved rodata label spec.md §6 names directly. Always present —
/// `prim_newline` calls into it.
fn emit_newline_string(cg: &mut CodeGen) {
    cg.header.register("newline_string", |e| {
        e.use_rodata();
        e.align4()?;
        e.label("newline_string")?;
        e.int_hex(MAGIC_STRING)?;
        e.int_word(1)?;
        e.ascii("\n")
    });
}

/// Emits the prologue/epilogue wrapper of a boxed procedure value in
/// whichever section is currently active, returning the label of the
/// procedure value itself. Shared between the `lambda` special form and
/// the built-in primitives below — see spec.md §4.4's calling
/// convention and §9's argument-order quirk, both reproduced here
/// exactly rather than in `lambda` alone.
///
/// `4N(%ebp)` addresses the Nth *pushed* argument, not the Nth
/// source-order one (spec.md §9) — this prologue sets `%ebp` to the
/// entry `%esp` with no compensation for that, on purpose.
pub fn emit_procedure<E>(
    cg: &mut CodeGen,
    arity: usize,
    body: impl FnOnce(&mut CodeGen) -> Result<(), E>,
) -> Result<String, E>
where
    E: From<fmt::Error>,
{
    let value_label = cg.labels.fresh();
    let code_label = cg.labels.fresh();
    let skip_label = cg.labels.fresh();

    cg.emitter.use_text();
    cg.emitter.insn1("jmp", &Operand::Sym(skip_label.clone()))?;
    cg.emitter.label(&code_label)?;
    ensure_arity(cg);
    cg.emitter
        .insn2("cmpl", &Operand::Imm(arity as i32), &Operand::Reg("edx"))?;
    cg.emitter
        .insn1("jnz", &Operand::Sym("argument_count_wrong".into()))?;
    cg.emitter.comment("post-return esp: skip retaddr + N args")?;
    cg.emitter.insn2(
        "lea",
        &Operand::Disp(4, "esp"),
        &Operand::Reg("ebx"),
    )?;
    if arity > 0 {
        cg.emitter.insn2(
            "lea",
            &Operand::Scaled { base: "ebx", index: "edx", scale: 4 },
            &Operand::Reg("ebx"),
        )?;
    }
    cg.emitter.insn1("push", &Operand::Reg("ebx"))?;
    cg.emitter.insn1("push", &Operand::Reg("ebp"))?;
    cg.emitter
        .insn2("lea", &Operand::Disp(8, "esp"), &Operand::Reg("ebp"))?;

    body(cg)?;

    cg.emitter.insn1("pop", &Operand::Reg("ebp"))?;
    cg.emitter.insn1("pop", &Operand::Reg("ecx"))?;
    cg.emitter.insn1("pop", &Operand::Reg("edx"))?;
    cg.emitter
        .insn2("mov", &Operand::Reg("ecx"), &Operand::Reg("esp"))?;
    cg.emitter.insn1("jmp", &Operand::Absolute("edx"))?;

    cg.emitter.label(&skip_label)?;
    cg.emitter.use_rodata();
    cg.emitter.align4()?;
    cg.emitter.label(&value_label)?;
    cg.emitter.int_hex(MAGIC_PROCEDURE)?;
    cg.emitter.int_label(&code_label)?;
    cg.emitter.use_text();
    Ok(value_label)
}

/// Builds the boxed procedure value for `display` (arity 1, string
/// argument only — decision 6) and wires up `ensure_string` lazily,
/// same as any other caller would.
pub fn emit_prim_display(cg: &mut CodeGen) -> Result<String, fmt::Error> {
    emit_procedure(cg, 1, |cg| {
        ensure_string(cg);
        cg.emitter
            .insn2("mov", &Operand::Disp(4, "ebp"), &Operand::Reg("eax"))?;
        cg.emitter
            .insn1("call", &Operand::Sym("ensure_string".into()))?;
        cg.emitter.insn2("mov", &Operand::Reg("eax"), &Operand::Reg("ecx"))?;
        cg.emitter.insn2("mov", &Operand::Disp(4, "ecx"), &Operand::Reg("edx"))?;
        cg.emitter.insn2("lea", &Operand::Disp(8, "ecx"), &Operand::Reg("ecx"))?;
        cg.emitter.insn2("mov", &Operand::Imm(STDOUT), &Operand::Reg("ebx"))?;
        cg.emitter.insn2("mov", &Operand::Imm(SYS_WRITE), &Operand::Reg("eax"))?;
        cg.emitter.insn1("int", &Operand::ImmHex(0x80))?;
        cg.emitter
            .insn2("mov", &Operand::Imm(crate::value::VAL_UNSPECIFIED), &Operand::Reg("eax"))
    })
}

/// `newline` (arity 0): writes the fixed `newline_string` to stdout.
/// `newline_string`'s length is known at emission time, so unlike
/// `display` this doesn't need to read a length field out of the
/// string object — the immediate `1` is folded straight in.
pub fn emit_prim_newline(cg: &mut CodeGen) -> Result<String, fmt::Error> {
    emit_newline_string(cg);
    emit_procedure(cg, 0, |cg| {
        cg.emitter.insn2(
            "mov",
            &Operand::SymAddr("newline_string".into()),
            &Operand::Reg("ecx"),
        )?;
        cg.emitter
            .insn2("lea", &Operand::Disp(8, "ecx"), &Operand::Reg("ecx"))?;
        cg.emitter
            .insn2("mov", &Operand::Imm(1), &Operand::Reg("edx"))?;
        cg.emitter
            .insn2("mov", &Operand::Imm(STDOUT), &Operand::Reg("ebx"))?;
        cg.emitter
            .insn2("mov", &Operand::Imm(SYS_WRITE), &Operand::Reg("eax"))?;
        cg.emitter.insn1("int", &Operand::ImmHex(0x80))?;
        cg.emitter
            .insn2("mov", &Operand::Imm(crate::value::VAL_UNSPECIFIED), &Operand::Reg("eax"))
    })
}

/// `eq?` (arity 2): raw pointer/immediate equality, no structural
/// comparison — also bound as `=` per spec.md §4.7's synthetic
/// `(define = eq?)`.
pub fn emit_prim_eq(cg: &mut CodeGen) -> Result<String, fmt::Error> {
    emit_procedure(cg, 2, |cg| {
        cg.emitter
            .insn2("mov", &Operand::Disp(4, "ebp"), &Operand::Reg("eax"))?;
        cg.emitter
            .insn2("mov", &Operand::Disp(8, "ebp"), &Operand::Reg("ebx"))?;
        let label_true = cg.labels.fresh();
        let label_done = cg.labels.fresh();
        cg.emitter.insn2("cmpl", &Operand::Reg("ebx"), &Operand::Reg("eax"))?;
        cg.emitter.insn1("je", &Operand::Sym(label_true.clone()))?;
        cg.emitter
            .insn2("mov", &Operand::Imm(VAL_FALSE), &Operand::Reg("eax"))?;
        cg.emitter.insn1("jmp", &Operand::Sym(label_done.clone()))?;
        cg.emitter.label(&label_true)?;
        cg.emitter
            .insn2("mov", &Operand::Imm(crate::value::VAL_TRUE), &Operand::Reg("eax"))?;
        cg.emitter.label(&label_done)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;

    #[test]
    fn ensure_integer_is_registered_once() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        ensure_integer(&mut cg);
        ensure_integer(&mut cg);
        assert!(cg.header.is_registered("ensure_integer"));
        assert!(cg.header.is_registered("not_an_integer"));
        let program = {
            let mut emitter = cg.emitter;
            cg.header.flush(&mut emitter).unwrap();
            emitter.into_program()
        };
        assert_eq!(program.matches("ensure_integer:").count(), 1);
    }

    #[test]
    fn not_an_integer_message_has_no_trailing_newline() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        ensure_integer(&mut cg);
        let mut emitter = cg.emitter;
        cg.header.flush(&mut emitter).unwrap();
        let program = emitter.into_program();
        assert!(program.contains("type error: not an integer"));
        assert!(!program.contains("type error: not an integer\\n"));
    }

    #[test]
    fn ensure_procedure_message_has_trailing_newline() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        ensure_procedure(&mut cg);
        let mut emitter = cg.emitter;
        cg.header.flush(&mut emitter).unwrap();
        let program = emitter.into_program();
        assert!(program.contains("type error: not a procedure\\n"));
    }

    #[test]
    fn prim_display_emits_a_procedure_value() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        let label = emit_prim_display(&mut cg).unwrap();
        let program = cg.emitter.into_program();
        assert!(program.contains(&format!("{}:", label)));
        assert!(program.contains("0xca11ab1e"));
    }

    #[test]
    fn prim_eq_compares_by_identity() {
        let mut cg = CodeGen::new(CompilerConfig::new());
        let label = emit_prim_eq(&mut cg).unwrap();
        let program = cg.emitter.into_program();
        assert!(program.contains(&format!("{}:", label)));
        assert!(program.contains("cmpl %ebx, %eax"));
    }
}
