//! The assembly emitter.
//!
//! Primitive output of instructions, labels, directives, data words, and
//! escaped string literals — nothing here knows anything about the
//! source language. Output is buffered into three streams (`.text`,
//! `.rodata`, `.data`) so the driver can flush the header before the
//! body regardless of the order code was generated in (spec.md §5).

use std::fmt;
use std::fmt::Write as _;

/// Addressing-mode operands, per spec.md §4.1's fixed vocabulary.
/// Rendered in AT&T/GAS syntax (`%` register prefix, `$` immediate
/// prefix, `src, dst` operand order).
#[derive(Debug, Clone)]
pub enum Operand {
    /// `$x`
    Imm(i32),
    /// `$0x...` — the same thing, rendered in hex for the handful of
    /// magic numbers and bitmasks where decimal would be unreadable.
    ImmHex(u32),
    /// A bare register, e.g. `%eax`.
    Reg(&'static str),
    /// `(r)`
    Indirect(&'static str),
    /// `d(r)`
    Disp(i32, &'static str),
    /// `*r` — absolute indirect, used for `call`/`jmp` through a
    /// register.
    Absolute(&'static str),
    /// `(b,i,s)` — scaled index.
    Scaled {
        base: &'static str,
        index: &'static str,
        scale: u8,
    },
    /// A bare label, used both as a jump/call target and as a direct
    /// memory reference (`mov g_0, %eax` reads the word *at* `g_0`).
    Sym(String),
    /// `$label` — the label's own address, used to materialize a
    /// pointer to a boxed value living in `.rodata`/`.data`.
    SymAddr(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm(n) => write!(f, "${}", n),
            Operand::ImmHex(n) => write!(f, "$0x{:x}", n),
            Operand::Reg(r) => write!(f, "%{}", r),
            Operand::Indirect(r) => write!(f, "(%{})", r),
            Operand::Disp(d, r) => write!(f, "{}(%{})", d, r),
            Operand::Absolute(r) => write!(f, "*%{}", r),
            Operand::Scaled { base, index, scale } => {
                write!(f, "(%{},%{},{})", base, index, scale)
            }
            Operand::Sym(l) => write!(f, "{}", l),
            Operand::SymAddr(l) => write!(f, "${}", l),
        }
    }
}

/// Which output section code currently targets. Tracked explicitly so
/// that emitting a `.rodata` literal (e.g. `newline_string`, spec.md §9)
/// and then resuming code generation always re-asserts `.text` rather
/// than silently leaving later instructions in the wrong section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Text,
    Rodata,
    Data,
}

#[derive(Debug, Default)]
pub struct AsmEmitter {
    text: String,
    rodata: String,
    data: String,
    section: Option<Section>,
}

impl AsmEmitter {
    pub fn new() -> Self {
        AsmEmitter::default()
    }

    fn buffer_mut(&mut self, section: Section) -> &mut String {
        match section {
            Section::Text => &mut self.text,
            Section::Rodata => &mut self.rodata,
            Section::Data => &mut self.data,
        }
    }

    fn ensure_section(&mut self, section: Section) {
        if self.section != Some(section) {
            let directive = match section {
                Section::Text => ".text",
                Section::Rodata => ".section .rodata",
                Section::Data => ".data",
            };
            let buf = self.buffer_mut(section);
            writeln!(buf, "{}", directive).expect("String writes are infallible");
            self.section = Some(section);
        }
    }

    pub fn use_text(&mut self) {
        self.ensure_section(Section::Text);
    }

    pub fn use_rodata(&mut self) {
        self.ensure_section(Section::Rodata);
    }

    pub fn use_data(&mut self) {
        self.ensure_section(Section::Data);
    }

    /// Emits `label:` in whichever section is currently active.
    pub fn label(&mut self, name: &str) -> fmt::Result {
        let section = self.section.unwrap_or(Section::Text);
        writeln!(self.buffer_mut(section), "{}:", name)
    }

    /// Emits `.align 4` in whichever section is currently active. GNU
    /// `as` never pads a preceding `.ascii`/`.int` run on its own, so
    /// every boxed object (tag `00`, per spec.md §3) needs one of these
    /// directly before its magic word or its own address carries
    /// nonzero low bits.
    pub fn align4(&mut self) -> fmt::Result {
        let section = self.section.unwrap_or(Section::Rodata);
        writeln!(self.buffer_mut(section), "\t.align 4")
    }

    /// Emits a bare, indented instruction with no operands (`ret`).
    pub fn insn0(&mut self, mnemonic: &str) -> fmt::Result {
        self.use_text();
        writeln!(self.text, "\t{}", mnemonic)
    }

    /// Emits a one-operand instruction (`push`, `pop`, `jmp`, `call`, `inc`, `dec`, `int`).
    pub fn insn1(&mut self, mnemonic: &str, op: &Operand) -> fmt::Result {
        self.use_text();
        writeln!(self.text, "\t{} {}", mnemonic, op)
    }

    /// Emits a two-operand instruction in AT&T order (`mov src, dst`).
    pub fn insn2(&mut self, mnemonic: &str, src: &Operand, dst: &Operand) -> fmt::Result {
        self.use_text();
        writeln!(self.text, "\t{} {}, {}", mnemonic, src, dst)
    }

    pub fn comment(&mut self, text: &str) -> fmt::Result {
        let section = self.section.unwrap_or(Section::Text);
        writeln!(self.buffer_mut(section), "\t# {}", text)
    }

    pub fn directive(&mut self, section: DirectiveSection, text: &str) -> fmt::Result {
        let sec = match section {
            DirectiveSection::Text => Section::Text,
            DirectiveSection::Rodata => Section::Rodata,
            DirectiveSection::Data => Section::Data,
        };
        self.ensure_section(sec);
        writeln!(self.buffer_mut(sec), "{}", text)
    }

    /// Emits a `.int` word into whichever data-like section is active.
    pub fn int_word(&mut self, value: i64) -> fmt::Result {
        let section = self.section.unwrap_or(Section::Data);
        writeln!(self.buffer_mut(section), "\t.int {}", value)
    }

    /// Emits a `.int` word holding a magic number, in hex for readability.
    pub fn int_hex(&mut self, value: u32) -> fmt::Result {
        let section = self.section.unwrap_or(Section::Data);
        writeln!(self.buffer_mut(section), "\t.int 0x{:08x}", value)
    }

    /// Emits a `.int` word holding a label's address.
    pub fn int_label(&mut self, label: &str) -> fmt::Result {
        let section = self.section.unwrap_or(Section::Data);
        writeln!(self.buffer_mut(section), "\t.int {}", label)
    }

    /// Emits the bytes of `s` as a (non-nul-terminated) `.ascii` directive,
    /// with backslash, newline and double-quote escaped per spec.md
    /// §4.1 — and nothing else: other non-printable bytes pass through
    /// verbatim. This is intentional (see spec.md §9).
    pub fn ascii(&mut self, s: &str) -> fmt::Result {
        let section = self.section.unwrap_or(Section::Rodata);
        writeln!(self.buffer_mut(section), "\t.ascii \"{}\"", escape_ascii(s))
    }

    /// Concatenates the three sections in header-then-body order and
    /// returns the final program text.
    pub fn into_program(self) -> String {
        let mut out = String::with_capacity(self.text.len() + self.rodata.len() + self.data.len());
        out.push_str(&self.rodata);
        out.push_str(&self.data);
        out.push_str(&self.text);
        out
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DirectiveSection {
    Text,
    Rodata,
    Data,
}

/// Escapes exactly backslash, newline, and double-quote — spec.md §4.1's
/// deliberately narrow escaping contract.
pub fn escape_ascii(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out
}
