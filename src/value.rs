//! The tagged-value representation.
//!
//! Every value at runtime is exactly one 32-bit word. The low two bits
//! are a tag:
//!
//! ```text
//! 00 — heap/rodata pointer, first word is a magic number
//! 01 — immediate signed integer, payload in the upper 30 bits
//! 10 — immediate enumerated singleton, index in the upper 30 bits
//! 11 — unused
//! ```
//!
//! This module only computes the bit patterns; it emits nothing itself.
//! [`crate::codegen::emitter`] turns these into `$...` immediate operands.

/// Low-bit tag of a pointer-tagged (boxed) value.
pub const TAG_POINTER: u32 = 0b00;
/// Low-bit tag of an immediate integer.
pub const TAG_INTEGER: u32 = 0b01;
/// Low-bit tag of an immediate enum singleton.
pub const TAG_ENUM: u32 = 0b10;

pub const TAG_MASK: u32 = 0b11;

/// Enum singleton indices, per spec.md §3: 0..255 are characters,
/// then the four named constants.
pub const ENUM_NIL: u32 = 256;
pub const ENUM_TRUE: u32 = 257;
pub const ENUM_FALSE: u32 = 258;
pub const ENUM_EOF: u32 = 259;

/// First word of a boxed procedure object.
pub const MAGIC_PROCEDURE: u32 = 0xca11ab1e;
/// First word of a boxed string object.
pub const MAGIC_STRING: u32 = 0x00babb1e;

/// `tagged_integer(n) = 4n + 1`. Wrapping is intentional: the target
/// word is 32 bits and values outside the representable 30-bit range
/// are not a concern this compiler is asked to detect (see spec.md §1
/// Non-goals — no overflow checking is specified).
pub const fn tagged_integer(n: i32) -> i32 {
    (n.wrapping_shl(2)) | 1
}

/// Recovers the source integer from a tagged integer word (arithmetic
/// shift right by 2, per spec.md §2).
pub const fn untag_integer(word: i32) -> i32 {
    word >> 2
}

/// `4k + 2` for an enum index `k`.
pub const fn tagged_enum(index: u32) -> i32 {
    ((index << 2) | 2) as i32
}

/// A single character, tagged as enum index `c` (0..=255).
pub const fn tagged_char(c: u8) -> i32 {
    tagged_enum(c as u32)
}

pub const VAL_NIL: i32 = tagged_enum(ENUM_NIL);
pub const VAL_TRUE: i32 = tagged_enum(ENUM_TRUE);
pub const VAL_FALSE: i32 = tagged_enum(ENUM_FALSE);
pub const VAL_EOF: i32 = tagged_enum(ENUM_EOF);

/// The literal value spec.md §9 mandates for an empty `begin` body:
/// the bit pattern `31`, which happens to decode as the enum singleton
/// at index 7 (a character, `(31-2)/4 = 7`, i.e. the bell character).
/// Preserved verbatim rather than replaced with a "nicer" unspecified
/// value — see SPEC_FULL.md §11, decision 2.
pub const VAL_UNSPECIFIED: i32 = 31;

pub const fn tag_of(word: i32) -> u32 {
    (word as u32) & TAG_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_tag_round_trips_over_the_30_bit_range() {
        for n in [-1, 0, 1, 42, -42, 1 << 20, -(1 << 20), (1 << 29) - 1, -(1 << 29)] {
            let tagged = tagged_integer(n);
            assert_eq!(tag_of(tagged), TAG_INTEGER);
            assert_eq!(untag_integer(tagged), n);
        }
    }

    #[test]
    fn enum_singletons_carry_the_enum_tag() {
        for v in [VAL_NIL, VAL_TRUE, VAL_FALSE, VAL_EOF] {
            assert_eq!(tag_of(v), TAG_ENUM);
        }
    }

    #[test]
    fn enum_constants_are_distinct() {
        let vals = [VAL_NIL, VAL_TRUE, VAL_FALSE, VAL_EOF];
        for (i, a) in vals.iter().enumerate() {
            for (j, b) in vals.iter().enumerate() {
                assert_eq!(i == j, a == b);
            }
        }
    }

    #[test]
    fn characters_are_tagged_enum_values_below_nil() {
        for c in [0u8, 1, b'a', 255] {
            let tagged = tagged_char(c);
            assert_eq!(tag_of(tagged), TAG_ENUM);
            assert!(tagged < VAL_NIL);
        }
    }

    #[test]
    fn unspecified_sentinel_matches_spec_bit_pattern() {
        assert_eq!(VAL_UNSPECIFIED, 31);
        assert_eq!(tag_of(VAL_UNSPECIFIED), TAG_ENUM);
    }
}
