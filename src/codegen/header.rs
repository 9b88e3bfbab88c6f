//! The deferred header accumulator.
//!
//! A single composition of parameterless emitter thunks, extended by
//! append, invoked once before user code. Registration is keyed by a
//! fixed helper name so a helper that several call sites need (every
//! `+` in the program wants `ensure_integer`) is only ever emitted once
//! — the "idempotent with respect to label allocation" invariant from
//! spec.md §3.

use crate::codegen::emitter::AsmEmitter;
use std::collections::HashSet;
use std::fmt;

type Thunk = Box<dyn FnOnce(&mut AsmEmitter) -> fmt::Result>;

#[derive(Default)]
pub struct HeaderAccumulator {
    registered: HashSet<&'static str>,
    thunks: Vec<Thunk>,
}

impl HeaderAccumulator {
    pub fn new() -> Self {
        HeaderAccumulator::default()
    }

    /// Registers `thunk` under `name`. A second registration under the
    /// same name is a no-op: the first one already reserved that
    /// helper's labels.
    pub fn register(&mut self, name: &'static str, thunk: impl FnOnce(&mut AsmEmitter) -> fmt::Result + 'static) {
        if self.registered.insert(name) {
            self.thunks.push(Box::new(thunk));
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.contains(name)
    }

    /// Invokes every registered thunk, in registration order, against
    /// `emitter`. Consumes the accumulator: a header is flushed exactly
    /// once, at end-of-compilation.
    pub fn flush(self, emitter: &mut AsmEmitter) -> fmt::Result {
        for thunk in self.thunks {
            thunk(emitter)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_emits_once() {
        let mut header = HeaderAccumulator::new();
        header.register("helper", |e| e.comment("first"));
        header.register("helper", |e| e.comment("second"));
        let mut emitter = AsmEmitter::new();
        header.flush(&mut emitter).unwrap();
        let out = emitter.into_program();
        assert_eq!(out.matches("first").count(), 1);
        assert_eq!(out.matches("second").count(), 0);
    }

    #[test]
    fn thunks_run_in_registration_order() {
        let mut header = HeaderAccumulator::new();
        header.register("a", |e| e.comment("a"));
        header.register("b", |e| e.comment("b"));
        let mut emitter = AsmEmitter::new();
        header.flush(&mut emitter).unwrap();
        let out = emitter.into_program();
        assert!(out.find('a').unwrap() < out.find('b').unwrap());
    }
}
