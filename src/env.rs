//! The compile-time lexical environment.
//!
//! spec.md §9 already names the redesign this crate takes: the original
//! system used first-class functions as environment entries ("a
//! code-thunk that, when invoked, emits a push"). That's not a shape
//! Rust represents cheaply, so an environment entry here is a
//! [`Binding`] — a finite data variant the expression compiler matches
//! on to materialize a reference, rather than an unbounded closure
//! value. `Captured` is reserved for a future upvalue variant and is
//! never constructed (see SPEC_FULL.md §11, decision 3): this crate
//! rejects nested lambdas that would need it instead of miscompiling
//! them.
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Binding {
    /// The `i`th argument of the current procedure frame, addressed at
    /// `4*(i+1)(%ebp)` by the procedure emitter's convention.
    Arg(usize),
    /// Reserved for closures over enclosing locals. Never constructed
    /// today; see module docs.
    #[allow(dead_code)]
    Captured(usize),
}

/// An ordered sequence of `(name, binding)` pairs. Lookup returns the
/// innermost match, so shadowing falls out of linear search order
/// rather than needing an explicit scope-nesting mechanism.
#[derive(Debug, Clone, Default)]
pub struct Env {
    bindings: Vec<(Rc<str>, Binding)>,
}

impl Env {
    pub fn new() -> Self {
        Env { bindings: Vec::new() }
    }

    /// Returns a new environment extending this one with `names` bound
    /// as successive procedure arguments, innermost (last-pushed) name
    /// shadowing any earlier one of the same spelling.
    pub fn extend_with_args(&self, names: &[Rc<str>]) -> Env {
        let mut bindings = self.bindings.clone();
        for (i, name) in names.iter().enumerate() {
            bindings.push((name.clone(), Binding::Arg(i)));
        }
        Env { bindings }
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .rev()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, b)| b)
    }

    /// True if `name` resolves to a binding captured from an enclosing
    /// procedure frame rather than the current one — i.e., this
    /// environment has bindings at all and they came from an outer
    /// `extend_with_args` call (detected by the caller passing the
    /// depth at which the current procedure's own frame begins).
    pub fn is_local(&self, local_frame_start: usize, name: &str) -> bool {
        self.bindings[local_frame_start..]
            .iter()
            .rev()
            .any(|(n, _)| n.as_ref() == name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_binding_shadows_outer_one() {
        let env = Env::new().extend_with_args(&[Rc::from("x")]);
        let env = env.extend_with_args(&[Rc::from("x")]);
        assert!(matches!(env.lookup("x"), Some(Binding::Arg(1))));
    }

    #[test]
    fn unbound_name_misses() {
        let env = Env::new().extend_with_args(&[Rc::from("x")]);
        assert!(env.lookup("y").is_none());
    }

    #[test]
    fn locality_check_sees_only_the_current_frame() {
        let outer = Env::new().extend_with_args(&[Rc::from("x")]);
        let frame_start = outer.len();
        let inner = outer.extend_with_args(&[Rc::from("y")]);
        assert!(inner.is_local(frame_start, "y"));
        assert!(!inner.is_local(frame_start, "x"));
    }
}
