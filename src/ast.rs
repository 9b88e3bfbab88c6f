//! Surface syntax.
//!
//! `Form` is what the reader produces and what the expression compiler
//! dispatches on. It is deliberately small: proper lists, symbols,
//! strings, decimal integers, booleans, and an EOF sentinel. There are
//! no vectors and no dotted pairs (see spec Non-goals).

use std::fmt;
use std::rc::Rc;

/// One parsed top-level (or nested) form.
///
/// `Pair` always represents a proper list: `(a b c)` is
/// `Pair([a, b, c])`, not a chain of cons cells. The compiler never
/// needs improper lists, so we don't pay for representing them.
#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    /// A parenthesized form: `(head arg1 arg2 ...)`, including `()`.
    Pair(Rc<Vec<Form>>),
    Symbol(Rc<str>),
    Str(Rc<str>),
    Int(i32),
    Bool(bool),
    /// The end-of-stream sentinel the driver reads until.
    Eof,
}

impl Form {
    pub fn symbol(name: impl Into<Rc<str>>) -> Form {
        Form::Symbol(name.into())
    }

    pub fn list(items: Vec<Form>) -> Form {
        Form::Pair(Rc::new(items))
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Form::Eof)
    }

    /// The items of a `Pair`, or `None` for any other shape.
    pub fn as_list(&self) -> Option<&[Form]> {
        match self {
            Form::Pair(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Form::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// A short, human-readable rendering used in compile error messages.
    /// Not a full printer: nested structure is summarized, not spelled out,
    /// since error messages only ever need to name the offending head form.
    pub fn describe(&self) -> String {
        match self {
            Form::Pair(items) => {
                if let Some(head) = items.first() {
                    format!("({} ...)", head.describe())
                } else {
                    "()".to_string()
                }
            }
            Form::Symbol(s) => s.to_string(),
            Form::Str(s) => format!("{:?}", s),
            Form::Int(n) => n.to_string(),
            Form::Bool(true) => "#t".to_string(),
            Form::Bool(false) => "#f".to_string(),
            Form::Eof => "<eof>".to_string(),
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}
