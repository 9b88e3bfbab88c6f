//! The source reader.
//!
//! spec.md treats the reader as an external collaborator: the compiler
//! proper consumes already-parsed [`Form`](crate::ast::Form) values. For
//! this crate to be a runnable, self-contained program rather than a
//! library waiting on an unwritten front end, it carries a small reader
//! that turns standard input text into forms. It is intentionally
//! unambitious: no reader macros besides `'`, no vectors, no dotted
//! pairs, no block comments.

use crate::ast::Form;
use std::rc::Rc;

/// Reads a sequence of top-level forms from a source string.
pub struct Reader<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Reader<'a> {
    pub fn new(source: &'a str) -> Self {
        Reader {
            chars: source.chars().peekable(),
            line: 1,
        }
    }

    /// Reads the next top-level form, or `Form::Eof` once the input is
    /// exhausted. Returns `Err` on malformed text (unterminated string,
    /// unbalanced parens, a stray closing paren).
    pub fn read(&mut self) -> Result<Form, String> {
        self.skip_atmosphere();
        match self.peek() {
            None => Ok(Form::Eof),
            Some(')') => Err(self.err("unexpected ')'")),
            Some(_) => self.read_form(),
        }
    }

    fn read_form(&mut self) -> Result<Form, String> {
        self.skip_atmosphere();
        match self.peek() {
            None => Err(self.err("unexpected end of input")),
            Some('(') => self.read_list(),
            Some(')') => Err(self.err("unexpected ')'")),
            Some('"') => self.read_string(),
            Some('\'') => {
                self.advance();
                let quoted = self.read_form()?;
                Ok(Form::list(vec![Form::symbol("quote"), quoted]))
            }
            Some(_) => self.read_atom(),
        }
    }

    fn read_list(&mut self) -> Result<Form, String> {
        self.advance(); // consume '('
        let mut items = Vec::new();
        loop {
            self.skip_atmosphere();
            match self.peek() {
                None => return Err(self.err("unterminated list")),
                Some(')') => {
                    self.advance();
                    return Ok(Form::list(items));
                }
                Some(_) => items.push(self.read_form()?),
            }
        }
    }

    fn read_string(&mut self) -> Result<Form, String> {
        self.advance(); // consume opening '"'
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err(self.err("unterminated string literal")),
                Some('"') => return Ok(Form::Str(Rc::from(s.as_str()))),
                Some('\\') => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('"') => s.push('"'),
                    Some('\\') => s.push('\\'),
                    Some(other) => s.push(other),
                    None => return Err(self.err("unterminated string literal")),
                },
                Some(c) => s.push(c),
            }
        }
    }

    /// A bare token: an integer if every character is a digit (with an
    /// optional leading `-`), `#t`/`#f`, or a symbol otherwise.
    fn read_atom(&mut self) -> Result<Form, String> {
        let mut token = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || c == '(' || c == ')' || c == '"' || c == ';' {
                break;
            }
            token.push(c);
            self.advance();
        }
        if token.is_empty() {
            return Err(self.err("expected a form"));
        }
        Ok(parse_atom(&token))
    }

    fn skip_atmosphere(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some(';') => {
                    while !matches!(self.chars.peek(), None | Some('\n')) {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn err(&self, msg: &str) -> String {
        format!("read error at line {}: {}", self.line, msg)
    }
}

fn parse_atom(token: &str) -> Form {
    match token {
        "#t" => return Form::Bool(true),
        "#f" => return Form::Bool(false),
        _ => {}
    }
    let is_int = {
        let digits = token.strip_prefix('-').unwrap_or(token);
        !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
    };
    if is_int {
        if let Ok(n) = token.parse::<i32>() {
            return Form::Int(n);
        }
    }
    Form::symbol(token)
}

/// Reads every top-level form up to (but not including) the final EOF.
pub fn read_all(source: &str) -> Result<Vec<Form>, String> {
    let mut reader = Reader::new(source);
    let mut forms = Vec::new();
    loop {
        let form = reader.read()?;
        if form.is_eof() {
            return Ok(forms);
        }
        forms.push(form);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_atoms() {
        assert_eq!(read_all("42").unwrap(), vec![Form::Int(42)]);
        assert_eq!(read_all("-7").unwrap(), vec![Form::Int(-7)]);
        assert_eq!(read_all("#t #f").unwrap(), vec![Form::Bool(true), Form::Bool(false)]);
        assert_eq!(read_all("foo-bar?").unwrap(), vec![Form::symbol("foo-bar?")]);
    }

    #[test]
    fn reads_strings_with_escapes() {
        assert_eq!(
            read_all(r#""a\nb\"c""#).unwrap(),
            vec![Form::Str(Rc::from("a\nb\"c"))]
        );
    }

    #[test]
    fn reads_nested_lists() {
        let forms = read_all("(define f (lambda (x) (+ x x)))").unwrap();
        assert_eq!(forms.len(), 1);
        assert!(forms[0].as_list().is_some());
    }

    #[test]
    fn quote_sugar_expands() {
        let forms = read_all("'a").unwrap();
        assert_eq!(forms, vec![Form::list(vec![Form::symbol("quote"), Form::symbol("a")])]);
    }

    #[test]
    fn unterminated_list_is_an_error() {
        assert!(read_all("(display 1").is_err());
    }

    #[test]
    fn stray_close_paren_is_an_error() {
        assert!(read_all(")").is_err());
    }

    #[test]
    fn skips_comments() {
        let forms = read_all("; a comment\n(display 1) ; trailing\n").unwrap();
        assert_eq!(forms.len(), 1);
    }
}
