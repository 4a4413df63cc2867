//! Text syntax for node selectors and path expressions.
//!
//! ```text
//! selector  := item (' '+ item)*
//! item      := '!'? (name | '"' quoted '"' | '/' regex '/' | '[' group ']') suffix*
//! group     := conj ('|' conj)*
//! conj      := inner (',' inner)*
//! inner     := '!'? (label | '"' quoted '"' | '/' regex '/' | '[' group ']' | ε) suffix*
//! suffix    := ':callers' | ':callees' | ':all_callers' | ':all_callees'
//!
//! path      := sequence ('|' sequence)*
//! sequence  := element (' '* element)*
//! element   := '...' | atom '*'?
//! atom      := item | '(' path ')'
//! ```
//!
//! Both parsers report the byte offset of the first error.

mod path;
mod selector;

pub use path::parse_path;
pub use selector::parse_selector;

use crate::error::{CallpathError, Result};

/// Characters allowed in a bare node name or label.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Byte cursor over the input, shared by both grammars.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos == self.text.len()
    }

    /// Consume `token` if the input continues with it.
    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn word(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while self.peek().is_some_and(is_word_char) {
            self.bump();
        }
        (self.pos > start).then(|| &self.text[start..self.pos])
    }

    fn error(&self, message: impl Into<String>) -> CallpathError {
        CallpathError::parse(self.pos, message)
    }

    fn unexpected(&self, wanted: &str) -> CallpathError {
        match self.peek() {
            Some(c) => self.error(format!("expected {}, found '{}'", wanted, c)),
            None => self.error(format!("expected {}, found end of input", wanted)),
        }
    }

    /// Fail unless the whole input has been consumed.
    fn finish(&mut self) -> Result<()> {
        self.skip_spaces();
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor() {
        let mut cursor = Cursor::new("  ab.c_1 :x");
        cursor.skip_spaces();
        assert_eq!(cursor.word(), Some("ab.c_1"));
        assert_eq!(cursor.word(), None);
        assert!(!cursor.eat(":"));
        cursor.skip_spaces();
        assert!(cursor.eat(":"));
        assert_eq!(cursor.bump(), Some('x'));
        assert!(cursor.at_end());
        assert!(cursor.finish().is_ok());
    }

    #[test]
    fn test_unicode_words() {
        let mut cursor = Cursor::new("résumé]");
        assert_eq!(cursor.word(), Some("résumé"));
        match cursor.finish() {
            Err(CallpathError::Parse { position, message }) => {
                assert_eq!(position, "résumé".len());
                assert!(message.contains("']'"), "{}", message);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
