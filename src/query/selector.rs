use super::Cursor;
use crate::error::{CallpathError, Result};
use crate::matchers::Matcher;

/// Parse a whitespace-separated list of selector items into their union.
pub fn parse_selector(text: &str) -> Result<Matcher> {
    let mut cursor = Cursor::new(text);
    let mut items = vec![item(&mut cursor)?];
    loop {
        cursor.skip_spaces();
        if cursor.at_end() {
            break;
        }
        items.push(item(&mut cursor)?);
    }
    Ok(Matcher::Or(items).optimize())
}

/// A top-level item, where a bare word is a node name.
pub(super) fn item(cursor: &mut Cursor<'_>) -> Result<Matcher> {
    cursor.skip_spaces();
    let negated = cursor.eat("!");
    let base = match common(cursor)? {
        Some(m) => m,
        None => match cursor.word() {
            Some(word) => Matcher::by_name(word),
            None => return Err(cursor.unexpected("node selector")),
        },
    };
    let base = if negated { base.negate() } else { base };
    Ok(suffixes(cursor, base).optimize())
}

/// An item inside brackets, where a bare word is a label and nothing at all
/// selects every node.
fn inner(cursor: &mut Cursor<'_>) -> Result<Matcher> {
    cursor.skip_spaces();
    let negated = cursor.eat("!");
    let base = match common(cursor)? {
        Some(m) => m,
        None => match cursor.word() {
            Some(word) => Matcher::label(word),
            None => Matcher::And(Vec::new()),
        },
    };
    let base = if negated { base.negate() } else { base };
    Ok(suffixes(cursor, base))
}

/// Quoted names, regexes and bracket groups, which mean the same inside and
/// outside brackets.
fn common(cursor: &mut Cursor<'_>) -> Result<Option<Matcher>> {
    match cursor.peek() {
        Some('"') => {
            cursor.bump();
            Ok(Some(Matcher::by_name(quoted(cursor)?)))
        }
        Some('/') => {
            cursor.bump();
            let start = cursor.pos;
            let pattern = regex_body(cursor)?;
            Matcher::by_regex(&pattern)
                .map(Some)
                .map_err(|e| CallpathError::parse(start, e.to_string()))
        }
        Some('[') => {
            cursor.bump();
            let group = disjunction(cursor)?;
            if !cursor.eat("]") {
                return Err(cursor.unexpected("']'"));
            }
            Ok(Some(group))
        }
        _ => Ok(None),
    }
}

fn disjunction(cursor: &mut Cursor<'_>) -> Result<Matcher> {
    let mut conjuncts = vec![conjunction(cursor)?];
    loop {
        cursor.skip_spaces();
        if !cursor.eat("|") {
            break;
        }
        conjuncts.push(conjunction(cursor)?);
    }
    Ok(Matcher::Or(conjuncts))
}

fn conjunction(cursor: &mut Cursor<'_>) -> Result<Matcher> {
    let mut items = vec![inner(cursor)?];
    loop {
        cursor.skip_spaces();
        if !cursor.eat(",") {
            break;
        }
        items.push(inner(cursor)?);
    }
    Ok(Matcher::And(items))
}

/// Apply `:callers`-style suffixes, left to right.
fn suffixes(cursor: &mut Cursor<'_>, mut matcher: Matcher) -> Matcher {
    loop {
        let save = cursor.pos;
        cursor.skip_spaces();
        matcher = if cursor.eat(":all_callees") {
            matcher.all_callees()
        } else if cursor.eat(":all_callers") {
            matcher.all_callers()
        } else if cursor.eat(":callees") {
            matcher.callees()
        } else if cursor.eat(":callers") {
            matcher.callers()
        } else {
            cursor.pos = save;
            return matcher;
        };
    }
}

/// Body of a `"..."` string; a backslash escapes the next character.
fn quoted(cursor: &mut Cursor<'_>) -> Result<String> {
    let mut out = String::new();
    loop {
        match cursor.bump() {
            Some('"') => return Ok(out),
            Some('\\') => match cursor.bump() {
                Some(c) => out.push(c),
                None => break,
            },
            Some(c) => out.push(c),
            None => break,
        }
    }
    Err(cursor.error("unterminated string"))
}

/// Body of a `/.../` regex. `\/` stands for a slash; other escapes are
/// passed through to the regex engine.
fn regex_body(cursor: &mut Cursor<'_>) -> Result<String> {
    let mut out = String::new();
    loop {
        match cursor.bump() {
            Some('/') => return Ok(out),
            Some('\\') => match cursor.bump() {
                Some('/') => out.push('/'),
                Some(c) => {
                    out.push('\\');
                    out.push(c);
                }
                None => break,
            },
            Some(c) => out.push(c),
            None => break,
        }
    }
    Err(cursor.error("unterminated regex"))
}
