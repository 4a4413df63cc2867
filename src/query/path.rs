use super::selector::item;
use super::{is_word_char, Cursor};
use crate::automata::{Predicate, RegexAst};
use crate::error::Result;
use crate::graph::CallGraph;

/// Parse a path expression. Selectors are turned into predicates against
/// `graph` as it is at parse time.
pub fn parse_path(graph: &CallGraph, text: &str) -> Result<RegexAst> {
    let mut cursor = Cursor::new(text);
    let ast = alternation(graph, &mut cursor)?;
    cursor.finish()?;
    Ok(ast)
}

fn alternation(graph: &CallGraph, cursor: &mut Cursor<'_>) -> Result<RegexAst> {
    let mut alternatives = vec![sequence(graph, cursor)?];
    loop {
        cursor.skip_spaces();
        if !cursor.eat("|") {
            break;
        }
        alternatives.push(sequence(graph, cursor)?);
    }
    Ok(RegexAst::Alt(alternatives))
}

fn sequence(graph: &CallGraph, cursor: &mut Cursor<'_>) -> Result<RegexAst> {
    let mut elements = vec![element(graph, cursor)?];
    loop {
        cursor.skip_spaces();
        match cursor.peek() {
            None | Some('|') | Some(')') => break,
            Some(_) => elements.push(element(graph, cursor)?),
        }
    }
    Ok(RegexAst::Sequence(elements))
}

fn element(graph: &CallGraph, cursor: &mut Cursor<'_>) -> Result<RegexAst> {
    cursor.skip_spaces();
    if let Some(after) = cursor.rest().strip_prefix("...") {
        if !after.starts_with(is_word_char) {
            cursor.pos += 3;
            return Ok(RegexAst::star(RegexAst::one(Predicate::any())));
        }
    }

    let atom = if cursor.eat("(") {
        let inner = alternation(graph, cursor)?;
        cursor.skip_spaces();
        if !cursor.eat(")") {
            return Err(cursor.unexpected("')'"));
        }
        inner
    } else {
        RegexAst::one(item(cursor)?.as_predicate(graph))
    };

    Ok(if cursor.eat("*") {
        RegexAst::star(atom)
    } else {
        atom
    })
}
