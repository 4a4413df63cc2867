//! Line-oriented text dump of a call graph.
//!
//! A dump is a command script:
//!
//! ```text
//! node [--username NAME] [--line N] NAME [FILE]
//! node --external NAME
//! label LABEL NODE
//! edge CALLER CALLEE call|ref
//! ```
//!
//! Nodes come first in insertion order, then labels sorted by label and
//! node, then edges grouped by caller. Filters are ignored: a dump always
//! holds the whole graph.

use std::io::{BufRead, Write};

use super::engine::CallGraph;
use super::types::EdgeKind;
use crate::error::{CallpathError, Result};

// ─── Tokens ─────────────────────────────────────────────────────────────────

/// Quote `token` if it would not survive [`split_line`] as is.
pub fn quote(token: &str) -> String {
    let plain = !token.is_empty()
        && !token.starts_with('#')
        && !token
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\\');
    if plain {
        return token.to_string();
    }
    let mut out = String::with_capacity(token.len() + 2);
    out.push('"');
    for c in token.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Split a line into whitespace-separated tokens. Double quotes group
/// words, and a backslash escapes the next character. An unquoted `#` at
/// the start of a token begins a comment.
pub fn split_line(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.peek() {
            None | Some('#') => return Ok(tokens),
            Some(_) => {}
        }

        let mut token = String::new();
        let mut quoted = false;
        while let Some(c) = chars.next() {
            match c {
                '"' => quoted = !quoted,
                '\\' => match chars.next() {
                    Some(escaped) => token.push(escaped),
                    None => return Err("trailing backslash".to_string()),
                },
                c if c.is_whitespace() && !quoted => break,
                c => token.push(c),
            }
        }
        if quoted {
            return Err("unterminated quote".to_string());
        }
        tokens.push(token);
    }
}

// ─── Writing ────────────────────────────────────────────────────────────────

/// Write every node, label and edge of `graph` to `out`.
pub fn write_graph(graph: &CallGraph, mut out: impl Write) -> Result<()> {
    for node in graph.graph.node_weights() {
        if node.external {
            writeln!(out, "node --external {}", quote(&node.name))?;
            continue;
        }
        write!(out, "node")?;
        if let Some(username) = &node.username {
            write!(out, " --username {}", quote(username))?;
        }
        if let Some(line) = node.line {
            write!(out, " --line {}", line)?;
        }
        write!(out, " {}", quote(&node.name))?;
        if let Some(file) = &node.file {
            write!(out, " {}", quote(file))?;
        }
        writeln!(out)?;
    }

    for label in graph.labels() {
        for node in graph.labeled_nodes(label) {
            writeln!(out, "label {} {}", quote(label), quote(node))?;
        }
    }

    for caller in graph.graph.node_indices() {
        for callee in graph.neighbors(caller, petgraph::Direction::Outgoing) {
            let Some(edge) = graph.graph.find_edge(caller, callee) else {
                continue;
            };
            writeln!(
                out,
                "edge {} {} {}",
                quote(&graph.graph[caller].name),
                quote(&graph.graph[callee].name),
                graph.graph[edge]
            )?;
        }
    }
    Ok(())
}

// ─── Reading ────────────────────────────────────────────────────────────────

/// Build a graph from a dump.
pub fn read_graph(input: impl BufRead) -> Result<CallGraph> {
    let mut graph = CallGraph::new();
    for (n, line) in input.lines().enumerate() {
        apply_line(&mut graph, &line?, n + 1)?;
    }
    Ok(graph)
}

/// Apply one dump line to `graph`. Blank lines and comments are ignored;
/// `lineno` is only used in error messages.
pub fn apply_line(graph: &mut CallGraph, line: &str, lineno: usize) -> Result<()> {
    let fail = |message: String| CallpathError::Dump {
        line: lineno,
        message,
    };
    let tokens = split_line(line).map_err(fail)?;
    let Some((command, args)) = tokens.split_first() else {
        return Ok(());
    };

    match command.as_str() {
        "node" => apply_node(graph, args).map_err(fail),
        "label" => match args {
            [label, node] => {
                graph.add_label(node, label);
                Ok(())
            }
            _ => Err(fail("usage: label LABEL NODE".to_string())),
        },
        "edge" => match args {
            [caller, callee, kind] => {
                let kind: EdgeKind = kind
                    .parse()
                    .map_err(|e: CallpathError| fail(e.to_string()))?;
                graph
                    .add_edge(caller, callee, kind)
                    .map_err(|e| fail(e.to_string()))
            }
            _ => Err(fail("usage: edge CALLER CALLEE call|ref".to_string())),
        },
        other => Err(fail(format!("unknown dump command '{}'", other))),
    }
}

fn apply_node(graph: &mut CallGraph, args: &[String]) -> std::result::Result<(), String> {
    let mut external = false;
    let mut username = None;
    let mut line = None;
    let mut positional = Vec::new();

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--external" => external = true,
            "--username" => {
                username = Some(args.next().ok_or("--username needs a value")?.as_str());
            }
            "--line" => {
                let value = args.next().ok_or("--line needs a value")?;
                line = Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| format!("invalid line number '{}'", value))?,
                );
            }
            _ => positional.push(arg.as_str()),
        }
    }

    match (external, positional.as_slice()) {
        (true, [name]) => {
            graph.add_external_node(name);
        }
        (true, _) => return Err("usage: node --external NAME".to_string()),
        (false, [name]) => {
            graph.add_node(name, username, None, line);
        }
        (false, [name, file]) => {
            graph.add_node(name, username, Some(*file), line);
        }
        (false, _) => return Err("usage: node NAME [FILE]".to_string()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn dump(graph: &CallGraph) -> String {
        let mut out = Vec::new();
        write_graph(graph, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn sample() -> CallGraph {
        let mut graph = CallGraph::new();
        graph.add_node("main", None, Some("main.c"), Some(3));
        graph.add_node("_Z4helpv", Some("help()"), Some("util file.c"), None);
        graph.add_node("static", None, None, None);
        graph.add_edge("main", "_Z4helpv", EdgeKind::Call).unwrap();
        graph.add_edge("main", "printf", EdgeKind::Call).unwrap();
        graph.add_edge("_Z4helpv", "static", EdgeKind::Ref).unwrap();
        graph.add_edge("_Z4helpv", "puts", EdgeKind::Ref).unwrap();
        graph.add_label("main", "entry");
        graph.add_label("_Z4helpv", "entry");
        graph.add_label("static", "a label");
        graph
    }

    #[test]
    fn test_split_line() {
        assert_eq!(split_line("  node  a b.c ").unwrap(), vec!["node", "a", "b.c"]);
        assert_eq!(
            split_line(r#"node "a b" "q\"uote" x\ y"#).unwrap(),
            vec!["node", "a b", "q\"uote", "x y"]
        );
        assert_eq!(split_line(r#"label "" a"#).unwrap(), vec!["label", "", "a"]);
        assert_eq!(split_line("edge a b # trailing").unwrap(), vec!["edge", "a", "b"]);
        assert!(split_line("# comment").unwrap().is_empty());
        assert!(split_line("").unwrap().is_empty());
        assert!(split_line("node \"open").is_err());
        assert!(split_line("node a\\").is_err());
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("plain"), "plain");
        assert_eq!(quote("a b"), "\"a b\"");
        assert_eq!(quote("say \"hi\""), r#""say \"hi\"""#);
        assert_eq!(quote(""), "\"\"");
        assert_eq!(quote("#x"), "\"#x\"");
        for token in ["a b", "x\\y", "", "#", "q\"", "operator()(int, int)"] {
            assert_eq!(split_line(&quote(token)).unwrap(), vec![token.to_string()]);
        }
    }

    #[test]
    fn test_write_format() {
        let text = dump(&sample());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "node --line 3 main main.c",
                "node --username help() _Z4helpv \"util file.c\"",
                "node static",
                "node --external printf",
                "node --external puts",
                "label \"a label\" static",
                "label entry help()",
                "label entry main",
                "edge main _Z4helpv call",
                "edge main printf call",
                "edge _Z4helpv static ref",
                "edge _Z4helpv puts ref",
            ]
        );
    }

    #[test]
    fn test_round_trip() {
        let mut original = sample();
        original.omit_node("main");
        original.set_filter_default(false);

        let text = dump(&original);
        let mut loaded = read_graph(Cursor::new(text.as_bytes())).unwrap();

        original.reset_filter();
        assert_eq!(loaded.all_nodes(true), original.all_nodes(true));
        assert_eq!(loaded.all_nodes(false), original.all_nodes(false));
        for caller in original.all_nodes(true) {
            for callee in original.all_nodes(true) {
                assert_eq!(
                    loaded.edge_type(&caller, &callee),
                    original.edge_type(&caller, &callee)
                );
            }
        }
        for label in original.labels() {
            assert_eq!(
                loaded.labeled_nodes(label).collect::<Vec<_>>(),
                original.labeled_nodes(label).collect::<Vec<_>>()
            );
        }
        assert_eq!(loaded.node("main").unwrap().line, Some(3));
        assert_eq!(loaded.display_name("_Z4helpv"), Some("help()"));
        assert_eq!(dump(&loaded), text);

        loaded.reset_labels();
        assert_eq!(loaded.stats().label_count, 0);
    }

    #[test]
    fn test_read_errors() {
        let err = read_graph(Cursor::new("node a\nedge b a call\n")).unwrap_err();
        match err {
            CallpathError::Dump { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("caller not found"), "{}", message);
            }
            other => panic!("unexpected error {:?}", other),
        }

        let err = read_graph(Cursor::new("node a\nedge a b jump\n")).unwrap_err();
        assert!(matches!(err, CallpathError::Dump { line: 2, .. }));
        let err = read_graph(Cursor::new("node --external a a.c\n")).unwrap_err();
        assert!(matches!(err, CallpathError::Dump { line: 1, .. }));
        let err = read_graph(Cursor::new("node --line x a\n")).unwrap_err();
        assert!(matches!(err, CallpathError::Dump { line: 1, .. }));
        let err = read_graph(Cursor::new("\n\nfrobnicate\n")).unwrap_err();
        assert!(matches!(err, CallpathError::Dump { line: 3, .. }));
    }

    #[test]
    fn test_read_skips_comments() {
        let graph = read_graph(Cursor::new("# saved graph\n\nnode a\n  # more\nnode b\n")).unwrap();
        assert_eq!(graph.all_nodes(false), vec!["a", "b"]);
    }
}
