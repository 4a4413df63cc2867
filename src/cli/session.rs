//! Line-oriented command execution over one call graph.

use clap::error::ErrorKind;
use clap::Parser;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, warn};

use super::dot::{write_dot, DotOptions};
use super::{Command, CommandLine, Selection};
use crate::config::CallpathConfig;
use crate::error::{CallpathError, Result};
use crate::graph::{dump, CallGraph};
use crate::matchers::Matcher;
use crate::query::{parse_path, parse_selector};

/// `source` files may include each other, up to this depth.
const MAX_SOURCE_DEPTH: usize = 32;

/// A graph plus the settings the commands run with.
pub struct Session {
    graph: CallGraph,
    config: CallpathConfig,
    depth: usize,
    /// Failures counted by `source` commands, not yet added to the script
    /// that ran them.
    nested_failures: usize,
}

impl Session {
    pub fn new(config: CallpathConfig) -> Self {
        Self::with_graph(CallGraph::new(), config)
    }

    pub fn with_graph(graph: CallGraph, config: CallpathConfig) -> Self {
        Self {
            graph,
            config,
            depth: 0,
            nested_failures: 0,
        }
    }

    pub fn graph(&self) -> &CallGraph {
        &self.graph
    }

    /// Run every line of `input`.
    ///
    /// With `session.stop_on_error` the first failure aborts the script and
    /// is returned with its line number. Otherwise failures are logged and
    /// counted, and the count is returned. Failures inside sourced files
    /// are included.
    pub fn run_script(&mut self, input: impl BufRead, out: &mut dyn Write) -> Result<usize> {
        let mut failures = 0;
        for (n, line) in input.lines().enumerate() {
            let line = line?;
            let result = self.execute_line(&line, out);
            failures += std::mem::take(&mut self.nested_failures);
            if let Err(e) = result {
                if self.config.session.stop_on_error {
                    return Err(match e {
                        CallpathError::Dump { .. } | CallpathError::Script { .. } => e,
                        e => CallpathError::Dump {
                            line: n + 1,
                            message: e.to_string(),
                        },
                    });
                }
                warn!(line = n + 1, error = %e, "command failed");
                failures += 1;
            }
        }
        Ok(failures)
    }

    /// Run the commands in a file.
    pub fn source(&mut self, path: &Path, out: &mut dyn Write) -> Result<usize> {
        if self.depth >= MAX_SOURCE_DEPTH {
            return Err(CallpathError::Command(format!(
                "{}: source files nested too deeply",
                path.display()
            )));
        }
        info!(path = %path.display(), "sourcing commands");
        let reader = BufReader::new(File::open(path)?);
        self.depth += 1;
        let result = self.run_script(reader, out);
        self.depth -= 1;
        result.map_err(|e| match e {
            CallpathError::Dump { line, message } => CallpathError::Script {
                path: path.to_path_buf(),
                line,
                message,
            },
            e => e,
        })
    }

    /// Tokenize and run one command line. Blank lines and comments do
    /// nothing; `--help` output goes to `out`.
    pub fn execute_line(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        let tokens = dump::split_line(line).map_err(CallpathError::Command)?;
        if tokens.is_empty() {
            return Ok(());
        }
        debug!(command = %tokens[0], "executing");

        match CommandLine::try_parse_from(&tokens) {
            Ok(parsed) => self.execute(parsed.command, out),
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                write!(out, "{}", e)?;
                Ok(())
            }
            Err(e) => Err(CallpathError::Command(e.to_string().trim_end().to_string())),
        }
    }

    pub fn execute(&mut self, command: Command, out: &mut dyn Write) -> Result<()> {
        match command {
            Command::Node {
                external,
                username,
                line,
                name,
                file,
            } => {
                if external {
                    if file.is_some() || username.is_some() || line.is_some() {
                        return Err(CallpathError::Command(
                            "external nodes take no file, username or line".to_string(),
                        ));
                    }
                    self.graph.add_external_node(&name);
                } else {
                    self.graph
                        .add_node(&name, username.as_deref(), file.as_deref(), line);
                }
                Ok(())
            }

            Command::Edge {
                caller,
                callee,
                kind,
            } => self.graph.add_edge(&caller, &callee, kind),

            Command::Label { label, funcs } => {
                if funcs.is_empty() {
                    for node in self.graph.labeled_nodes(&label) {
                        writeln!(out, "{}", node)?;
                    }
                    return Ok(());
                }
                for node in self.label_targets(&funcs)? {
                    self.graph.add_label(&node, &label);
                }
                Ok(())
            }

            Command::Source { file } => {
                self.nested_failures += self.source(&file, out)?;
                Ok(())
            }

            Command::Omit(selection) => {
                for node in self.select(&selection.funcs)? {
                    if !selection.callers && !selection.callees {
                        self.graph.omit_node(&node);
                        continue;
                    }
                    if selection.callers {
                        for caller in self.graph.all_callers(&node) {
                            self.graph.omit_callers(&caller);
                        }
                    }
                    if selection.callees {
                        for callee in self.graph.all_callees(&node) {
                            self.graph.omit_callees(&callee);
                        }
                    }
                }
                Ok(())
            }

            Command::Keep(selection) => self.keep(&selection),

            Command::Only(selection) => {
                self.graph.set_filter_default(false);
                self.keep(&selection)
            }

            Command::Reset { filters, labels } => {
                let all = !filters && !labels;
                if all || filters {
                    self.graph.reset_filter();
                }
                if all || labels {
                    self.graph.reset_labels();
                }
                Ok(())
            }

            Command::Callers { include_ref, funcs } => {
                let ref_ok = include_ref || self.config.search.include_ref;
                let mut result: BTreeMap<String, Vec<String>> = BTreeMap::new();
                for node in self.select(&funcs)? {
                    for caller in self.graph.callers(&node, ref_ok) {
                        result.entry(caller).or_default().push(node.clone());
                    }
                }
                for (caller, callees) in result {
                    writeln!(out, "{} <- {}", callees.join(", "), caller)?;
                }
                Ok(())
            }

            Command::Callees {
                include_external,
                include_ref,
                funcs,
            } => {
                let external_ok = include_external || self.config.search.include_external;
                let ref_ok = include_ref || self.config.search.include_ref;
                let mut result: BTreeMap<String, Vec<String>> = BTreeMap::new();
                for node in self.select(&funcs)? {
                    for callee in self.graph.callees(&node, external_ok, ref_ok) {
                        result.entry(callee).or_default().push(node.clone());
                    }
                }
                for (callee, callers) in result {
                    writeln!(out, "{} <- {}", callee, callers.join(", "))?;
                }
                Ok(())
            }

            Command::Labels { funcs } => {
                let matcher = self.selector(&funcs)?;
                let mut result: BTreeMap<String, Vec<&str>> = BTreeMap::new();
                for label in self.graph.labels() {
                    let labeled = Matcher::And(vec![Matcher::label(label), matcher.clone()]);
                    for node in labeled.match_nodes(&self.graph) {
                        result.entry(node).or_default().push(label);
                    }
                }
                for (node, labels) in result {
                    writeln!(out, "{}: {}", node, labels.join(", "))?;
                }
                Ok(())
            }

            Command::Paths {
                include_external,
                include_ref,
                limit,
                expr,
            } => {
                let external_ok = include_external || self.config.search.include_external;
                let ref_ok = include_ref || self.config.search.include_ref;
                let limit = limit.or(self.config.search.limit);
                let ast = parse_path(&self.graph, &expr.join(" "))?;
                let mut dfa = ast.nfa().lazy_dfa();
                for path in self.graph.paths(&mut dfa, external_ok, ref_ok, limit) {
                    let names: Vec<&str> = path.iter().collect();
                    writeln!(out, "{}", names.join(" <- "))?;
                }
                Ok(())
            }

            Command::Stats { json } => {
                let stats = self.graph.stats();
                if json {
                    let text = serde_json::to_string_pretty(&stats)
                        .map_err(|e| CallpathError::Command(e.to_string()))?;
                    writeln!(out, "{}", text)?;
                } else {
                    write!(out, "{}", stats)?;
                }
                Ok(())
            }

            Command::Save { file } => match file.or_else(|| self.config.output.default_dump.clone()) {
                Some(path) => write_file(&path, |w| dump::write_graph(&self.graph, w)),
                None => dump::write_graph(&self.graph, out),
            },

            Command::Output {
                files,
                include_external,
                include_ref,
                file,
            } => {
                let options = DotOptions {
                    files,
                    include_external: include_external || self.config.search.include_external,
                    include_ref: include_ref || self.config.search.include_ref,
                };
                match file {
                    Some(path) => write_file(&path, |w| write_dot(&self.graph, options, w)),
                    None => write_dot(&self.graph, options, out),
                }
            }
        }
    }

    /// Arguments that all name existing nodes are taken literally, so that
    /// names which are not valid selectors (as found in saved graphs) still
    /// work. Anything else is parsed as one selector.
    fn selector(&self, funcs: &[String]) -> Result<Matcher> {
        if funcs.iter().all(|f| self.graph.has_node(f)) {
            return Ok(Matcher::Or(funcs.iter().map(Matcher::by_name).collect()));
        }
        parse_selector(&funcs.join(" "))
    }

    /// Plain names are labeled whether or not they are nodes, as in a
    /// graph dump. A single argument that is not a selector is taken as a
    /// name.
    fn label_targets(&self, funcs: &[String]) -> Result<Vec<String>> {
        let matcher = match self.selector(funcs) {
            Ok(matcher) => matcher,
            Err(e) if funcs.len() == 1 => {
                debug!(name = %funcs[0], error = %e, "labeling literal name");
                return Ok(funcs.to_vec());
            }
            Err(e) => return Err(e),
        };
        let names = match &matcher {
            Matcher::ByName(name) => vec![name.clone()],
            Matcher::Or(items) => items
                .iter()
                .map(|item| match item {
                    Matcher::ByName(name) => Some(name.clone()),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .unwrap_or_else(|| matcher.match_nodes(&self.graph).into_iter().collect()),
            _ => matcher.match_nodes(&self.graph).into_iter().collect(),
        };
        Ok(names)
    }

    fn select(&self, funcs: &[String]) -> Result<Vec<String>> {
        let matcher = self.selector(funcs)?;
        Ok(matcher.match_nodes(&self.graph).into_iter().collect())
    }

    fn keep(&mut self, selection: &Selection) -> Result<()> {
        for node in self.select(&selection.funcs)? {
            self.graph.keep_node(&node);
            if selection.callers {
                for caller in self.graph.all_callers(&node) {
                    self.graph.keep_node(&caller);
                }
            }
            if selection.callees {
                for callee in self.graph.all_callees(&node) {
                    self.graph.keep_node(&callee);
                }
            }
        }
        Ok(())
    }
}

/// Write to `path`, removing the file again if `emit` fails.
fn write_file(path: &Path, emit: impl FnOnce(&mut dyn Write) -> Result<()>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let result = emit(&mut writer).and_then(|()| writer.flush().map_err(CallpathError::from));
    if result.is_err() {
        drop(writer);
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "could not remove partial output");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn session() -> Session {
        Session::new(CallpathConfig::default())
    }

    fn run(session: &mut Session, script: &str) -> String {
        let mut out = Vec::new();
        session.run_script(Cursor::new(script), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    const SAMPLE: &str = "\
node a
node b
node c
node d
node func_a
edge a b ref
edge b c
edge c d
edge a d
edge func_a b ref
label L1 a c
";

    #[test]
    fn test_build_graph() {
        let mut s = session();
        run(&mut s, SAMPLE);
        let g = s.graph();
        assert_eq!(g.all_nodes(false), vec!["a", "b", "c", "d", "func_a"]);
        assert_eq!(g.edge_type("a", "b"), Some(crate::graph::EdgeKind::Ref));
        assert_eq!(g.edge_type("b", "c"), Some(crate::graph::EdgeKind::Call));
        assert!(g.has_label("c", "L1"));
    }

    #[test]
    fn test_paths() {
        let mut s = session();
        run(&mut s, SAMPLE);
        let mut found = lines(&run(&mut s, "paths a ... d\n"))
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        found.sort();
        assert_eq!(found, vec!["d <- a"]);

        let mut found = lines(&run(&mut s, "paths --include-ref a ... d\n"))
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        found.sort();
        assert_eq!(found, vec!["d <- a", "d <- c <- b <- a"]);

        assert_eq!(lines(&run(&mut s, "paths --limit 1 [] d\n")).len(), 1);
    }

    #[test]
    fn test_callers_and_callees() {
        let mut s = session();
        run(&mut s, SAMPLE);
        assert_eq!(lines(&run(&mut s, "callers b\n")), Vec::<&str>::new());
        assert_eq!(
            lines(&run(&mut s, "callers --include-ref b\n")),
            vec!["b <- a", "b <- func_a"]
        );
        assert_eq!(lines(&run(&mut s, "callers d\n")), vec!["d <- a", "d <- c"]);
        assert_eq!(lines(&run(&mut s, "callees a c\n")), vec!["d <- a, c"]);
        assert_eq!(
            lines(&run(&mut s, "callees --include-ref a\n")),
            vec!["b <- a", "d <- a"]
        );
    }

    #[test]
    fn test_callees_external() {
        let mut s = session();
        run(&mut s, "node main\nedge main printf\n");
        assert!(run(&mut s, "callees main\n").is_empty());
        assert_eq!(
            lines(&run(&mut s, "callees --include-external main\n")),
            vec!["printf <- main"]
        );
    }

    #[test]
    fn test_labels() {
        let mut s = session();
        run(&mut s, SAMPLE);
        run(&mut s, "label L2 [L1] b\n");
        assert_eq!(lines(&run(&mut s, "label L1\n")), vec!["a", "c"]);
        assert_eq!(
            lines(&run(&mut s, "labels [L1|L2]\n")),
            vec!["a: L1, L2", "b: L2", "c: L1, L2"]
        );
        assert_eq!(lines(&run(&mut s, "labels d\n")), Vec::<&str>::new());
    }

    #[test]
    fn test_omit_and_keep() {
        let mut s = session();
        run(&mut s, SAMPLE);
        run(&mut s, "omit c\n");
        assert!(!s.graph().filter_node("c", false));
        run(&mut s, "keep c\n");
        assert!(s.graph().filter_node("c", false));

        run(&mut s, "omit --callees b\n");
        assert!(s.graph().callees("b", true, true).is_empty());
        assert!(s.graph().callees("c", true, true).is_empty());

        run(&mut s, "reset --filters\n");
        assert_eq!(s.graph().callees("b", false, false), vec!["c"]);
        assert!(s.graph().has_label("a", "L1"));
    }

    #[test]
    fn test_omit_callers_cascade() {
        let mut s = session();
        run(
            &mut s,
            "node a\nnode b\nnode c\nnode d\nedge a c\nedge b c\nedge a d\nomit --callers c\n",
        );
        let g = s.graph();
        assert!(g.filter_node("a", false));
        assert!(!g.filter_node("b", false));
        assert!(!g.filter_node("c", false));
        assert!(g.filter_node("d", false));
    }

    #[test]
    fn test_only() {
        let mut s = session();
        run(&mut s, SAMPLE);
        run(&mut s, "only --callees c\n");
        assert_eq!(s.graph().all_nodes(false), vec!["c", "d"]);
        run(&mut s, "only a\n");
        assert_eq!(s.graph().all_nodes(false), vec!["a", "c", "d"]);
        run(&mut s, "reset\n");
        assert_eq!(s.graph().all_nodes(false).len(), 5);
        assert_eq!(s.graph().labels().count(), 0);
    }

    #[test]
    fn test_reset_labels_only() {
        let mut s = session();
        run(&mut s, SAMPLE);
        run(&mut s, "omit a\nreset --labels\n");
        assert_eq!(s.graph().labels().count(), 0);
        assert!(!s.graph().filter_node("a", false));
    }

    #[test]
    fn test_save_and_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.txt");

        let mut s = session();
        run(&mut s, SAMPLE);
        run(&mut s, "node --username \"f()\" --line 4 _Z1fv \"my file.c\"\n");
        run(&mut s, "node \"f(int, float)\"\nlabel L3 \"f(int, float)\"\n");
        run(&mut s, &format!("save {}\n", dump::quote(&path.to_string_lossy())));

        let mut loaded = session();
        run(&mut loaded, &format!("source {}\n", dump::quote(&path.to_string_lossy())));
        assert_eq!(loaded.graph().all_nodes(true), s.graph().all_nodes(true));
        assert_eq!(loaded.graph().display_name("_Z1fv"), Some("f()"));
        assert_eq!(loaded.graph().node("_Z1fv").unwrap().line, Some(4));
        assert!(loaded.graph().has_label("f(int, float)", "L3"));
        assert_eq!(run(&mut loaded, "save\n"), run(&mut s, "save\n"));
    }

    #[test]
    fn test_save_default_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.txt");
        let mut config = CallpathConfig::default();
        config.output.default_dump = Some(path.clone());

        let mut s = Session::new(config);
        run(&mut s, "node a\nsave\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "node a\n");
    }

    #[test]
    fn test_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.dot");
        let mut s = session();
        run(&mut s, SAMPLE);
        run(&mut s, &format!("output --include-ref {}\n", dump::quote(&path.to_string_lossy())));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("digraph callgraph {\n"));
        assert!(text.contains("\"a\" -> \"b\";\n"));
    }

    #[test]
    fn test_config_defaults() {
        let mut config = CallpathConfig::default();
        config.search.include_ref = true;
        config.search.limit = Some(1);
        let mut s = Session::new(config);
        run(&mut s, SAMPLE);
        assert_eq!(lines(&run(&mut s, "paths a ... d\n")).len(), 1);
        assert_eq!(
            lines(&run(&mut s, "callers b\n")),
            vec!["b <- a", "b <- func_a"]
        );
    }

    #[test]
    fn test_stats() {
        let mut s = session();
        run(&mut s, SAMPLE);
        let text = run(&mut s, "stats --json\n");
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["total_nodes"], 5);
        assert_eq!(value["ref_edges"], 2);
        assert!(!run(&mut s, "stats\n").is_empty());
    }

    #[test]
    fn test_errors_stop_script() {
        let mut s = session();
        let mut out = Vec::new();
        let err = s
            .run_script(Cursor::new("node a\n# comment\nedge x a\nnode b\n"), &mut out)
            .unwrap_err();
        assert!(matches!(err, CallpathError::Dump { line: 3, .. }), "{:?}", err);
        assert!(!s.graph().has_node("b"));
    }

    #[test]
    fn test_errors_continue() {
        let mut config = CallpathConfig::default();
        config.session.stop_on_error = false;
        let mut s = Session::new(config);
        let mut out = Vec::new();
        let failures = s
            .run_script(
                Cursor::new("node a\nedge x a\nfrobnicate\npaths a (\nnode --external e e.c\nnode b\n"),
                &mut out,
            )
            .unwrap();
        assert_eq!(failures, 4);
        assert!(s.graph().has_node("b"));
        assert!(!s.graph().has_node("e"));
    }

    #[test]
    fn test_help() {
        let mut s = session();
        let text = run(&mut s, "paths --help\n");
        assert!(text.contains("--limit"));
    }

    #[test]
    fn test_source_missing_file() {
        let mut s = session();
        let mut out = Vec::new();
        let err = s.execute_line("source /nonexistent/callpath/script", &mut out).unwrap_err();
        assert!(matches!(err, CallpathError::Io(_)));
    }

    #[test]
    fn test_source_recursion_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.txt");
        fs::write(&path, format!("source {}\n", dump::quote(&path.to_string_lossy()))).unwrap();
        let mut s = session();
        let mut out = Vec::new();
        assert!(s.source(&path, &mut out).is_err());
        assert_eq!(s.depth, 0);
    }

    #[test]
    fn test_nested_failures_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("inner.txt");
        let outer = dir.path().join("outer.txt");
        fs::write(&inner, "node a\nedge x a\nfrobnicate\nnode b\n").unwrap();
        fs::write(
            &outer,
            format!("source {}\nedge y a\n", dump::quote(&inner.to_string_lossy())),
        )
        .unwrap();

        let mut config = CallpathConfig::default();
        config.session.stop_on_error = false;
        let mut s = Session::new(config);
        let mut out = Vec::new();
        assert_eq!(s.source(&inner, &mut out).unwrap(), 2);
        assert_eq!(s.source(&outer, &mut out).unwrap(), 3);
        assert_eq!(s.nested_failures, 0);
        assert!(s.graph().has_node("b"));
    }

    #[test]
    fn test_nested_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("inner.txt");
        fs::write(&inner, "node a\n\nedge x a\n").unwrap();

        let mut s = session();
        let mut out = Vec::new();
        let script = format!("node z\nsource {}\n", dump::quote(&inner.to_string_lossy()));
        let err = s.run_script(Cursor::new(script), &mut out).unwrap_err();
        match &err {
            CallpathError::Script { path, line, .. } => {
                assert_eq!(path, &inner);
                assert_eq!(*line, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(err.to_string().contains("inner.txt: line 3"), "{}", err);
    }

    #[test]
    fn test_labels_on_names_outside_graph() {
        let mut graph = CallGraph::new();
        graph.add_node("a", None, None, None);
        graph.add_label("ghost", "L");
        graph.add_label("f(x", "L");
        graph.add_label("a", "L");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.txt");
        dump::write_graph(&graph, File::create(&path).unwrap()).unwrap();

        let mut s = session();
        let mut out = Vec::new();
        assert_eq!(s.source(&path, &mut out).unwrap(), 0);
        let replayed: Vec<&str> = s.graph().labeled_nodes("L").collect();
        assert_eq!(replayed, vec!["a", "f(x", "ghost"]);

        let loaded = dump::read_graph(BufReader::new(File::open(&path).unwrap())).unwrap();
        assert_eq!(loaded.labeled_nodes("L").collect::<Vec<_>>(), replayed);

        // Patterns still only label matching nodes
        run(&mut s, "label M /^g/ a\n");
        assert_eq!(s.graph().labeled_nodes("M").collect::<Vec<_>>(), vec!["a"]);
    }
}
