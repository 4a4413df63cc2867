//! # callpath
//!
//! Interactive call-graph exploration with path regular expressions.
//!
//! A [`CallGraph`] stores functions (nodes) and the calls or references
//! between them (edges). Paths through the graph are searched with a finite
//! automaton over node names: an expression such as `main ... [locking]`
//! compiles to a [`RegexAst`], then to an NFA, and drives a depth-first walk
//! that only follows edges the automaton can still accept.
//!
//! ## Key Features
//!
//! - **Automata**: Thompson NFA, lazily determinized DFA, explicit DFA with
//!   reversal and minimization
//! - **Filtering**: omit/keep nodes, hide callers or callees, with automatic
//!   cleanup of nodes left disconnected
//! - **Selectors**: names, regexes, labels, boolean combinations and
//!   caller/callee closures
//! - **Session**: line-oriented command scripts, text dumps and DOT export
//!
//! ## Quick Start
//!
//! ```rust
//! use callpath::{query, CallGraph, EdgeKind};
//!
//! let mut graph = CallGraph::new();
//! for name in ["a", "b", "c", "d"] {
//!     graph.add_node(name, None, None, None);
//! }
//! graph.add_edge("a", "b", EdgeKind::Call)?;
//! graph.add_edge("b", "c", EdgeKind::Call)?;
//! graph.add_edge("a", "d", EdgeKind::Call)?;
//!
//! // Paths from a to c, most recent node first
//! let ast = query::parse_path(&graph, "a ... c")?;
//! let mut dfa = ast.nfa().lazy_dfa();
//! let paths: Vec<Vec<String>> = graph
//!     .paths(&mut dfa, false, false, None)
//!     .map(|path| path.to_vec())
//!     .collect();
//! assert_eq!(paths, vec![vec!["c", "b", "a"]]);
//! # Ok::<(), callpath::CallpathError>(())
//! ```

pub mod automata;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod matchers;
pub mod query;

// Re-exports for convenience
pub use error::{CallpathError, Result};

// Graph re-exports
pub use graph::{read_graph, write_graph, CallGraph, EdgeKind, GraphStats, NodeData, PathStack};

// Automata
pub use automata::{Automaton, Dfa, LazyDfa, Nfa, Predicate, RegexAst};

// Selectors and the command session
pub use cli::Session;
pub use matchers::Matcher;
pub use query::{parse_path, parse_selector};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::{BufReader, BufWriter};

    /// a -ref-> b -call-> c -call-> d, a -call-> d, L1 on a and c.
    fn sample_graph() -> CallGraph {
        let mut graph = CallGraph::new();
        for name in ["a", "b", "c", "d"] {
            graph.add_node(name, None, None, None);
        }
        graph.add_edge("a", "b", EdgeKind::Ref).unwrap();
        graph.add_edge("b", "c", EdgeKind::Call).unwrap();
        graph.add_edge("c", "d", EdgeKind::Call).unwrap();
        graph.add_edge("a", "d", EdgeKind::Call).unwrap();
        graph.add_label("a", "L1");
        graph.add_label("c", "L1");
        graph
    }

    /// a, then anything, then d.
    fn a_to_d() -> RegexAst {
        RegexAst::Sequence(vec![
            RegexAst::one(Predicate::equals("a")),
            RegexAst::star(RegexAst::one(Predicate::any())),
            RegexAst::one(Predicate::equals("d")),
        ])
    }

    fn collect<A: Automaton>(graph: &CallGraph, automaton: &mut A, ref_ok: bool) -> Vec<Vec<String>> {
        let mut paths: Vec<Vec<String>> = graph
            .paths(automaton, false, ref_ok, None)
            .map(|p| p.to_vec())
            .collect();
        paths.sort_by(|x, y| x.len().cmp(&y.len()).then_with(|| x.cmp(y)));
        paths
    }

    fn expected() -> Vec<Vec<String>> {
        vec![
            vec!["d".to_string(), "a".to_string()],
            vec![
                "d".to_string(),
                "c".to_string(),
                "b".to_string(),
                "a".to_string(),
            ],
        ]
    }

    #[test]
    fn test_path_search_engines_agree() {
        let graph = sample_graph();

        let mut nfa = a_to_d().nfa();
        assert_eq!(collect(&graph, &mut nfa, true), expected());

        let mut lazy = a_to_d().nfa().lazy_dfa();
        assert_eq!(collect(&graph, &mut lazy, true), expected());

        let alphabet = graph.all_nodes(true);
        let mut dfa = a_to_d().nfa().dfa(&alphabet);
        assert_eq!(collect(&graph, &mut dfa, true), expected());

        let mut minimal = dfa.minimal();
        assert!(minimal.state_count() <= dfa.state_count());
        assert_eq!(collect(&graph, &mut minimal, true), expected());
    }

    #[test]
    fn test_path_search_from_text() {
        let graph = sample_graph();
        let mut dfa = parse_path(&graph, "a ... d").unwrap().nfa().lazy_dfa();
        assert_eq!(collect(&graph, &mut dfa, true), expected());

        let mut dfa = parse_path(&graph, "a ... d").unwrap().nfa().lazy_dfa();
        assert_eq!(collect(&graph, &mut dfa, false), vec![expected()[0].clone()]);

        // Paths between two L1 nodes
        let mut dfa = parse_path(&graph, "[L1] ... [L1]").unwrap().nfa().lazy_dfa();
        assert_eq!(
            collect(&graph, &mut dfa, true),
            vec![vec!["c".to_string(), "b".to_string(), "a".to_string()]]
        );
    }

    #[test]
    fn test_abandoned_search_leaves_graph_untouched() {
        let graph = sample_graph();
        let before = graph.all_nodes(true);
        let mut dfa = a_to_d().nfa().lazy_dfa();
        let first = graph.paths(&mut dfa, false, true, None).next();
        assert!(first.is_some());
        assert_eq!(graph.all_nodes(true), before);
        assert_eq!(graph.callees("a", false, true), vec!["b", "d"]);
    }

    #[test]
    fn test_visibility_cascade() {
        let mut graph = CallGraph::new();
        for name in ["a", "b", "c", "d"] {
            graph.add_node(name, None, None, None);
        }
        graph.add_edge("a", "c", EdgeKind::Call).unwrap();
        graph.add_edge("b", "c", EdgeKind::Call).unwrap();
        graph.add_edge("a", "d", EdgeKind::Call).unwrap();
        graph.omit_callers("c");
        assert!(graph.filter_node("a", false));
        assert!(!graph.filter_node("b", false));
        assert!(!graph.filter_node("c", false));
        assert!(graph.filter_node("d", false));
    }

    #[test]
    fn test_dump_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.txt");
        let mut graph = sample_graph();
        graph.add_node("_Z4mainv", Some("main()"), Some("main.cc"), Some(10));
        graph.add_edge("_Z4mainv", "a", EdgeKind::Call).unwrap();
        graph.add_edge("_Z4mainv", "exit", EdgeKind::Call).unwrap();

        write_graph(&graph, BufWriter::new(File::create(&path).unwrap())).unwrap();
        let loaded = read_graph(BufReader::new(File::open(&path).unwrap())).unwrap();

        let nodes = graph.all_nodes(true);
        assert_eq!(loaded.all_nodes(true), nodes);
        for caller in &nodes {
            assert_eq!(loaded.is_node_external(caller), graph.is_node_external(caller));
            assert_eq!(loaded.node_labels(caller), graph.node_labels(caller));
            for callee in &nodes {
                assert_eq!(loaded.edge_type(caller, callee), graph.edge_type(caller, callee));
            }
        }
        assert_eq!(loaded.stats(), graph.stats());
    }

    #[test]
    fn test_selectors_on_sample() {
        let graph = sample_graph();
        let names = |text: &str| -> Vec<String> {
            parse_selector(text)
                .unwrap()
                .match_nodes(&graph)
                .into_iter()
                .collect()
        };
        assert_eq!(names("[L1]"), vec!["a", "c"]);
        assert_eq!(names("[!L1]"), vec!["b", "d"]);
        assert_eq!(names("d:all_callers"), vec!["a", "b", "c", "d"]);
        assert_eq!(names("[L1]:callees"), vec!["d"]);
        assert_eq!(names("/^[ab]$/ d"), vec!["a", "b", "d"]);
    }
}
