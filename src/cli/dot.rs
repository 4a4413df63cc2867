//! Graphviz export of the visible graph.

use std::collections::HashSet;
use std::io::Write;

use crate::error::Result;
use crate::graph::CallGraph;

#[derive(Debug, Clone, Copy, Default)]
pub struct DotOptions {
    /// Wrap the nodes of each source file in a cluster.
    pub files: bool,
    pub include_external: bool,
    pub include_ref: bool,
}

fn quoted(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Write the visible nodes and edges of `graph` as a DOT digraph.
/// Nodes without any printed edge are listed on their own.
pub fn write_dot(graph: &CallGraph, options: DotOptions, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "digraph callgraph {{")?;

    if options.files {
        let mut cluster = 0;
        for file in graph.all_files() {
            let nodes = graph.all_nodes_for_file(&file);
            if nodes.is_empty() {
                continue;
            }
            writeln!(out, "subgraph cluster_{} {{", cluster)?;
            writeln!(out, "label = {};", quoted(&file))?;
            for node in &nodes {
                writeln!(out, "{};", quoted(node))?;
            }
            writeln!(out, "}}")?;
            cluster += 1;
        }
    }

    let nodes = graph.all_nodes(false);
    let mut connected = HashSet::new();
    for node in &nodes {
        let callees = graph.callees(node, options.include_external, options.include_ref);
        if callees.is_empty() {
            continue;
        }
        for callee in callees {
            writeln!(out, "{} -> {};", quoted(node), quoted(&callee))?;
            connected.insert(callee);
        }
        connected.insert(node.clone());
    }

    for node in nodes.iter().filter(|n| !connected.contains(*n)) {
        writeln!(out, "{};", quoted(node))?;
    }

    writeln!(out, "}}")?;
    Ok(())
}
