//! The call graph store.
//!
//! Uses petgraph to hold symbols and their call/ref edges, with name
//! indexes for lookup by canonical or display name. Visibility filtering
//! lives in [`super::filter`], labels in [`super::labels`].

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use super::filter::FilterState;
use super::types::*;
use crate::error::{CallpathError, Result};

/// A graph of program symbols connected by call and ref edges.
#[derive(Debug)]
pub struct CallGraph {
    /// The directed graph; at most one edge per (caller, callee) pair.
    pub(super) graph: DiGraph<NodeData, EdgeKind>,
    /// Index: canonical name -> node.
    pub(super) name_index: HashMap<String, NodeIndex>,
    /// Index: display name -> node, for defined nodes with a username.
    pub(super) username_index: HashMap<String, NodeIndex>,
    /// Index: file -> nodes defined there, in definition order.
    pub(super) file_index: BTreeMap<String, Vec<NodeIndex>>,
    /// Label -> canonical names of the labeled nodes.
    pub(super) labels: BTreeMap<String, BTreeSet<String>>,
    pub(super) filter: FilterState,
}

impl CallGraph {
    /// Create a new empty call graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_index: HashMap::new(),
            username_index: HashMap::new(),
            file_index: BTreeMap::new(),
            labels: BTreeMap::new(),
            filter: FilterState::default(),
        }
    }

    // ─── Node Operations ────────────────────────────────────────

    /// Add a placeholder for a symbol that is not defined (yet).
    /// Does nothing if the node exists.
    pub fn add_external_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.name_index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(NodeData::external(name));
        self.name_index.insert(name.to_string(), idx);
        idx
    }

    /// Define a symbol. Only the first definition of a node is recorded;
    /// later calls leave username, file and line untouched.
    pub fn add_node(
        &mut self,
        name: &str,
        username: Option<&str>,
        file: Option<&str>,
        line: Option<u32>,
    ) -> NodeIndex {
        let idx = self.add_external_node(name);
        let node = &mut self.graph[idx];
        if !node.external {
            return idx;
        }

        node.external = false;
        node.username = username.map(str::to_string);
        node.file = file.map(str::to_string);
        node.line = line;
        if let Some(username) = username {
            self.username_index.insert(username.to_string(), idx);
        }
        if let Some(file) = file {
            self.file_index.entry(file.to_string()).or_default().push(idx);
        }
        debug!(node = name, ?username, ?file, "defined node");
        idx
    }

    // ─── Edge Operations ────────────────────────────────────────

    /// Add an edge. The caller must be a defined node; the callee is
    /// created as external if it does not exist.
    ///
    /// A `ref` edge never replaces an existing `call` edge, while a `call`
    /// edge upgrades an existing `ref` edge.
    pub fn add_edge(&mut self, caller: &str, callee: &str, kind: EdgeKind) -> Result<()> {
        let caller_idx = match self.name_index.get(caller) {
            Some(&idx) => idx,
            None => return Err(CallpathError::UnknownNode(caller.to_string())),
        };
        if self.graph[caller_idx].external {
            return Err(CallpathError::ExternalCaller(caller.to_string()));
        }

        let callee_idx = self.add_external_node(callee);
        match self.graph.find_edge(caller_idx, callee_idx) {
            Some(edge) if kind == EdgeKind::Call => self.graph[edge] = EdgeKind::Call,
            Some(_) => {}
            None => {
                self.graph.add_edge(caller_idx, callee_idx, kind);
            }
        }
        Ok(())
    }

    // ─── Lookup ─────────────────────────────────────────────────

    /// Find a node by display name first, then by canonical name.
    pub(crate) fn index(&self, name: &str) -> Option<NodeIndex> {
        self.username_index
            .get(name)
            .or_else(|| self.name_index.get(name))
            .copied()
    }

    /// Resolve a display or canonical name to its node.
    pub fn resolve(&self, name: &str) -> Option<&NodeData> {
        self.index(name).map(|idx| &self.graph[idx])
    }

    /// Look up a node by canonical name only.
    pub fn node(&self, name: &str) -> Option<&NodeData> {
        self.name_index.get(name).map(|&idx| &self.graph[idx])
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.index(name).is_some()
    }

    pub fn is_node_external(&self, name: &str) -> bool {
        self.resolve(name).is_some_and(|n| n.external)
    }

    /// The name under which `name` is shown, if the node exists.
    pub fn display_name(&self, name: &str) -> Option<&str> {
        self.resolve(name).map(NodeData::display_name)
    }

    /// Canonical name of `name`, or `name` itself if it does not resolve.
    pub(super) fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.resolve(name).map_or(name, |n| n.name.as_str())
    }

    /// The kind of the edge between two nodes, if there is one.
    pub fn edge_type(&self, caller: &str, callee: &str) -> Option<EdgeKind> {
        let edge = self.graph.find_edge(self.index(caller)?, self.index(callee)?)?;
        Some(self.graph[edge])
    }

    // ─── Query Operations ───────────────────────────────────────

    /// Display names of every visible node, in insertion order.
    pub fn all_nodes(&self, external_ok: bool) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|&idx| self.filter_index(idx, external_ok))
            .map(|idx| self.name_of(idx).to_string())
            .collect()
    }

    /// Display names of the visible nodes defined in `file`.
    pub fn all_nodes_for_file(&self, file: &str) -> Vec<String> {
        self.file_index
            .get(file)
            .into_iter()
            .flatten()
            .filter(|&&idx| self.filter_index(idx, false))
            .map(|&idx| self.name_of(idx).to_string())
            .collect()
    }

    /// Every file that defines at least one node, sorted.
    pub fn all_files(&self) -> Vec<String> {
        self.file_index.keys().cloned().collect()
    }

    /// Visible callers of `name` through visible edges.
    pub fn callers(&self, name: &str, ref_ok: bool) -> Vec<String> {
        let Some(callee) = self.index(name) else {
            return Vec::new();
        };
        self.neighbors(callee, Direction::Incoming)
            .into_iter()
            .filter(|&caller| {
                self.filter_index(caller, true) && self.filter_edge_index(caller, callee, ref_ok)
            })
            .map(|idx| self.name_of(idx).to_string())
            .collect()
    }

    /// Visible callees of `name` through visible edges.
    pub fn callees(&self, name: &str, external_ok: bool, ref_ok: bool) -> Vec<String> {
        let Some(caller) = self.index(name) else {
            return Vec::new();
        };
        self.neighbors(caller, Direction::Outgoing)
            .into_iter()
            .filter(|&callee| {
                self.filter_index(callee, external_ok)
                    && self.filter_edge_index(caller, callee, ref_ok)
            })
            .map(|idx| self.name_of(idx).to_string())
            .collect()
    }

    /// `name` and everything that reaches it, ignoring filters.
    pub fn all_callers(&self, name: &str) -> Vec<String> {
        self.reachable(name, Direction::Incoming)
    }

    /// `name` and everything it reaches, ignoring filters.
    pub fn all_callees(&self, name: &str) -> Vec<String> {
        self.reachable(name, Direction::Outgoing)
    }

    // ─── Stats ──────────────────────────────────────────────────

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            total_nodes: self.graph.node_count(),
            external_nodes: self.graph.node_weights().filter(|n| n.external).count(),
            total_edges: self.graph.edge_count(),
            ref_edges: self
                .graph
                .edge_weights()
                .filter(|&&k| k == EdgeKind::Ref)
                .count(),
            file_count: self.file_index.len(),
            label_count: self.labels.len(),
        }
    }

    // ─── Internal Helpers ───────────────────────────────────────

    pub(super) fn name_of(&self, idx: NodeIndex) -> &str {
        self.graph[idx].display_name()
    }

    /// Neighbors in edge insertion order (petgraph lists the newest first).
    pub(super) fn neighbors(&self, idx: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let mut result: Vec<NodeIndex> = self.graph.neighbors_directed(idx, dir).collect();
        result.reverse();
        result
    }

    /// Preorder depth-first walk from `name`.
    fn reachable(&self, name: &str, dir: Direction) -> Vec<String> {
        let Some(start) = self.index(name) else {
            return Vec::new();
        };
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            result.push(self.name_of(idx).to_string());
            let mut next = self.neighbors(idx, dir);
            next.reverse();
            stack.extend(next.into_iter().filter(|n| !visited.contains(n)));
        }
        result
    }
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}
