//! Visibility filtering.
//!
//! Filters never change the graph itself; they only decide which nodes and
//! edges queries, exports and path searches see. All names are stored in
//! canonical form.

use petgraph::graph::NodeIndex;
use petgraph::Direction;
use std::collections::HashSet;
use tracing::debug;

use super::engine::CallGraph;
use super::types::EdgeKind;

#[derive(Debug, Clone)]
pub(super) struct FilterState {
    omitted: HashSet<String>,
    /// `None` until the first `keep_node`.
    keep: Option<HashSet<String>>,
    /// Edges directed to these nodes are ignored.
    omitting_callers: HashSet<String>,
    /// Edges starting from these nodes are ignored.
    omitting_callees: HashSet<String>,
    filter_default: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            omitted: HashSet::new(),
            keep: None,
            omitting_callers: HashSet::new(),
            omitting_callees: HashSet::new(),
            filter_default: true,
        }
    }
}

impl CallGraph {
    /// Whether `name` is visible. Unknown names are never visible.
    pub fn filter_node(&self, name: &str, external_ok: bool) -> bool {
        self.index(name)
            .is_some_and(|idx| self.filter_index(idx, external_ok))
    }

    pub(super) fn filter_index(&self, idx: NodeIndex, external_ok: bool) -> bool {
        let node = &self.graph[idx];
        if !external_ok && node.external {
            return false;
        }
        let filter = &self.filter;
        if filter.keep.as_ref().is_some_and(|k| k.contains(&node.name)) {
            return true;
        }
        if filter.omitted.contains(&node.name) {
            return false;
        }
        filter.filter_default
    }

    /// Whether the edge from `caller` to `callee` is visible. Returns false
    /// if either node or the edge does not exist.
    pub fn filter_edge(&self, caller: &str, callee: &str, ref_ok: bool) -> bool {
        match (self.index(caller), self.index(callee)) {
            (Some(caller), Some(callee)) => self.filter_edge_index(caller, callee, ref_ok),
            _ => false,
        }
    }

    pub(super) fn filter_edge_index(
        &self,
        caller: NodeIndex,
        callee: NodeIndex,
        ref_ok: bool,
    ) -> bool {
        let caller_node = &self.graph[caller];
        let callee_node = &self.graph[callee];
        if self.filter.omitting_callees.contains(&caller_node.name)
            || self.filter.omitting_callers.contains(&callee_node.name)
        {
            return false;
        }
        match self.graph.find_edge(caller, callee) {
            Some(edge) => match self.graph[edge] {
                EdgeKind::Call => true,
                EdgeKind::Ref => ref_ok && !callee_node.external,
            },
            None => false,
        }
    }

    // ─── Filter Operations ──────────────────────────────────────

    /// Hide a node. Removes it from the keep set.
    pub fn omit_node(&mut self, name: &str) {
        let name = self.canonical(name).to_string();
        if let Some(keep) = self.filter.keep.as_mut() {
            keep.remove(&name);
        }
        self.filter.omitted.insert(name);
    }

    /// Show a node even if omitted or if the default is to hide nodes.
    /// Removes it from the omitted set.
    pub fn keep_node(&mut self, name: &str) {
        let name = self.canonical(name).to_string();
        self.filter.omitted.remove(&name);
        self.filter.keep.get_or_insert_with(HashSet::new).insert(name);
    }

    /// Hide every edge into `name`, then hide `name` and its direct callers
    /// if that leaves them without any visible edge.
    pub fn omit_callers(&mut self, name: &str) {
        let idx = self.index(name);
        let name = self.canonical(name).to_string();
        self.filter.omitting_callers.insert(name);
        if let Some(idx) = idx {
            let callers = self.neighbors(idx, Direction::Incoming);
            self.check_visibility(idx);
            for caller in callers {
                self.check_visibility(caller);
            }
        }
    }

    /// Hide every edge out of `name`, then hide `name` and its direct
    /// callees if that leaves them without any visible edge.
    pub fn omit_callees(&mut self, name: &str) {
        let idx = self.index(name);
        let name = self.canonical(name).to_string();
        self.filter.omitting_callees.insert(name);
        if let Some(idx) = idx {
            let callees = self.neighbors(idx, Direction::Outgoing);
            self.check_visibility(idx);
            for callee in callees {
                self.check_visibility(callee);
            }
        }
    }

    /// Clear every filter and make nodes visible by default.
    pub fn reset_filter(&mut self) {
        self.filter = FilterState::default();
    }

    /// Visibility of nodes that are neither kept nor omitted.
    pub fn set_filter_default(&mut self, visible: bool) {
        self.filter.filter_default = visible;
    }

    /// Omit a node that has no visible caller and no visible callee under
    /// the most permissive settings.
    fn check_visibility(&mut self, idx: NodeIndex) {
        let has_caller = self
            .neighbors(idx, Direction::Incoming)
            .into_iter()
            .any(|c| self.filter_index(c, true) && self.filter_edge_index(c, idx, true));
        if has_caller {
            return;
        }
        let has_callee = self
            .neighbors(idx, Direction::Outgoing)
            .into_iter()
            .any(|c| self.filter_index(c, true) && self.filter_edge_index(idx, c, true));
        if has_callee {
            return;
        }

        let name = self.graph[idx].name.clone();
        debug!(node = %name, "omitting disconnected node");
        if let Some(keep) = self.filter.keep.as_mut() {
            keep.remove(&name);
        }
        self.filter.omitted.insert(name);
    }
}
