//! Node labels.
//!
//! Labels are stored per label as a set of canonical names, so a label
//! survives its node being defined with a username later. Names that are
//! not nodes are stored verbatim. The labels of a single node are found by
//! scanning.

use super::engine::CallGraph;

impl CallGraph {
    /// Attach `label` to `node`.
    pub fn add_label(&mut self, node: &str, label: &str) {
        let node = self.canonical(node).to_string();
        self.labels.entry(label.to_string()).or_default().insert(node);
    }

    pub fn has_label(&self, node: &str, label: &str) -> bool {
        let node = self.canonical(node);
        self.labels.get(label).is_some_and(|nodes| nodes.contains(node))
    }

    /// Display names of the nodes carrying `label`, sorted. Empty for an
    /// unknown label.
    pub fn labeled_nodes(&self, label: &str) -> impl Iterator<Item = &str> + '_ {
        let mut names: Vec<&str> = self
            .labels
            .get(label)
            .into_iter()
            .flatten()
            .map(|node| self.display_name(node).unwrap_or(node))
            .collect();
        names.sort_unstable();
        names.into_iter()
    }

    /// Every label in use, sorted.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.labels.keys().map(String::as_str)
    }

    /// Labels attached to `node`, sorted.
    pub fn node_labels(&self, node: &str) -> Vec<&str> {
        let node = self.canonical(node);
        self.labels
            .iter()
            .filter(|(_, nodes)| nodes.contains(node))
            .map(|(label, _)| label.as_str())
            .collect()
    }

    pub fn reset_labels(&mut self) {
        self.labels.clear();
    }
}
