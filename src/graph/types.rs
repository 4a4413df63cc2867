//! Core types for the call graph.
//!
//! Defines edge kinds, the data carried by each node, and the summary
//! returned by [`CallGraph::stats`](super::CallGraph::stats).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CallpathError;

/// The kind of an edge between two symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// The caller invokes the callee.
    Call,
    /// The caller only mentions the callee (address taken, table entry...).
    Ref,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Call => write!(f, "call"),
            EdgeKind::Ref => write!(f, "ref"),
        }
    }
}

impl FromStr for EdgeKind {
    type Err = CallpathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "call" => Ok(EdgeKind::Call),
            "ref" => Ok(EdgeKind::Ref),
            other => Err(CallpathError::InvalidEdgeKind(other.to_string())),
        }
    }
}

/// Data stored in a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    /// Canonical name; the node's identity.
    pub name: String,
    /// Name shown to the user, if different from the canonical one.
    pub username: Option<String>,
    /// Definition site.
    pub file: Option<String>,
    pub line: Option<u32>,
    /// True until the symbol is defined.
    pub external: bool,
}

impl NodeData {
    /// A placeholder for a symbol that is referenced but not defined.
    pub fn external(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            username: None,
            file: None,
            line: None,
            external: true,
        }
    }

    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.name)
    }
}

/// Graph statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub external_nodes: usize,
    pub total_edges: usize,
    pub ref_edges: usize,
    pub file_count: usize,
    pub label_count: usize,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes ({} external), {} edges ({} ref), {} files, {} labels",
            self.total_nodes,
            self.external_nodes,
            self.total_edges,
            self.ref_edges,
            self.file_count,
            self.label_count
        )
    }
}
