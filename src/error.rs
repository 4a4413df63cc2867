//! Error types for callpath.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the graph store, the query parsers and the CLI session.
#[derive(Debug, Error)]
pub enum CallpathError {
    /// The caller of an edge has not been added to the graph.
    #[error("caller not found in graph: {0}")]
    UnknownNode(String),

    /// Edges can only start from defined nodes.
    #[error("cannot add edge from external node: {0}")]
    ExternalCaller(String),

    #[error("invalid edge type '{0}' (expected 'call' or 'ref')")]
    InvalidEdgeKind(String),

    /// Selector or path expression that does not parse.
    #[error("invalid search terms at column {position}: {message}")]
    Parse { position: usize, message: String },

    /// Failing line in a graph dump or command script.
    #[error("line {line}: {message}")]
    Dump { line: usize, message: String },

    /// Failing line in a sourced command script.
    #[error("{}: line {line}: {message}", .path.display())]
    Script {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Usage error in a session command.
    #[error("{0}")]
    Command(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CallpathError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        CallpathError::Parse {
            position,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CallpathError>;
