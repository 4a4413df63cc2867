//! Command session for callpath.
//!
//! Commands:
//! - Graph: node, edge, label, source
//! - Filters: omit, keep, only, reset
//! - Query: callers, callees, labels, paths, stats
//! - Export: save, output

pub mod dot;
pub mod session;

pub use session::Session;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::graph::EdgeKind;

/// One command line, without a binary name.
#[derive(Parser, Debug)]
#[command(name = "callpath", no_binary_name = true)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Command,
}

/// Functions to act on, and whether to extend the set through the graph.
#[derive(Args, Debug)]
pub struct Selection {
    /// Include all callers, recursively
    #[arg(long)]
    pub callers: bool,

    /// Include all callees, recursively
    #[arg(long)]
    pub callees: bool,

    /// Node selectors
    #[arg(value_name = "FUNC", required = true)]
    pub funcs: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    // ─── Graph ──────────────────────────────────────────────────────
    /// Create a node for a symbol
    Node {
        /// Make the symbol external
        #[arg(long)]
        external: bool,

        /// Name shown instead of the symbol name
        #[arg(long)]
        username: Option<String>,

        /// Line of the definition
        #[arg(long)]
        line: Option<u32>,

        name: String,

        /// File in which the node is defined
        file: Option<String>,
    },

    /// Create an edge; the caller must exist already
    Edge {
        caller: String,
        callee: String,

        /// call or ref
        #[arg(default_value = "call")]
        kind: EdgeKind,
    },

    /// Label functions, or list the functions carrying LABEL
    Label {
        label: String,

        #[arg(value_name = "FUNC")]
        funcs: Vec<String>,
    },

    /// Run the commands in FILE
    Source { file: PathBuf },

    // ─── Filters ────────────────────────────────────────────────────
    /// Hide functions from queries and exports
    Omit(Selection),

    /// Undo "omit" on functions
    Keep(Selection),

    /// Hide everything except these functions and kept ones
    Only(Selection),

    /// Drop filters and/or labels (both by default)
    Reset {
        #[arg(long)]
        filters: bool,

        #[arg(long)]
        labels: bool,
    },

    // ─── Query ──────────────────────────────────────────────────────
    /// Print the callers of functions
    Callers {
        /// Include references to functions
        #[arg(long)]
        include_ref: bool,

        #[arg(value_name = "FUNC", required = true)]
        funcs: Vec<String>,
    },

    /// Print the callees of functions
    Callees {
        /// Include external functions
        #[arg(long)]
        include_external: bool,

        /// Include references to functions
        #[arg(long)]
        include_ref: bool,

        #[arg(value_name = "FUNC", required = true)]
        funcs: Vec<String>,
    },

    /// Print the labels of functions
    Labels {
        #[arg(value_name = "FUNC", required = true)]
        funcs: Vec<String>,
    },

    /// Print the call paths matching a path expression
    Paths {
        #[arg(long)]
        include_external: bool,

        #[arg(long)]
        include_ref: bool,

        /// Number of paths to print
        #[arg(long, value_parser = positive)]
        limit: Option<usize>,

        #[arg(value_name = "EXPR", required = true)]
        expr: Vec<String>,
    },

    /// Show graph statistics
    Stats {
        #[arg(long)]
        json: bool,
    },

    // ─── Export ─────────────────────────────────────────────────────
    /// Write the graph as a command script
    Save { file: Option<PathBuf> },

    /// Write the visible graph in DOT format
    Output {
        /// Group nodes by source file
        #[arg(long)]
        files: bool,

        #[arg(long)]
        include_external: bool,

        #[arg(long)]
        include_ref: bool,

        file: Option<PathBuf>,
    },
}

fn positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("{} is not a positive integer", value)),
    }
}
