//! Call graph module: the symbol store, its visibility filters and labels,
//! automaton-guided path search, and the text dump format.

pub mod dump;
pub mod engine;
pub mod filter;
pub mod labels;
pub mod paths;
pub mod types;

pub use dump::{read_graph, write_graph};
pub use engine::CallGraph;
pub use paths::{PathSearch, PathStack};
pub use types::{EdgeKind, GraphStats, NodeData};
