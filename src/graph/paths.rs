//! Automaton-guided path search.
//!
//! The search walks the call graph depth-first while feeding the display
//! name of each node to an automaton, and yields the current path whenever
//! the automaton accepts. Paths are simple: a node appears at most once.
//!
//! Paths are built on a [`PathStack`], a persistent linked list. A yielded
//! path is a snapshot that later pushes and pops do not affect, so callers
//! can hold on to it while the search continues.

use petgraph::graph::NodeIndex;
use petgraph::Direction;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::debug;

use super::engine::CallGraph;
use crate::automata::Automaton;

// ─── Path Stack ─────────────────────────────────────────────────────────────

#[derive(Debug)]
struct PathLink {
    value: String,
    next: Option<Rc<PathLink>>,
}

/// A persistent stack of node names, most recent first.
///
/// Pushing allocates a new head that points at the previous one; popping
/// only moves the head back. Clones share their tail.
#[derive(Debug, Clone, Default)]
pub struct PathStack {
    head: Option<Rc<PathLink>>,
}

impl PathStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: impl Into<String>) {
        let next = self.head.take();
        self.head = Some(Rc::new(PathLink {
            value: value.into(),
            next,
        }));
    }

    /// Drop the most recent element, returning it.
    pub fn pop(&mut self) -> Option<String> {
        let head = self.head.take()?;
        self.head = head.next.clone();
        Some(head.value.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Iterate from the most recent element to the oldest.
    pub fn iter(&self) -> PathIter<'_> {
        PathIter {
            curr: self.head.as_deref(),
        }
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }
}

impl Drop for PathStack {
    // Unlink iteratively so long paths do not overflow the stack.
    fn drop(&mut self) {
        let mut curr = self.head.take();
        while let Some(link) = curr {
            match Rc::try_unwrap(link) {
                Ok(mut link) => curr = link.next.take(),
                Err(_) => break,
            }
        }
    }
}

pub struct PathIter<'a> {
    curr: Option<&'a PathLink>,
}

impl<'a> Iterator for PathIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let link = self.curr?;
        self.curr = link.next.as_deref();
        Some(&link.value)
    }
}

impl<'a> IntoIterator for &'a PathStack {
    type Item = &'a str;
    type IntoIter = PathIter<'a>;

    fn into_iter(self) -> PathIter<'a> {
        self.iter()
    }
}

// ─── Search ─────────────────────────────────────────────────────────────────

/// A suspended level of the depth-first walk.
struct Frame<S> {
    /// Node entered at this level; `None` for the root level.
    node: Option<NodeIndex>,
    candidates: Vec<NodeIndex>,
    pos: usize,
    state: S,
}

/// Lazy iterator over the paths accepted by an automaton.
///
/// Created by [`CallGraph::paths`]. Stop pulling to cancel the search.
pub struct PathSearch<'a, A: Automaton> {
    graph: &'a CallGraph,
    automaton: &'a mut A,
    external_ok: bool,
    ref_ok: bool,
    limit: Option<usize>,
    found: usize,
    visited: HashSet<NodeIndex>,
    /// Nodes known to pass the node filter.
    valid: HashSet<NodeIndex>,
    path: PathStack,
    frames: Vec<Frame<A::State>>,
}

impl CallGraph {
    /// Search for paths accepted by `automaton`.
    ///
    /// Any node can start a path; each following node is a callee of the
    /// previous one through a visible edge. Yielded paths list the most
    /// recently visited node first. At most `limit` paths are produced.
    pub fn paths<'a, A: Automaton>(
        &'a self,
        automaton: &'a mut A,
        external_ok: bool,
        ref_ok: bool,
        limit: Option<usize>,
    ) -> PathSearch<'a, A> {
        debug!(external_ok, ref_ok, ?limit, "starting path search");
        let root = Frame {
            node: None,
            candidates: self.graph.node_indices().collect(),
            pos: 0,
            state: automaton.initial(),
        };
        PathSearch {
            graph: self,
            automaton,
            external_ok,
            ref_ok,
            limit,
            found: 0,
            visited: HashSet::new(),
            valid: HashSet::new(),
            path: PathStack::new(),
            frames: vec![root],
        }
    }
}

impl<'a, A: Automaton> Iterator for PathSearch<'a, A> {
    type Item = PathStack;

    fn next(&mut self) -> Option<PathStack> {
        if self.limit.is_some_and(|limit| self.found >= limit) {
            return None;
        }
        let graph = self.graph;

        loop {
            let Some(frame) = self.frames.last_mut() else {
                debug!(found = self.found, "path search finished");
                return None;
            };

            if frame.pos == frame.candidates.len() {
                if let Some(node) = frame.node {
                    self.path.pop();
                    self.visited.remove(&node);
                }
                self.frames.pop();
                continue;
            }

            let target = frame.candidates[frame.pos];
            frame.pos += 1;

            if self.visited.contains(&target) {
                continue;
            }
            if let Some(caller) = frame.node {
                if !graph.filter_edge_index(caller, target, self.ref_ok) {
                    continue;
                }
            }
            if !self.valid.contains(&target) {
                if !graph.filter_index(target, self.external_ok) {
                    continue;
                }
                self.valid.insert(target);
            }

            let name = graph.name_of(target);
            let state = self.automaton.advance(&frame.state, name);
            if self.automaton.is_failure(&state) {
                continue;
            }

            let accepted = self.automaton.is_final(&state);
            self.visited.insert(target);
            self.path.push(name);
            self.frames.push(Frame {
                node: Some(target),
                candidates: graph.neighbors(target, Direction::Outgoing),
                pos: 0,
                state,
            });

            if accepted {
                self.found += 1;
                return Some(self.path.clone());
            }
        }
    }
}
