//! Node selectors.
//!
//! A [`Matcher`] picks a set of nodes out of a [`CallGraph`], and can also
//! be turned into a single-symbol [`Predicate`] so that it doubles as an
//! atom of a path regex.

use regex::Regex;
use std::collections::BTreeSet;

use crate::automata::Predicate;
use crate::graph::CallGraph;

#[derive(Debug, Clone)]
pub enum Matcher {
    /// The node with exactly this name.
    ByName(String),
    /// Nodes whose display name contains a match of the regex.
    ByRegex(Regex),
    /// Nodes carrying a label.
    Label(String),
    /// Intersection; with no operands, every node.
    And(Vec<Matcher>),
    /// Union; with no operands, no node.
    Or(Vec<Matcher>),
    Not(Box<Matcher>),
    /// Direct callers of the selected nodes (call edges only).
    Callers(Box<Matcher>),
    /// Direct callees of the selected nodes (defined nodes, call edges only).
    Callees(Box<Matcher>),
    /// The selected nodes and everything that reaches them.
    AllCallers(Box<Matcher>),
    /// The selected nodes and everything they reach.
    AllCallees(Box<Matcher>),
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        use Matcher::*;
        match (self, other) {
            (ByName(a), ByName(b)) | (Label(a), Label(b)) => a == b,
            (ByRegex(a), ByRegex(b)) => a.as_str() == b.as_str(),
            (And(a), And(b)) | (Or(a), Or(b)) => a == b,
            (Not(a), Not(b))
            | (Callers(a), Callers(b))
            | (Callees(a), Callees(b))
            | (AllCallers(a), AllCallers(b))
            | (AllCallees(a), AllCallees(b)) => a == b,
            _ => false,
        }
    }
}

impl Matcher {
    pub fn by_name(name: impl Into<String>) -> Self {
        Matcher::ByName(name.into())
    }

    pub fn by_regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Matcher::ByRegex)
    }

    pub fn label(label: impl Into<String>) -> Self {
        Matcher::Label(label.into())
    }

    pub fn negate(self) -> Self {
        Matcher::Not(Box::new(self))
    }

    pub fn callers(self) -> Self {
        Matcher::Callers(Box::new(self))
    }

    pub fn callees(self) -> Self {
        Matcher::Callees(Box::new(self))
    }

    pub fn all_callers(self) -> Self {
        Matcher::AllCallers(Box::new(self))
    }

    pub fn all_callees(self) -> Self {
        Matcher::AllCallees(Box::new(self))
    }

    /// Display names of the selected nodes.
    pub fn match_nodes(&self, graph: &CallGraph) -> BTreeSet<String> {
        match self {
            Matcher::ByName(name) => graph
                .display_name(name)
                .map(str::to_string)
                .into_iter()
                .collect(),
            Matcher::Label(label) => graph.labeled_nodes(label).map(str::to_string).collect(),
            Matcher::And(matchers) => {
                let mut iter = matchers.iter();
                let Some(first) = iter.next() else {
                    return graph.all_nodes(true).into_iter().collect();
                };
                let mut nodes = first.match_nodes(graph);
                for matcher in iter {
                    let other = matcher.match_nodes(graph);
                    nodes.retain(|n| other.contains(n));
                }
                nodes
            }
            Matcher::Or(matchers) => matchers
                .iter()
                .flat_map(|m| m.match_nodes(graph))
                .collect(),
            Matcher::ByRegex(_) | Matcher::Not(_) => {
                let predicate = self.as_predicate(graph);
                graph
                    .all_nodes(true)
                    .into_iter()
                    .filter(|n| predicate.test(n))
                    .collect()
            }
            Matcher::Callers(inner) => inner
                .match_nodes(graph)
                .iter()
                .flat_map(|n| graph.callers(n, false))
                .collect(),
            Matcher::Callees(inner) => inner
                .match_nodes(graph)
                .iter()
                .flat_map(|n| graph.callees(n, false, false))
                .collect(),
            Matcher::AllCallers(inner) => inner
                .match_nodes(graph)
                .iter()
                .flat_map(|n| graph.all_callers(n))
                .collect(),
            Matcher::AllCallees(inner) => inner
                .match_nodes(graph)
                .iter()
                .flat_map(|n| graph.all_callees(n))
                .collect(),
        }
    }

    /// A predicate over display names equivalent to [`Matcher::match_nodes`].
    ///
    /// Selectors that depend on labels or edges are evaluated once, against
    /// the graph as it is now.
    pub fn as_predicate(&self, graph: &CallGraph) -> Predicate {
        match self {
            Matcher::ByName(name) => {
                Predicate::equals(graph.display_name(name).unwrap_or(name))
            }
            Matcher::ByRegex(re) => {
                let re = re.clone();
                Predicate::new(move |name| re.is_match(name))
            }
            Matcher::And(matchers) => {
                let predicates: Vec<Predicate> =
                    matchers.iter().map(|m| m.as_predicate(graph)).collect();
                Predicate::new(move |name| predicates.iter().all(|p| p.test(name)))
            }
            Matcher::Or(matchers) => {
                let predicates: Vec<Predicate> =
                    matchers.iter().map(|m| m.as_predicate(graph)).collect();
                Predicate::new(move |name| predicates.iter().any(|p| p.test(name)))
            }
            Matcher::Not(inner) => {
                let predicate = inner.as_predicate(graph);
                Predicate::new(move |name| !predicate.test(name))
            }
            Matcher::Label(_)
            | Matcher::Callers(_)
            | Matcher::Callees(_)
            | Matcher::AllCallers(_)
            | Matcher::AllCallees(_) => {
                let nodes = self.match_nodes(graph);
                Predicate::new(move |name| nodes.contains(name))
            }
        }
    }

    /// Collapse single-operand AND/OR and double negation.
    pub fn optimize(self) -> Matcher {
        match self {
            Matcher::And(mut matchers) if matchers.len() == 1 => {
                matchers.remove(0).optimize()
            }
            Matcher::Or(mut matchers) if matchers.len() == 1 => {
                matchers.remove(0).optimize()
            }
            Matcher::And(matchers) => {
                Matcher::And(matchers.into_iter().map(Matcher::optimize).collect())
            }
            Matcher::Or(matchers) => {
                Matcher::Or(matchers.into_iter().map(Matcher::optimize).collect())
            }
            Matcher::Not(inner) => match inner.optimize() {
                Matcher::Not(twice) => *twice,
                other => other.negate(),
            },
            Matcher::Callers(inner) => inner.optimize().callers(),
            Matcher::Callees(inner) => inner.optimize().callees(),
            Matcher::AllCallers(inner) => inner.optimize().all_callers(),
            Matcher::AllCallees(inner) => inner.optimize().all_callees(),
            leaf => leaf,
        }
    }
}
