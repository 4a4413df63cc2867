//! Finite automata whose alphabet is strings (graph node names).
//!
//! Three engines implement [`Automaton`]: [`Nfa`] runs the nondeterministic
//! automaton directly, [`LazyDfa`] determinizes it on demand, and [`Dfa`] is
//! an explicit transition table that supports reversal and minimization.
//! [`RegexAst`] compiles to an [`Nfa`] with Thompson's construction.

pub mod dfa;
pub mod nfa;
pub mod regex;

pub use dfa::Dfa;
pub use nfa::{LazyDfa, Nfa, StateSet};
pub use regex::RegexAst;

use std::fmt;
use std::sync::Arc;

/// A single-symbol test used to label NFA transitions.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl Predicate {
    pub fn new(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Accepts every symbol.
    pub fn any() -> Self {
        Self::new(|_| true)
    }

    /// Accepts exactly `symbol`.
    pub fn equals(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self::new(move |s| s == symbol)
    }

    pub fn test(&self, symbol: &str) -> bool {
        (self.0)(symbol)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Common contract of the automaton engines.
///
/// `advance` takes `&mut self` because the lazy engines fill their caches
/// while they run.
pub trait Automaton {
    type State: Clone;

    /// The state at the start of a visit.
    fn initial(&mut self) -> Self::State;

    /// The state reached by consuming `symbol` from `source`.
    fn advance(&mut self, source: &Self::State, symbol: &str) -> Self::State;

    fn is_final(&self, state: &Self::State) -> bool;

    /// True if no continuation from `state` can ever be accepted.
    fn is_failure(&self, _state: &Self::State) -> bool {
        false
    }

    /// Whether the automaton accepts the whole sequence.
    fn matches<I, S>(&mut self, feed: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        Self: Sized,
    {
        let mut state = self.initial();
        for symbol in feed {
            if self.is_failure(&state) {
                return false;
            }
            state = self.advance(&state, symbol.as_ref());
        }
        self.is_final(&state)
    }

    /// Start a symbol-at-a-time visit.
    fn visit(&mut self) -> Visitor<'_, Self>
    where
        Self: Sized,
    {
        Visitor::new(self)
    }
}

/// Cursor feeding an automaton one symbol at a time.
pub struct Visitor<'a, A: Automaton> {
    automaton: &'a mut A,
    state: A::State,
}

impl<'a, A: Automaton> Visitor<'a, A> {
    pub fn new(automaton: &'a mut A) -> Self {
        let state = automaton.initial();
        Self { automaton, state }
    }

    pub fn visit(&mut self, symbol: &str) {
        self.state = self.automaton.advance(&self.state, symbol);
    }

    pub fn success(&self) -> bool {
        self.automaton.is_final(&self.state)
    }
}
