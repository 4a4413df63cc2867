//! Explicit deterministic automata.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use super::{Automaton, StateSet};

/// A DFA with an explicit transition table. State 0 is initial; a missing
/// transition leads to the dead state, represented as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dfa {
    transitions: Vec<BTreeMap<String, usize>>,
    finals: BTreeSet<usize>,
}

impl Dfa {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&mut self) -> usize {
        self.transitions.push(BTreeMap::new());
        self.transitions.len() - 1
    }

    pub fn state_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn mark_final(&mut self, state: usize) {
        assert!(state < self.state_count(), "no such DFA state: {}", state);
        self.finals.insert(state);
    }

    pub fn add_transition(&mut self, source: usize, symbol: impl Into<String>, dest: usize) {
        assert!(dest < self.state_count(), "no such DFA state: {}", dest);
        self.transitions[source].insert(symbol.into(), dest);
    }

    pub fn transition(&self, source: usize, symbol: &str) -> Option<usize> {
        self.transitions.get(source)?.get(symbol).copied()
    }

    /// The automaton accepting the reversed language.
    ///
    /// Subset construction over the inverted transition table, starting
    /// from the set of final states. A reversed state is final when its set
    /// contains state 0.
    pub fn reverse(&self) -> Dfa {
        let mut inverted: Vec<BTreeMap<&str, Vec<usize>>> =
            vec![BTreeMap::new(); self.state_count()];
        for (source, row) in self.transitions.iter().enumerate() {
            for (symbol, &dest) in row {
                inverted[dest].entry(symbol.as_str()).or_default().push(source);
            }
        }

        let mut result = Dfa::new();
        let initial: StateSet = self.finals.clone();
        let mut statemap: HashMap<StateSet, usize> = HashMap::new();
        statemap.insert(initial.clone(), result.add_state());
        let mut queue = VecDeque::from([initial]);

        while let Some(sources) = queue.pop_front() {
            let source = statemap[&sources];
            if sources.contains(&0) {
                result.mark_final(source);
            }

            let mut moves: BTreeMap<&str, StateSet> = BTreeMap::new();
            for &state in &sources {
                for (&symbol, preds) in &inverted[state] {
                    moves.entry(symbol).or_default().extend(preds.iter().copied());
                }
            }

            for (symbol, dests) in moves {
                let dest = match statemap.get(&dests) {
                    Some(&dest) => dest,
                    None => {
                        let dest = result.add_state();
                        statemap.insert(dests.clone(), dest);
                        queue.push_back(dests);
                        dest
                    }
                };
                result.add_transition(source, symbol, dest);
            }
        }
        result
    }

    /// Drop states that are unreachable from state 0 or that cannot reach a
    /// final state. Surviving states keep their relative order.
    pub fn trim(&self) -> Dfa {
        let n = self.state_count();
        if n == 0 {
            return Dfa::new();
        }

        let mut reachable = vec![false; n];
        let mut pending = vec![0];
        while let Some(state) = pending.pop() {
            if !std::mem::replace(&mut reachable[state], true) {
                pending.extend(self.transitions[state].values().copied());
            }
        }

        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (source, row) in self.transitions.iter().enumerate() {
            for &dest in row.values() {
                preds[dest].push(source);
            }
        }
        let mut live = vec![false; n];
        let mut pending: Vec<usize> = self.finals.iter().copied().collect();
        while let Some(state) = pending.pop() {
            if !std::mem::replace(&mut live[state], true) {
                pending.extend(preds[state].iter().copied());
            }
        }

        if !(reachable[0] && live[0]) {
            return Dfa::new();
        }

        let mut renumber: Vec<Option<usize>> = vec![None; n];
        let mut result = Dfa::new();
        for state in 0..n {
            if reachable[state] && live[state] {
                renumber[state] = Some(result.add_state());
            }
        }
        for (source, row) in self.transitions.iter().enumerate() {
            let Some(new_source) = renumber[source] else {
                continue;
            };
            for (symbol, &dest) in row {
                if let Some(new_dest) = renumber[dest] {
                    result.add_transition(new_source, symbol.clone(), new_dest);
                }
            }
            if self.finals.contains(&source) {
                result.mark_final(new_source);
            }
        }
        result
    }

    /// Brzozowski minimization: trim, then reverse twice.
    pub fn minimal(&self) -> Dfa {
        self.trim().reverse().reverse()
    }
}

impl Automaton for Dfa {
    type State = Option<usize>;

    fn initial(&mut self) -> Option<usize> {
        (self.state_count() > 0).then_some(0)
    }

    fn advance(&mut self, source: &Option<usize>, symbol: &str) -> Option<usize> {
        self.transition((*source)?, symbol)
    }

    fn is_final(&self, state: &Option<usize>) -> bool {
        state.map_or(false, |s| self.finals.contains(&s))
    }

    fn is_failure(&self, state: &Option<usize>) -> bool {
        state.is_none()
    }
}
