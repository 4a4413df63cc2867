//! Nondeterministic automata and their on-demand determinization.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use super::{Automaton, Dfa, Predicate};

/// A configuration of an [`Nfa`]: the epsilon-closed set of current states.
pub type StateSet = BTreeSet<usize>;

/// Nondeterministic automaton with predicate-labeled and epsilon transitions.
///
/// Epsilon closures are cached per basis state. Adding an epsilon
/// transition drops the cache.
#[derive(Debug, Clone, Default)]
pub struct Nfa {
    transitions: Vec<Vec<(Predicate, usize)>>,
    epsilon: Vec<Vec<usize>>,
    finals: BTreeSet<usize>,
    closures: HashMap<usize, StateSet>,
}

impl Nfa {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&mut self) -> usize {
        self.transitions.push(Vec::new());
        self.epsilon.push(Vec::new());
        self.transitions.len() - 1
    }

    pub fn state_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn mark_final(&mut self, state: usize) {
        assert!(state < self.state_count(), "no such NFA state: {}", state);
        self.finals.insert(state);
    }

    pub fn add_transition(&mut self, source: usize, predicate: Predicate, dest: usize) {
        assert!(dest < self.state_count(), "no such NFA state: {}", dest);
        self.transitions[source].push((predicate, dest));
    }

    pub fn add_epsilon_transition(&mut self, source: usize, dest: usize) {
        assert!(dest < self.state_count(), "no such NFA state: {}", dest);
        self.epsilon[source].push(dest);
        self.closures.clear();
    }

    /// States reachable from `state` through epsilon transitions alone,
    /// `state` included.
    pub fn epsilon_closure(&mut self, state: usize) -> &StateSet {
        if !self.closures.contains_key(&state) {
            let closure = self.compute_closure(state);
            self.closures.insert(state, closure);
        }
        &self.closures[&state]
    }

    fn compute_closure(&self, state: usize) -> StateSet {
        let mut closure = StateSet::new();
        let mut pending = vec![state];
        while let Some(s) = pending.pop() {
            if closure.insert(s) {
                pending.extend(self.epsilon[s].iter().copied());
            }
        }
        closure
    }

    /// Targets of every transition out of `source` whose predicate accepts
    /// `symbol`, before closure.
    fn targets(&self, source: &StateSet, symbol: &str) -> Vec<usize> {
        source
            .iter()
            .flat_map(|&s| self.transitions[s].iter())
            .filter(|(predicate, _)| predicate.test(symbol))
            .map(|&(_, dest)| dest)
            .collect()
    }

    fn close_all(&mut self, basis: impl IntoIterator<Item = usize>) -> StateSet {
        let mut result = StateSet::new();
        for state in basis {
            result.extend(self.epsilon_closure(state).iter().copied());
        }
        result
    }

    /// Wrap this automaton in a [`LazyDfa`].
    pub fn lazy_dfa(self) -> LazyDfa {
        LazyDfa::new(self)
    }

    /// Subset-construct an explicit [`Dfa`] over `alphabet`.
    ///
    /// Symbols outside the alphabet have no transition in the result.
    pub fn dfa<S: AsRef<str>>(&mut self, alphabet: &[S]) -> Dfa {
        let mut dfa = Dfa::new();
        if self.state_count() == 0 {
            return dfa;
        }

        let initial = self.initial();
        let mut statemap: HashMap<StateSet, usize> = HashMap::new();
        statemap.insert(initial.clone(), dfa.add_state());
        let mut queue = VecDeque::from([initial]);

        while let Some(sources) = queue.pop_front() {
            let source = statemap[&sources];
            if self.is_final(&sources) {
                dfa.mark_final(source);
            }
            for symbol in alphabet {
                let symbol = symbol.as_ref();
                let basis = self.targets(&sources, symbol);
                if basis.is_empty() {
                    continue;
                }
                let dests = self.close_all(basis);
                let dest = match statemap.get(&dests) {
                    Some(&dest) => dest,
                    None => {
                        let dest = dfa.add_state();
                        statemap.insert(dests.clone(), dest);
                        queue.push_back(dests);
                        dest
                    }
                };
                dfa.add_transition(source, symbol, dest);
            }
        }
        dfa
    }
}

impl Automaton for Nfa {
    type State = StateSet;

    fn initial(&mut self) -> StateSet {
        if self.state_count() == 0 {
            return StateSet::new();
        }
        self.epsilon_closure(0).clone()
    }

    fn advance(&mut self, source: &StateSet, symbol: &str) -> StateSet {
        let basis = self.targets(source, symbol);
        self.close_all(basis)
    }

    fn is_final(&self, state: &StateSet) -> bool {
        state.iter().any(|s| self.finals.contains(s))
    }

    fn is_failure(&self, state: &StateSet) -> bool {
        state.is_empty()
    }
}

// ─── Lazy DFA ────────────────────────────────────────────────────────────────

/// A DFA computed from an [`Nfa`] one transition at a time.
///
/// Each NFA configuration gets a dense id the first time it is reached, and
/// each `(state, symbol)` transition is computed once and cached. `None` is
/// the dead state.
#[derive(Debug, Clone)]
pub struct LazyDfa {
    nfa: Nfa,
    nfa_states: Vec<StateSet>,
    transitions: Vec<HashMap<String, Option<usize>>>,
    statemap: HashMap<StateSet, usize>,
    finals: HashSet<usize>,
}

impl LazyDfa {
    pub fn new(nfa: Nfa) -> Self {
        Self {
            nfa,
            nfa_states: Vec::new(),
            transitions: Vec::new(),
            statemap: HashMap::new(),
            finals: HashSet::new(),
        }
    }

    /// Number of DFA states discovered so far.
    pub fn state_count(&self) -> usize {
        self.nfa_states.len()
    }

    fn dfa_state(&mut self, states: StateSet) -> Option<usize> {
        if states.is_empty() {
            return None;
        }
        if let Some(&id) = self.statemap.get(&states) {
            return Some(id);
        }
        let id = self.nfa_states.len();
        if self.nfa.is_final(&states) {
            self.finals.insert(id);
        }
        self.statemap.insert(states.clone(), id);
        self.nfa_states.push(states);
        self.transitions.push(HashMap::new());
        Some(id)
    }
}

impl Automaton for LazyDfa {
    type State = Option<usize>;

    fn initial(&mut self) -> Option<usize> {
        let states = self.nfa.initial();
        self.dfa_state(states)
    }

    fn advance(&mut self, source: &Option<usize>, symbol: &str) -> Option<usize> {
        let source = (*source)?;
        if let Some(&dest) = self.transitions[source].get(symbol) {
            return dest;
        }
        let next = self.nfa.advance(&self.nfa_states[source], symbol);
        let dest = self.dfa_state(next);
        self.transitions[source].insert(symbol.to_string(), dest);
        dest
    }

    fn is_final(&self, state: &Option<usize>) -> bool {
        state.map_or(false, |s| self.finals.contains(&s))
    }

    fn is_failure(&self, state: &Option<usize>) -> bool {
        state.is_none()
    }
}
