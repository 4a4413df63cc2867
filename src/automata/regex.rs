//! Regular expressions over node-name symbols.

use super::{Nfa, Predicate};

/// Abstract syntax of a path regex. Atoms are symbol predicates.
///
/// An empty `Sequence` or `Alt` matches the empty sequence, like `Empty`.
#[derive(Debug, Clone)]
pub enum RegexAst {
    Empty,
    One(Predicate),
    Sequence(Vec<RegexAst>),
    Star(Box<RegexAst>),
    Alt(Vec<RegexAst>),
}

impl RegexAst {
    pub fn one(predicate: Predicate) -> Self {
        RegexAst::One(predicate)
    }

    pub fn star(atom: RegexAst) -> Self {
        RegexAst::Star(Box::new(atom))
    }

    /// Make `initial` accept this regex inside `nfa` and return the
    /// accepting state (Thompson's construction).
    pub fn tack(&self, nfa: &mut Nfa, initial: usize) -> usize {
        match self {
            RegexAst::Empty => {
                let accept = nfa.add_state();
                nfa.add_epsilon_transition(initial, accept);
                accept
            }
            RegexAst::One(predicate) => {
                let accept = nfa.add_state();
                nfa.add_transition(initial, predicate.clone(), accept);
                accept
            }
            RegexAst::Sequence(atoms) if atoms.is_empty() => RegexAst::Empty.tack(nfa, initial),
            RegexAst::Sequence(atoms) => atoms
                .iter()
                .fold(initial, |state, atom| atom.tack(nfa, state)),
            RegexAst::Star(atom) => {
                let loop_head = nfa.add_state();
                let accept = nfa.add_state();
                nfa.add_epsilon_transition(initial, loop_head);
                nfa.add_epsilon_transition(initial, accept);
                let body_end = atom.tack(nfa, loop_head);
                nfa.add_epsilon_transition(body_end, loop_head);
                nfa.add_epsilon_transition(loop_head, accept);
                accept
            }
            RegexAst::Alt(atoms) if atoms.is_empty() => RegexAst::Empty.tack(nfa, initial),
            RegexAst::Alt(atoms) => {
                let accept = nfa.add_state();
                for atom in atoms {
                    let branch = nfa.add_state();
                    nfa.add_epsilon_transition(initial, branch);
                    let branch_end = atom.tack(nfa, branch);
                    nfa.add_epsilon_transition(branch_end, accept);
                }
                accept
            }
        }
    }

    /// Compile into a fresh NFA whose state 0 is initial.
    pub fn nfa(&self) -> Nfa {
        let mut nfa = Nfa::new();
        let initial = nfa.add_state();
        let accept = self.tack(&mut nfa, initial);
        nfa.mark_final(accept);
        nfa
    }
}
