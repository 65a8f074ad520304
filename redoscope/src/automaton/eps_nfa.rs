use crate::syntax::Span;
use crate::unicode::IChar;

/// A state index into the owning automaton. States are created during
/// construction and immutable afterwards; everything downstream holds
/// indices, never references.
pub(crate) type StateId = u32;

/// One outgoing transition. `label == None` is an epsilon transition.
/// The position of a transition in its source's list is its priority:
/// lower positions are tried first by a backtracking matcher.
#[derive(Debug, Clone)]
pub(crate) struct EpsTransition {
    pub label: Option<IChar>,
    pub target: StateId,
}

impl EpsTransition {
    pub fn is_epsilon(&self) -> bool {
        self.label.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct EpsState {
    pub transitions: Vec<EpsTransition>,
    /// Source span of the AST node this state was created for.
    pub span: Option<Span>,
}

/// An epsilon-NFA with priority-ordered transitions, the direct image of
/// the AST under the quantifier translation rules.
#[derive(Debug, Clone)]
pub(crate) struct EpsNfa {
    pub states: Vec<EpsState>,
    pub initial: StateId,
    /// Sorted.
    pub accepting: Vec<StateId>,
}

impl EpsNfa {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn transitions_from(&self, state: StateId) -> &[EpsTransition] {
        &self.states[state as usize].transitions
    }

    pub fn is_accepting(&self, state: StateId) -> bool {
        self.accepting.binary_search(&state).is_ok()
    }

    /// All states reachable from `state` over epsilon transitions alone,
    /// including `state` itself. Sorted.
    pub fn epsilon_closure(&self, state: StateId) -> Vec<StateId> {
        let mut closure = vec![state];
        let mut seen = vec![false; self.states.len()];
        seen[state as usize] = true;
        let mut i = 0;
        while i < closure.len() {
            let s = closure[i];
            i += 1;
            for transition in self.transitions_from(s) {
                if transition.is_epsilon() && !seen[transition.target as usize] {
                    seen[transition.target as usize] = true;
                    closure.push(transition.target);
                }
            }
        }
        closure.sort_unstable();
        closure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nfa(transitions: &[(StateId, Option<char>, StateId)], states: usize) -> EpsNfa {
        let mut nfa = EpsNfa {
            states: vec![EpsState::default(); states],
            initial: 0,
            accepting: vec![states as StateId - 1],
        };
        for &(from, label, to) in transitions {
            nfa.states[from as usize].transitions.push(EpsTransition {
                label: label.map(|c| IChar::single(u32::from(c))),
                target: to,
            });
        }
        nfa
    }

    #[test]
    fn closure_follows_epsilon_only() {
        let nfa = nfa(
            &[(0, None, 1), (1, Some('a'), 2), (1, None, 3), (3, None, 0)],
            4,
        );
        assert_eq!(nfa.epsilon_closure(0), vec![0, 1, 3]);
        assert_eq!(nfa.epsilon_closure(2), vec![2]);
    }

    #[test]
    fn closure_handles_cycles() {
        let nfa = nfa(&[(0, None, 1), (1, None, 0), (1, None, 2)], 3);
        assert_eq!(nfa.epsilon_closure(0), vec![0, 1, 2]);
    }
}
