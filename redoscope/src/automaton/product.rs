use std::collections::HashMap;

use tracing::debug;

use crate::error::AnalysisError;

use super::eps_nfa::StateId;
use super::lookahead::LookAheadDfa;
use super::ordered::OrderedNfa;

/// One labeled transition of the product automaton. The label is the pair
/// `(atom, look)`: the character class consumed and the look-ahead state
/// after it. Targets keep the duplicate multiplicity of the underlying
/// [`OrderedNfa`] row.
#[derive(Debug, Clone)]
pub(crate) struct WlaTransition {
    pub atom: u32,
    pub look: u32,
    pub targets: Vec<u32>,
}

/// The NFA with look-ahead: OrderedNfa states paired with look-ahead DFA
/// states.
///
/// A transition `((q,p), (a,p')) -> (q',p')` exists iff `delta(q,a)`
/// contains `q'`, the look-ahead steps back consistently
/// (`dfa.delta[p'][a] == p`), and `q'` can accept the suffix `p'` stands
/// for (`q' ∈ p'`). The membership test is the dead-end pruning: every
/// surviving transition lies on a real accepting path.
///
/// Only pairs reachable from the initial set are materialized.
#[derive(Debug)]
pub(crate) struct NfaWithLookAhead {
    /// Pair id to `(q, p)`.
    pub pairs: Vec<(StateId, u32)>,
    /// Outgoing transitions per pair id, ordered by `(atom, look)`.
    pub transitions: Vec<Vec<WlaTransition>>,
    pub inits: Vec<u32>,
    pub accepts: Vec<u32>,
}

impl NfaWithLookAhead {
    pub fn build(
        nfa: &OrderedNfa,
        dfa: &LookAheadDfa,
        max_delta_size: usize,
    ) -> Result<NfaWithLookAhead, AnalysisError> {
        // Invert the look-ahead step: for a source look-ahead `p`, which
        // post-character look-aheads `p'` are consistent with reading
        // `atom`?
        let mut inverse: Vec<Vec<Vec<u32>>> = vec![vec![Vec::new(); dfa.len()]; nfa.alphabet.len()];
        for (p_next, row) in dfa.delta.iter().enumerate() {
            for (atom, &p) in row.iter().enumerate() {
                inverse[atom][p as usize].push(p_next as u32);
            }
        }

        let mut ids: HashMap<(StateId, u32), u32> = HashMap::new();
        let mut pairs: Vec<(StateId, u32)> = Vec::new();
        let mut intern = |pair: (StateId, u32), pairs: &mut Vec<(StateId, u32)>| -> u32 {
            *ids.entry(pair).or_insert_with(|| {
                pairs.push(pair);
                (pairs.len() - 1) as u32
            })
        };

        let mut inits = Vec::new();
        for &q in &nfa.inits {
            for p in 0..dfa.len() as u32 {
                inits.push(intern((q, p), &mut pairs));
            }
        }

        let mut transitions: Vec<Vec<WlaTransition>> = Vec::new();
        let mut total_targets = 0usize;
        let mut next = 0;
        while next < pairs.len() {
            let id = next;
            next += 1;
            let (q, p) = pairs[id];
            let mut outgoing = Vec::new();
            for (&(_, atom), targets) in nfa.transitions_of(q) {
                for &look in &inverse[atom as usize][p as usize] {
                    let live: Vec<u32> = targets
                        .iter()
                        .filter(|&&target| dfa.contains(look, target))
                        .map(|&target| intern((target, look), &mut pairs))
                        .collect();
                    if live.is_empty() {
                        continue;
                    }
                    total_targets += live.len();
                    if total_targets > max_delta_size {
                        return Err(AnalysisError::LookAheadTooLarge {
                            size: total_targets,
                            max: max_delta_size,
                        });
                    }
                    outgoing.push(WlaTransition {
                        atom,
                        look,
                        targets: live,
                    });
                }
            }
            transitions.push(outgoing);
        }

        let accepts: Vec<u32> = pairs
            .iter()
            .enumerate()
            .filter(|&(_, &(q, p))| p == dfa.init && nfa.accept[q as usize])
            .map(|(id, _)| id as u32)
            .collect();

        debug!(
            pairs = pairs.len(),
            transitions = total_targets,
            accepts = accepts.len(),
            "built NFA with look-ahead"
        );
        Ok(NfaWithLookAhead {
            pairs,
            transitions,
            inits,
            accepts,
        })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Plain adjacency (labels dropped, duplicates kept) for SCC analysis.
    pub fn adjacency(&self) -> Vec<Vec<u32>> {
        self.transitions
            .iter()
            .map(|outgoing| {
                outgoing
                    .iter()
                    .flat_map(|transition| transition.targets.iter().copied())
                    .collect()
            })
            .collect()
    }
}
