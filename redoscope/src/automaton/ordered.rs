use std::collections::btree_map::Range;
use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use tracing::debug;

use crate::syntax::Span;
use crate::unicode::IChar;

use super::eps_nfa::{EpsNfa, StateId};

/// The epsilon-free image of an [`EpsNfa`], with two properties the plain
/// construction does not have:
///
/// - transition labels are atoms of the Boolean partition of every label
///   in the automaton, so distinct labels are disjoint;
/// - `delta` target lists may contain *duplicates*, and the duplicates are
///   semantics: the number of occurrences of `q'` in `delta[(q, a)]` is the
///   number of distinct epsilon paths (saturated at 2) from `q` through an
///   `a`-consuming transition into `q'`. A duplicate is the structural
///   signature of ambiguity.
#[derive(Debug)]
pub(crate) struct OrderedNfa {
    /// Partition atoms, ordered by least code point.
    pub alphabet: Vec<IChar>,
    pub state_count: usize,
    /// Ordered initial states.
    pub inits: Vec<StateId>,
    /// Indexed by state: whether the epsilon closure reaches acceptance.
    pub accept: Vec<bool>,
    /// `(state, atom index)` to ordered targets, duplicates preserved.
    pub delta: BTreeMap<(StateId, u32), Vec<StateId>>,
    /// True iff some target list contains a duplicate.
    pub has_multi_trans: bool,
    /// Source spans carried over from the epsilon-NFA, for hotspots.
    pub spans: Vec<Option<Span>>,
}

impl OrderedNfa {
    pub fn from_eps_nfa(nfa: &EpsNfa, max_epsilon_path_len: usize) -> OrderedNfa {
        let labels: Vec<IChar> = nfa
            .states
            .iter()
            .flat_map(|state| &state.transitions)
            .filter_map(|transition| transition.label.clone())
            .sorted()
            .dedup()
            .collect();
        let alphabet = IChar::partition(&labels);

        // An atom is either fully inside or fully outside each label, so a
        // single sample decides membership.
        let atoms_of: HashMap<&IChar, Vec<u32>> = labels
            .iter()
            .map(|label| {
                let atoms = alphabet
                    .iter()
                    .enumerate()
                    .filter(|(_, atom)| label.contains(atom.sample()))
                    .map(|(i, _)| i as u32)
                    .collect();
                (label, atoms)
            })
            .collect();

        let mut delta: BTreeMap<(StateId, u32), Vec<StateId>> = BTreeMap::new();
        let mut accept = vec![false; nfa.len()];

        for q in 0..nfa.len() as StateId {
            for (s, count) in count_epsilon_paths(nfa, q, max_epsilon_path_len) {
                for transition in nfa.transitions_from(s) {
                    let Some(label) = &transition.label else {
                        continue;
                    };
                    for &atom in &atoms_of[label] {
                        let targets = delta.entry((q, atom)).or_default();
                        for _ in 0..count {
                            targets.push(transition.target);
                        }
                    }
                }
            }
            accept[q as usize] = nfa
                .epsilon_closure(q)
                .iter()
                .any(|&s| nfa.is_accepting(s));
        }

        let has_multi_trans = delta
            .values()
            .any(|targets| targets.iter().sorted().tuple_windows().any(|(a, b)| a == b));

        debug!(
            states = nfa.len(),
            atoms = alphabet.len(),
            has_multi_trans,
            "eliminated epsilon transitions"
        );
        OrderedNfa {
            alphabet,
            state_count: nfa.len(),
            inits: vec![nfa.initial],
            accept,
            delta,
            has_multi_trans,
            spans: nfa.states.iter().map(|state| state.span).collect(),
        }
    }

    /// All `(atom, targets)` rows of one source state.
    pub fn transitions_of(&self, q: StateId) -> Range<'_, (StateId, u32), Vec<StateId>> {
        self.delta.range((q, 0)..=(q, u32::MAX))
    }
}

/// Distinct epsilon-path counts from `start`, saturated at 2, in BFS
/// discovery order.
///
/// The counts solve `count(t) = [t == start] + Σ count(s)` over epsilon
/// edges `s → t` within the reachable subgraph, by Gauss–Seidel sweeps in
/// BFS order. The first sweep already propagates along the BFS tree, so
/// every reachable state ends with a count of at least 1; later sweeps
/// move reconvergence and cycle contributions (which is what saturates a
/// count to 2). `max_sweeps` bounds the fixpoint iteration, mirroring the
/// bounded epsilon-path length of the construction.
fn count_epsilon_paths(nfa: &EpsNfa, start: StateId, max_sweeps: usize) -> Vec<(StateId, u32)> {
    // Reachable subgraph in BFS discovery order.
    let mut order = vec![start];
    let mut index: HashMap<StateId, usize> = HashMap::from([(start, 0)]);
    let mut i = 0;
    while i < order.len() {
        let s = order[i];
        i += 1;
        for transition in nfa.transitions_from(s) {
            if transition.is_epsilon() && !index.contains_key(&transition.target) {
                index.insert(transition.target, order.len());
                order.push(transition.target);
            }
        }
    }

    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); order.len()];
    for (i, &s) in order.iter().enumerate() {
        for transition in nfa.transitions_from(s) {
            if transition.is_epsilon() {
                predecessors[index[&transition.target]].push(i);
            }
        }
    }

    let mut counts = vec![0u32; order.len()];
    for _ in 0..max_sweeps.max(1) {
        let mut changed = false;
        for i in 0..order.len() {
            let mut total: u32 = u32::from(i == 0);
            for &p in &predecessors[i] {
                total = (total + counts[p]).min(2);
            }
            if total != counts[i] {
                counts[i] = total;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    order.into_iter().zip(counts).collect()
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, MatchMode};
    use crate::syntax::{Flags, Pattern};

    use super::super::builder::build_eps_nfa;
    use super::*;

    fn ordered(source: &str) -> OrderedNfa {
        let pattern = Pattern::parse(source, Flags::default()).unwrap();
        let config = Config::builder().match_mode(MatchMode::Full).build();
        let nfa = build_eps_nfa(&pattern, &config).unwrap();
        OrderedNfa::from_eps_nfa(&nfa, config.max_epsilon_path_len)
    }

    fn has_duplicate_targets(nfa: &OrderedNfa) -> bool {
        nfa.has_multi_trans
    }

    #[test]
    fn simple_plus_has_no_duplicates() {
        assert!(!has_duplicate_targets(&ordered("^a+$")));
        assert!(!has_duplicate_targets(&ordered("^a*$")));
        assert!(!has_duplicate_targets(&ordered("^[a-z]+$")));
        assert!(!has_duplicate_targets(&ordered("^(a|b)+$")));
    }

    #[test]
    fn nested_plus_duplicates_the_loop_entry() {
        let nfa = ordered("^(a+)+$");
        assert!(has_duplicate_targets(&nfa));
    }

    #[test]
    fn nested_star_duplicates_too() {
        assert!(has_duplicate_targets(&ordered("^((a)*)*$")));
        assert!(has_duplicate_targets(&ordered("^(a*)*$")));
    }

    #[test]
    fn overlapping_alternative_targets_stay_distinct() {
        // (a|a)* is ambiguous through *different* targets; that is the
        // pair graph's job to find, not a duplicate in delta.
        let nfa = ordered("^(a|a)*$");
        assert!(!has_duplicate_targets(&nfa));
        // Some state forks into two targets on 'a'.
        let atom_a = nfa
            .alphabet
            .iter()
            .position(|atom| atom.contains(u32::from('a')))
            .unwrap() as u32;
        assert!(nfa
            .delta
            .iter()
            .any(|(&(_, atom), targets)| atom == atom_a && targets.len() == 2));
    }

    #[test]
    fn alphabet_is_partitioned() {
        let nfa = ordered("^(a|[ab]|.)+$");
        for (x, y) in nfa.alphabet.iter().tuple_combinations() {
            assert!(x.intersect(y).is_none());
        }
        // 'a', 'b' and the rest of the dot are separate atoms.
        assert!(nfa.alphabet.len() >= 3);
    }

    #[test]
    fn closure_acceptance() {
        let nfa = ordered("^a*$");
        // Every state that reaches the exit through epsilons alone accepts.
        let accepting = nfa.accept.iter().filter(|&&a| a).count();
        assert!(accepting >= 2, "start and loop-exit states accept");
    }

    #[test]
    fn epsilon_cycles_saturate() {
        // `()*` is an epsilon cycle; the following 'a' transition must be
        // reachable over two counted paths.
        let nfa = ordered("^(a()*a)*$");
        assert!(has_duplicate_targets(&nfa));
    }
}
