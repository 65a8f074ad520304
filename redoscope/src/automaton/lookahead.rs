use std::collections::{BTreeSet, HashMap};

use crate::error::AnalysisError;

use super::eps_nfa::StateId;
use super::ordered::OrderedNfa;

/// The determinized reversal of an [`OrderedNfa`].
///
/// Each state `p` is a *look-ahead set*: the set of OrderedNfa states from
/// which the rest of the input is accepting. Reading the input forwards,
/// the look-ahead walks this DFA backwards: if the look-ahead after a
/// character `a` is `p'`, the look-ahead before it is `delta[p'][a]`.
///
/// Subsets are content-addressed by their sorted member list; identity
/// comparisons never happen.
#[derive(Debug)]
pub(crate) struct LookAheadDfa {
    /// Sorted member list per look-ahead state.
    pub contents: Vec<Vec<StateId>>,
    /// The look-ahead of the empty suffix: the accepting states.
    pub init: u32,
    /// `delta[p][atom]` steps one character backwards.
    pub delta: Vec<Vec<u32>>,
}

impl LookAheadDfa {
    pub fn from_ordered(nfa: &OrderedNfa, max_size: usize) -> Result<LookAheadDfa, AnalysisError> {
        // Reversal, dropping priorities and duplicate targets.
        let mut reversed: HashMap<(StateId, u32), BTreeSet<StateId>> = HashMap::new();
        for (&(q, atom), targets) in &nfa.delta {
            for &target in targets {
                reversed.entry((target, atom)).or_default().insert(q);
            }
        }

        let init_content: Vec<StateId> = (0..nfa.state_count as StateId)
            .filter(|&q| nfa.accept[q as usize])
            .collect();

        let mut ids: HashMap<Vec<StateId>, u32> = HashMap::new();
        let mut contents: Vec<Vec<StateId>> = Vec::new();
        let mut delta: Vec<Vec<u32>> = Vec::new();

        let mut intern = |content: Vec<StateId>,
                          contents: &mut Vec<Vec<StateId>>|
         -> Result<u32, AnalysisError> {
            if let Some(&id) = ids.get(&content) {
                return Ok(id);
            }
            if contents.len() >= max_size {
                return Err(AnalysisError::LookAheadTooLarge {
                    size: contents.len() + 1,
                    max: max_size,
                });
            }
            let id = contents.len() as u32;
            ids.insert(content.clone(), id);
            contents.push(content);
            Ok(id)
        };

        let init = intern(init_content, &mut contents)?;
        let mut next = 0;
        while next < contents.len() {
            let p = next;
            next += 1;
            let mut row = Vec::with_capacity(nfa.alphabet.len());
            for atom in 0..nfa.alphabet.len() as u32 {
                let mut sources = BTreeSet::new();
                for &q in &contents[p] {
                    if let Some(set) = reversed.get(&(q, atom)) {
                        sources.extend(set);
                    }
                }
                let target = intern(sources.into_iter().collect(), &mut contents)?;
                row.push(target);
            }
            delta.push(row);
        }

        Ok(LookAheadDfa {
            contents,
            init,
            delta,
        })
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// Whether `q` can accept the suffix this look-ahead state stands for.
    pub fn contains(&self, p: u32, q: StateId) -> bool {
        self.contents[p as usize].binary_search(&q).is_ok()
    }
}
