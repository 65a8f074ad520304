use std::collections::{HashMap, VecDeque};

use crate::unicode::IChar;

use super::ambiguity::{Detection, Label};
use super::ordered::OrderedNfa;
use super::product::NfaWithLookAhead;

/// A concrete ambiguity witness in code points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Witness {
    pub prefix: Vec<u32>,
    pub pump: Vec<u32>,
    pub suffix: Vec<u32>,
    /// Product state the witness is anchored at, for hotspot mapping.
    pub anchor: u32,
}

/// Materialize a detection into `prefix · pump · suffix` code points.
///
/// - prefix: a shortest character-labeled path from an initial state to
///   the anchor;
/// - pump: the sampled labels of the detected cycle or divergence chain;
/// - suffix: a code point no transition label accepts, so a backtracking
///   engine has to exhaust every pumped branch before rejecting. Falls
///   back to `!` when the alphabet covers everything.
///
/// Returns `None` when the anchor is unreachable; the caller downgrades
/// the verdict rather than inventing an attack.
pub(crate) fn build_witness(
    wla: &NfaWithLookAhead,
    nfa: &OrderedNfa,
    detection: &Detection,
) -> Option<Witness> {
    let (anchor, pump_labels) = match detection {
        Detection::Exponential(seed) => (seed.state, seed.pump.clone()),
        Detection::Polynomial { chain, .. } => {
            let anchor = chain.first()?.state;
            let labels = chain.iter().flat_map(|link| link.pump.iter().copied()).collect();
            (anchor, labels)
        }
    };

    let sample = |labels: &[Label]| -> Vec<u32> {
        labels
            .iter()
            .map(|&(atom, _)| nfa.alphabet[atom as usize].sample())
            .collect()
    };
    let prefix = sample(&shortest_prefix(wla, anchor)?);
    let pump = sample(&pump_labels);
    if pump.is_empty() {
        return None;
    }

    Some(Witness {
        prefix,
        pump,
        suffix: vec![reject_code_point(&nfa.alphabet)],
        anchor,
    })
}

/// BFS over the product transitions from the initial states to `anchor`.
fn shortest_prefix(wla: &NfaWithLookAhead, anchor: u32) -> Option<Vec<Label>> {
    if wla.inits.contains(&anchor) {
        return Some(Vec::new());
    }
    let mut parents: HashMap<u32, (u32, Label)> = HashMap::new();
    let mut queue: VecDeque<u32> = wla.inits.iter().copied().collect();
    let mut visited: Vec<bool> = vec![false; wla.len()];
    for &init in &wla.inits {
        visited[init as usize] = true;
    }
    while let Some(v) = queue.pop_front() {
        for transition in &wla.transitions[v as usize] {
            for &target in &transition.targets {
                if visited[target as usize] {
                    continue;
                }
                visited[target as usize] = true;
                parents.insert(target, (v, (transition.atom, transition.look)));
                if target == anchor {
                    let mut labels = Vec::new();
                    let mut cursor = target;
                    while let Some(&(prev, label)) = parents.get(&cursor) {
                        labels.push(label);
                        cursor = prev;
                    }
                    labels.reverse();
                    return Some(labels);
                }
                queue.push_back(target);
            }
        }
    }
    None
}

/// A code point outside every transition label, preferring printable
/// ASCII. `0x21` (`!`) is the unconditional fallback.
fn reject_code_point(alphabet: &[IChar]) -> u32 {
    let union = IChar::new(
        alphabet
            .iter()
            .flat_map(|atom| atom.intervals().iter().copied()),
    );
    let Some(union) = union else {
        return 0x21;
    };
    match union.complement() {
        Some(rest) => (0x21..0x7F)
            .find(|&cp| rest.contains(cp))
            .unwrap_or_else(|| rest.sample()),
        None => 0x21,
    }
}
