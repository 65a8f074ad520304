use std::collections::{HashMap, HashSet, VecDeque};

use itertools::Itertools;
use tracing::{debug, trace};

use crate::context::AnalysisContext;
use crate::error::AnalysisError;

use super::product::{NfaWithLookAhead, WlaTransition};
use super::scc::{strongly_connected_components, Sccs};

/// A transition label of the product automaton: `(atom, look)`.
pub(crate) type Label = (u32, u32);

/// A positive ambiguity detection.
#[derive(Debug)]
pub(crate) enum Detection {
    /// EDA: a pumpable state with two distinct runs over the same word.
    Exponential(EdaSeed),
    /// IDA: a chain of `degree` pairwise-divergent cycles.
    Polynomial { degree: u32, chain: Vec<ChainLink> },
}

#[derive(Debug)]
pub(crate) struct EdaSeed {
    /// Product state the ambiguity is anchored at.
    pub state: u32,
    /// Labels of the pump word.
    pub pump: Vec<Label>,
}

#[derive(Debug)]
pub(crate) struct ChainLink {
    /// The looping state in the earlier component of the divergence.
    pub state: u32,
    /// Labels of the word that loops on both components and diverges
    /// between them.
    pub pump: Vec<Label>,
}

struct Budget {
    remaining: usize,
    max: usize,
}

impl Budget {
    fn new(max: usize) -> Budget {
        Budget {
            remaining: max,
            max,
        }
    }

    fn spend(&mut self, amount: usize) -> Result<(), AnalysisError> {
        if self.remaining < amount {
            return Err(AnalysisError::LookAheadTooLarge {
                size: self.max + amount,
                max: self.max,
            });
        }
        self.remaining -= amount;
        Ok(())
    }
}

/// Run EDA then IDA detection over the product automaton.
///
/// EDA is decided first: it subsumes any polynomial verdict. Two EDA
/// conditions are checked, in order of cost:
///
/// 1. a state inside a cycle with a duplicated `(label, target)` entry:
///    two distinct epsilon histories reach the same configuration;
/// 2. a pair-graph component containing both a diagonal and an
///    off-diagonal vertex: two distinct state trajectories over one
///    pumped word, as in `(a|b|ab)*`, which produces no duplicates.
///
/// IDA looks for the longest chain of non-atom components where one word
/// loops on both sides of each link and diverges between them.
pub(crate) fn detect(
    wla: &NfaWithLookAhead,
    ctx: &AnalysisContext,
    max_graph_size: usize,
) -> Result<Option<Detection>, AnalysisError> {
    let adjacency = wla.adjacency();
    let sccs = strongly_connected_components(&adjacency);
    debug!(states = wla.len(), comps = sccs.comps.len(), "computed SCCs");

    let non_atom: Vec<bool> = (0..sccs.comps.len() as u32)
        .map(|comp| !sccs.is_atom(comp, &adjacency))
        .collect();

    // EDA, condition 1: duplicate targets out of a cycling state.
    for state in 0..wla.len() as u32 {
        if !non_atom[sccs.comp_of[state as usize] as usize] {
            continue;
        }
        for transition in &wla.transitions[state as usize] {
            if let Some(&target) = find_duplicate(&transition.targets) {
                trace!(state, target, "duplicate target in a cycle");
                return Ok(Some(Detection::Exponential(EdaSeed {
                    state,
                    pump: vec![(transition.atom, transition.look)],
                })));
            }
        }
    }

    let mut budget = Budget::new(max_graph_size);

    // EDA, condition 2: pair-graph reconvergence inside one component.
    for comp in 0..sccs.comps.len() as u32 {
        if !non_atom[comp as usize] {
            continue;
        }
        ctx.checkpoint()?;
        if let Some(seed) = pair_graph_eda(wla, &sccs, comp, &mut budget)? {
            return Ok(Some(Detection::Exponential(seed)));
        }
    }

    // IDA over the condensation.
    ida(wla, &adjacency, &sccs, &non_atom, ctx, &mut budget)
}

fn find_duplicate(targets: &[u32]) -> Option<&u32> {
    targets
        .iter()
        .sorted()
        .tuple_windows()
        .find(|(a, b)| a == b)
        .map(|(a, _)| a)
}

/// Transitions shared by two states, joined on the full `(atom, look)`
/// label. Both rows are ordered by label, so this is a merge join.
fn join_labels<'a>(
    a: &'a [WlaTransition],
    b: &'a [WlaTransition],
) -> Vec<(&'a WlaTransition, &'a WlaTransition)> {
    let mut joined = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let ka = (a[i].atom, a[i].look);
        let kb = (b[j].atom, b[j].look);
        match ka.cmp(&kb) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                joined.push((&a[i], &b[j]));
                i += 1;
                j += 1;
            }
        }
    }
    joined
}

fn distinct_targets(transition: &WlaTransition) -> Vec<u32> {
    let mut targets = transition.targets.clone();
    targets.sort_unstable();
    targets.dedup();
    targets
}

/// EDA condition 2 for one component: build the pair graph over `comp`'s
/// states, reachable from the diagonal, and look for a pair-graph SCC
/// containing a diagonal and an off-diagonal vertex. The returned pump is
/// the label word of a diagonal-to-diagonal cycle through the
/// off-diagonal vertex.
fn pair_graph_eda(
    wla: &NfaWithLookAhead,
    sccs: &Sccs,
    comp: u32,
    budget: &mut Budget,
) -> Result<Option<EdaSeed>, AnalysisError> {
    let members = &sccs.comps[comp as usize];
    let in_comp =
        |state: u32| -> bool { sccs.comp_of[state as usize] == comp };

    let mut ids: HashMap<(u32, u32), u32> = HashMap::new();
    let mut vertices: Vec<(u32, u32)> = Vec::new();
    let mut edges: Vec<Vec<(Label, u32)>> = Vec::new();

    for &v in members {
        ids.insert((v, v), vertices.len() as u32);
        vertices.push((v, v));
    }

    let mut next = 0;
    while next < vertices.len() {
        budget.spend(1)?;
        let (x, y) = vertices[next];
        next += 1;
        let mut outgoing = Vec::new();
        for (tx, ty) in join_labels(&wla.transitions[x as usize], &wla.transitions[y as usize]) {
            let label = (tx.atom, tx.look);
            for &x2 in &distinct_targets(tx) {
                if !in_comp(x2) {
                    continue;
                }
                for &y2 in &distinct_targets(ty) {
                    if !in_comp(y2) {
                        continue;
                    }
                    let id = *ids.entry((x2, y2)).or_insert_with(|| {
                        vertices.push((x2, y2));
                        (vertices.len() - 1) as u32
                    });
                    outgoing.push((label, id));
                }
            }
        }
        edges.push(outgoing);
    }

    let adjacency: Vec<Vec<u32>> = edges
        .iter()
        .map(|outgoing| outgoing.iter().map(|&(_, to)| to).collect())
        .collect();
    let pair_sccs = strongly_connected_components(&adjacency);

    for pair_comp in pair_sccs.comps.iter() {
        let diagonal = pair_comp
            .iter()
            .find(|&&v| vertices[v as usize].0 == vertices[v as usize].1);
        let off_diagonal = pair_comp
            .iter()
            .any(|&v| vertices[v as usize].0 != vertices[v as usize].1);
        let Some(&diagonal) = diagonal else { continue };
        if !off_diagonal {
            continue;
        }

        // Reconstruct a pump word: diagonal -> some off-diagonal -> back.
        let restrict: HashSet<u32> = pair_comp.iter().copied().collect();
        let is_off = |v: u32| vertices[v as usize].0 != vertices[v as usize].1;
        let out = bfs_path(&edges, diagonal, &is_off, &restrict)
            .ok_or(AnalysisError::Internal("pair cycle lost its divergence"))?;
        let back = bfs_path(&edges, out.target, &|v| v == diagonal, &restrict)
            .ok_or(AnalysisError::Internal("pair cycle lost its way back"))?;
        let pump = out.labels.into_iter().chain(back.labels).collect();
        trace!(comp, "pair-graph reconvergence");
        return Ok(Some(EdaSeed {
            state: vertices[diagonal as usize].0,
            pump,
        }));
    }
    Ok(None)
}

struct PathFound {
    target: u32,
    labels: Vec<Label>,
}

/// Shortest labeled path from `from` to any vertex satisfying `found`,
/// staying inside `restrict`. `from` itself is not a hit: paths have at
/// least one edge, which is what makes the result pumpable.
fn bfs_path(
    edges: &[Vec<(Label, u32)>],
    from: u32,
    found: &dyn Fn(u32) -> bool,
    restrict: &HashSet<u32>,
) -> Option<PathFound> {
    let mut parents: HashMap<u32, (u32, Label)> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    let mut visited = HashSet::from([from]);
    while let Some(v) = queue.pop_front() {
        for &(label, to) in &edges[v as usize] {
            if !restrict.contains(&to) {
                continue;
            }
            if found(to) {
                let mut labels = vec![label];
                let mut cursor = v;
                while cursor != from {
                    let (prev, label) = parents[&cursor];
                    labels.push(label);
                    cursor = prev;
                }
                labels.reverse();
                return Some(PathFound { target: to, labels });
            }
            if visited.insert(to) {
                parents.insert(to, (v, label));
                queue.push_back(to);
            }
        }
    }
    None
}

/// IDA: longest chain of non-atom components with pairwise divergence.
fn ida(
    wla: &NfaWithLookAhead,
    adjacency: &[Vec<u32>],
    sccs: &Sccs,
    non_atom: &[bool],
    ctx: &AnalysisContext,
    budget: &mut Budget,
) -> Result<Option<Detection>, AnalysisError> {
    let comp_count = sccs.comps.len();

    // Condensation reachability. Tarjan numbers components so that every
    // edge goes from a larger component id to a smaller one, so one
    // ascending sweep suffices.
    let mut reach: Vec<HashSet<u32>> = vec![HashSet::new(); comp_count];
    for comp in 0..comp_count {
        let mut successors: HashSet<u32> = HashSet::new();
        for &state in &sccs.comps[comp] {
            for &target in &adjacency[state as usize] {
                let target_comp = sccs.comp_of[target as usize];
                if target_comp != comp as u32 {
                    successors.insert(target_comp);
                }
            }
        }
        let mut all = successors.clone();
        for &succ in &successors {
            all.extend(reach[succ as usize].iter().copied());
        }
        reach[comp] = all;
    }

    // Longest divergent chain, sources first (descending component id so
    // each component's degree is final before it pushes to successors).
    let mut degree: Vec<u32> = non_atom.iter().map(|&n| u32::from(n)).collect();
    let mut parent: Vec<Option<(u32, u32, Vec<Label>)>> = vec![None; comp_count];
    let mut divergence_memo: HashMap<(u32, u32), Option<(u32, Vec<Label>)>> = HashMap::new();

    for comp in (0..comp_count as u32).rev() {
        if !non_atom[comp as usize] {
            continue;
        }
        let downstream: Vec<u32> = reach[comp as usize]
            .iter()
            .copied()
            .filter(|&d| non_atom[d as usize])
            .sorted()
            .collect();
        for d in downstream {
            ctx.checkpoint()?;
            let verdict = match divergence_memo.get(&(comp, d)) {
                Some(known) => known.clone(),
                None => {
                    let computed = divergent(wla, sccs, comp, d, budget)?;
                    divergence_memo.insert((comp, d), computed.clone());
                    computed
                }
            };
            if let Some((state, labels)) = verdict {
                if degree[comp as usize] + 1 > degree[d as usize] {
                    degree[d as usize] = degree[comp as usize] + 1;
                    parent[d as usize] = Some((comp, state, labels));
                }
            }
        }
    }

    let Some((last, &max_degree)) = degree
        .iter()
        .enumerate()
        .filter(|&(comp, _)| non_atom[comp])
        .max_by_key(|&(comp, &degree)| (degree, std::cmp::Reverse(comp)))
    else {
        return Ok(None);
    };
    if max_degree < 2 {
        return Ok(None);
    }

    let mut chain = Vec::new();
    let mut cursor = last as u32;
    while let Some((pred, state, labels)) = &parent[cursor as usize] {
        chain.push(ChainLink {
            state: *state,
            pump: labels.clone(),
        });
        cursor = *pred;
    }
    chain.reverse();
    debug!(degree = max_degree, links = chain.len(), "divergent chain");
    Ok(Some(Detection::Polynomial {
        degree: max_degree,
        chain,
    }))
}

/// Does one word loop on a state of `c`, move it into `d`, and loop on the
/// `d` side? Tested on the triple graph: a path `(p,p,q) -> (p,q,q)`.
fn divergent(
    wla: &NfaWithLookAhead,
    sccs: &Sccs,
    c: u32,
    d: u32,
    budget: &mut Budget,
) -> Result<Option<(u32, Vec<Label>)>, AnalysisError> {
    for &p in &sccs.comps[c as usize] {
        for &q in &sccs.comps[d as usize] {
            if let Some(labels) = triple_path(wla, p, q, budget)? {
                trace!(p, q, "divergence");
                return Ok(Some((p, labels)));
            }
        }
    }
    Ok(None)
}

/// BFS on triples for a path `(p,p,q) -> (p,q,q)`.
fn triple_path(
    wla: &NfaWithLookAhead,
    p: u32,
    q: u32,
    budget: &mut Budget,
) -> Result<Option<Vec<Label>>, AnalysisError> {
    let start = (p, p, q);
    let target = (p, q, q);
    let mut parents: HashMap<(u32, u32, u32), ((u32, u32, u32), Label)> = HashMap::new();
    let mut visited: HashSet<(u32, u32, u32)> = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(triple) = queue.pop_front() {
        budget.spend(1)?;
        let (x, y, z) = triple;
        for (tx, ty) in join_labels(&wla.transitions[x as usize], &wla.transitions[y as usize]) {
            let Some(tz) = wla.transitions[z as usize]
                .iter()
                .find(|t| (t.atom, t.look) == (tx.atom, tx.look))
            else {
                continue;
            };
            let label = (tx.atom, tx.look);
            for &x2 in &distinct_targets(tx) {
                for &y2 in &distinct_targets(ty) {
                    for &z2 in &distinct_targets(tz) {
                        let next = (x2, y2, z2);
                        if next == target {
                            let mut labels = vec![label];
                            let mut cursor = triple;
                            while cursor != start {
                                let (prev, label) = parents[&cursor];
                                labels.push(label);
                                cursor = prev;
                            }
                            labels.reverse();
                            return Ok(Some(labels));
                        }
                        if visited.insert(next) {
                            parents.insert(next, (triple, label));
                            queue.push_back(next);
                        }
                    }
                }
            }
        }
    }
    Ok(None)
}
