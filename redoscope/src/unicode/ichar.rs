use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;
use regex_syntax::hir::{Class, ClassUnicode, ClassUnicodeRange, HirKind};

/// The valid Unicode scalar values: everything except the surrogate gap.
const SCALAR_RANGES: [(u32, u32); 2] = [(0x0000, 0xD7FF), (0xE000, 0x10FFFF)];

/// A non-empty union of Unicode scalar-value intervals.
///
/// Intervals are inclusive, sorted, pairwise disjoint and non-adjacent.
/// The normalized interval list doubles as a stable key, so equality,
/// ordering and hashing all derive from it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IChar {
    intervals: Vec<(u32, u32)>,
}

impl IChar {
    /// Normalize `intervals` into an `IChar`, or `None` if they are empty.
    /// Parts outside the scalar alphabet (the surrogate gap, anything past
    /// U+10FFFF) are dropped.
    pub fn new(intervals: impl IntoIterator<Item = (u32, u32)>) -> Option<IChar> {
        let mut intervals: Vec<(u32, u32)> = intervals
            .into_iter()
            .flat_map(|(lo, hi)| {
                SCALAR_RANGES
                    .iter()
                    .filter_map(move |&(slo, shi)| {
                        let lo = lo.max(slo);
                        let hi = hi.min(shi);
                        (lo <= hi).then_some((lo, hi))
                    })
            })
            .collect();
        intervals.sort_unstable();

        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(intervals.len());
        for (lo, hi) in intervals {
            match merged.last_mut() {
                Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }

        if merged.is_empty() {
            None
        } else {
            Some(IChar { intervals: merged })
        }
    }

    /// A single scalar value.
    pub fn single(cp: u32) -> IChar {
        IChar {
            intervals: vec![(cp, cp)],
        }
    }

    /// An inclusive range. `lo <= hi` is the caller's responsibility.
    pub fn range(lo: u32, hi: u32) -> IChar {
        debug_assert!(lo <= hi);
        IChar {
            intervals: vec![(lo, hi)],
        }
    }

    /// Every Unicode scalar value.
    pub fn any() -> IChar {
        IChar {
            intervals: SCALAR_RANGES.to_vec(),
        }
    }

    /// What `.` matches: everything under `dot_all`, everything but `\n`
    /// otherwise.
    pub fn dot(dot_all: bool) -> IChar {
        if dot_all {
            IChar::any()
        } else {
            IChar::single(u32::from('\n'))
                .complement()
                .expect("the alphabet is larger than one code point")
        }
    }

    /// `\d`: ASCII digits.
    pub fn digit() -> IChar {
        IChar::range(0x30, 0x39)
    }

    /// `\w`: ASCII word characters.
    pub fn word() -> IChar {
        IChar::new([(0x30, 0x39), (0x41, 0x5A), (0x5F, 0x5F), (0x61, 0x7A)])
            .expect("word class is non-empty")
    }

    /// `\s`: ASCII whitespace.
    pub fn space() -> IChar {
        IChar::new([(0x09, 0x0D), (0x20, 0x20)]).expect("space class is non-empty")
    }

    /// Resolve `\p{name}` against the `regex-syntax` Unicode tables.
    /// Returns `None` for unknown property names.
    pub fn unicode_property(name: &str) -> Option<IChar> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '-' | '='));
        if !valid {
            return None;
        }
        let hir = regex_syntax::ParserBuilder::new()
            .build()
            .parse(&format!(r"\p{{{name}}}"))
            .ok()?;
        match hir.kind() {
            HirKind::Class(Class::Unicode(class)) => IChar::new(
                class
                    .ranges()
                    .iter()
                    .map(|r| (u32::from(r.start()), u32::from(r.end()))),
            ),
            _ => None,
        }
    }

    pub fn intervals(&self) -> &[(u32, u32)] {
        &self.intervals
    }

    /// Membership test.
    pub fn contains(&self, cp: u32) -> bool {
        let i = self.intervals.partition_point(|&(lo, _)| lo <= cp);
        i > 0 && cp <= self.intervals[i - 1].1
    }

    /// The least code point, used for witness materialization.
    pub fn sample(&self) -> u32 {
        self.intervals[0].0
    }

    /// Set intersection, `None` when disjoint.
    pub fn intersect(&self, other: &IChar) -> Option<IChar> {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let (alo, ahi) = self.intervals[i];
            let (blo, bhi) = other.intervals[j];
            let lo = alo.max(blo);
            let hi = ahi.min(bhi);
            if lo <= hi {
                out.push((lo, hi));
            }
            if ahi < bhi {
                i += 1;
            } else {
                j += 1;
            }
        }
        IChar::new(out)
    }

    /// Set complement within the scalar alphabet, `None` when `self` covers
    /// everything.
    pub fn complement(&self) -> Option<IChar> {
        let mut out = Vec::new();
        for &(slo, shi) in &SCALAR_RANGES {
            let mut next = slo;
            for &(lo, hi) in &self.intervals {
                if hi < slo || lo > shi {
                    continue;
                }
                if lo.max(slo) > next {
                    out.push((next, lo - 1));
                }
                next = next.max(hi.saturating_add(1));
            }
            if next <= shi {
                out.push((next, shi));
            }
        }
        IChar::new(out)
    }

    /// Apply Unicode simple case folding, so that e.g. `a` and `A` end up
    /// in the same label under `ignore_case`.
    pub fn case_fold(&self) -> IChar {
        let mut class = ClassUnicode::new(self.intervals.iter().filter_map(|&(lo, hi)| {
            Some(ClassUnicodeRange::new(
                char::from_u32(lo)?,
                char::from_u32(hi)?,
            ))
        }));
        class.case_fold_simple();
        IChar::new(
            class
                .ranges()
                .iter()
                .map(|r| (u32::from(r.start()), u32::from(r.end()))),
        )
        .unwrap_or_else(|| self.clone())
    }

    /// The Boolean partition of `labels`: pairwise-disjoint atoms, ordered
    /// by least code point, such that every input label is a union of
    /// atoms. Endpoint sweep, `O(N log N)` in the total interval count.
    pub fn partition(labels: &[IChar]) -> Vec<IChar> {
        let mut boundaries = BTreeSet::new();
        for label in labels {
            for &(lo, hi) in &label.intervals {
                boundaries.insert(lo);
                boundaries.insert(hi.saturating_add(1));
            }
        }

        let mut atoms = Vec::new();
        for (&lo, &next) in boundaries.iter().tuple_windows() {
            if labels.iter().any(|label| label.contains(lo)) {
                atoms.push(IChar::range(lo, next - 1));
            }
        }
        atoms
    }
}

impl fmt::Display for IChar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |cp: u32| match char::from_u32(cp) {
            Some(c) if !c.is_control() && !c.is_whitespace() => c.escape_debug().to_string(),
            _ => format!("\\u{{{cp:x}}}"),
        };
        write!(f, "[")?;
        for &(lo, hi) in &self.intervals {
            if lo == hi {
                write!(f, "{}", render(lo))?;
            } else {
                write!(f, "{}-{}", render(lo), render(hi))?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ichar(intervals: &[(u32, u32)]) -> IChar {
        IChar::new(intervals.iter().copied()).unwrap()
    }

    #[test]
    fn normalization_merges_and_sorts() {
        let a = ichar(&[(0x61, 0x66), (0x41, 0x46), (0x67, 0x6A)]);
        assert_eq!(a.intervals(), &[(0x41, 0x46), (0x61, 0x6A)]);
        assert!(IChar::new(std::iter::empty()).is_none());
    }

    #[test]
    fn membership_and_sample() {
        let a = ichar(&[(0x61, 0x7A)]);
        assert!(a.contains(u32::from('a')));
        assert!(a.contains(u32::from('z')));
        assert!(!a.contains(u32::from('A')));
        assert_eq!(a.sample(), u32::from('a'));
    }

    #[test]
    fn intersection() {
        let a = ichar(&[(0x41, 0x5A), (0x61, 0x7A)]);
        let b = ichar(&[(0x50, 0x6F)]);
        let i = a.intersect(&b).unwrap();
        assert_eq!(i.intervals(), &[(0x50, 0x5A), (0x61, 0x6F)]);

        let c = ichar(&[(0x30, 0x39)]);
        assert!(a.intersect(&c).is_none());
    }

    #[test]
    fn complement_round_trips() {
        let a = IChar::word();
        let c = a.complement().unwrap();
        assert!(!c.contains(u32::from('a')));
        assert!(c.contains(u32::from('!')));
        assert_eq!(c.complement().unwrap(), a);
        assert!(IChar::any().complement().is_none());
    }

    #[test]
    fn dot_excludes_newline() {
        assert!(!IChar::dot(false).contains(u32::from('\n')));
        assert!(IChar::dot(false).contains(u32::from('x')));
        assert!(IChar::dot(true).contains(u32::from('\n')));
    }

    #[test]
    fn case_folding() {
        let a = IChar::single(u32::from('a')).case_fold();
        assert!(a.contains(u32::from('a')));
        assert!(a.contains(u32::from('A')));

        let sigma = IChar::single(u32::from('σ')).case_fold();
        assert!(sigma.contains(u32::from('Σ')));
        assert!(sigma.contains(u32::from('ς')));
    }

    #[test]
    fn partition_splits_overlaps() {
        let a = IChar::single(u32::from('a'));
        let dot = IChar::dot(false);
        let atoms = IChar::partition(&[a.clone(), dot.clone()]);

        // Disjoint atoms covering both labels.
        for (x, y) in atoms.iter().tuple_combinations() {
            assert!(x.intersect(y).is_none(), "{x} and {y} overlap");
        }
        // 'a' is exactly one atom; the dot is a union of atoms.
        assert!(atoms.contains(&a));
        for atom in &atoms {
            let in_dot = dot.contains(atom.sample());
            assert_eq!(in_dot, dot.intersect(atom).as_ref() == Some(atom));
        }
    }

    #[test]
    fn unicode_property_lookup() {
        let greek = IChar::unicode_property("Greek").unwrap();
        assert!(greek.contains(u32::from('λ')));
        assert!(!greek.contains(u32::from('a')));
        assert!(IChar::unicode_property("NoSuchProperty").is_none());
        assert!(IChar::unicode_property("").is_none());
    }
}
