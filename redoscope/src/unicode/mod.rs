/*!
Character-set algebra for transition labels.

Every consuming transition in the analyzed automata is labeled with an
[`IChar`]: a non-empty union of Unicode scalar-value intervals. The
downstream ambiguity analysis requires labels to be *disjoint*, which
[`IChar::partition`] establishes once per automaton instead of pairwise
overlap checks.

Simple case folding and the `\p{...}` property tables are delegated to
`regex-syntax`, the same data the rest of the regex ecosystem uses.
*/

mod ichar;

pub use ichar::IChar;
