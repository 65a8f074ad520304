/*!
Pattern front end: the AST contract consumed by the automaton pipeline,
and a recursive-descent parser producing it.

The parser is hand-written because the analyzer's AST has to represent
constructs the ecosystem parsers reject outright (backreferences,
lookaround, conditionals): the analyzer's job is to *classify* them, not
to refuse them at the syntax level. Unicode property names are still
validated eagerly against the `regex-syntax` tables.

Inline flag groups (`(?i)`, `(?s:...)`) are not supported; flags are an
out-of-band input, see [`Flags`].
*/

pub mod ast;
mod parser;

pub use ast::{ClassItem, Node, NodeKind, Span};
pub use parser::ParseError;

/// The pattern flags the analysis is sensitive to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    /// Case-insensitive matching; transition labels are case folded.
    pub ignore_case: bool,
    /// `^`/`$` match at line boundaries rather than string boundaries:
    /// the compiled anchors gain a newline-boundary transition, and they
    /// stop counting as input-pinning anchors for the exploitability
    /// analysis. `\A`/`\z` are unaffected.
    pub multiline: bool,
    /// `.` also matches `\n`.
    pub dot_all: bool,
}

impl Flags {
    pub fn ignore_case() -> Flags {
        Flags {
            ignore_case: true,
            ..Flags::default()
        }
    }

    pub fn multiline() -> Flags {
        Flags {
            multiline: true,
            ..Flags::default()
        }
    }

    pub fn dot_all() -> Flags {
        Flags {
            dot_all: true,
            ..Flags::default()
        }
    }
}

/// A parsed pattern: source text, flags and the AST root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub source: String,
    pub flags: Flags,
    pub node: Node,
}

impl Pattern {
    /// Parse `source` under `flags`.
    pub fn parse(source: &str, flags: Flags) -> Result<Pattern, ParseError> {
        Ok(Pattern {
            source: source.to_owned(),
            flags,
            node: parser::parse(source)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_keeps_source_and_flags() {
        let pattern = Pattern::parse("a|b", Flags::ignore_case()).unwrap();
        assert_eq!(pattern.source, "a|b");
        assert!(pattern.flags.ignore_case);
        assert!(matches!(pattern.node.kind, NodeKind::Disjunction(_)));
    }

    #[test]
    fn parse_errors_propagate() {
        assert!(Pattern::parse("(a", Flags::default()).is_err());
    }
}
