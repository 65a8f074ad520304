/*!
A static ReDoS analyzer: classify the worst-case backtracking complexity
of a regular expression as safe (constant or linear), polynomial of degree
`k >= 2`, or exponential, and synthesize a concrete attack input when the
pattern is vulnerable.

## How it works

The analysis is automaton-theoretic, no input is ever executed:

1. the pattern is parsed into an AST;
2. the AST is compiled into an epsilon-NFA whose priority-ordered
   transitions model backtracking order (greedy loops before exits, lazy
   the other way around);
3. epsilon transitions are eliminated into an *ordered NFA* whose
   transition lists may contain duplicates; a duplicate records two
   distinct epsilon histories reaching the same configuration, the
   structural signature of ambiguity;
4. the ordered NFA is paired with the determinized reversal of itself (a
   *look-ahead* automaton), which prunes every transition that cannot be
   part of an accepting run; that precision is what keeps `^a+$` safe
   while `^(a+)+$` is flagged;
5. strongly connected components of the product are analyzed for
   exponential ambiguity (duplicated targets inside a cycle, or pair-graph
   reconvergence as in `^(a|b|ab)*$`) and polynomial ambiguity (chains of
   divergent cycles, as in `^.*a.*a$`);
6. a witness is extracted and materialized as `prefix · pump^n · suffix`.

## Usage

```
use redoscope::{Analyzer, Complexity, Flags, Status};

let analyzer = Analyzer::default();

let safe = analyzer.analyze(r"^[a-z]+$", Flags::default());
assert_eq!(safe.status, Status::Safe);

let vulnerable = analyzer.analyze(r"^(a+)+$", Flags::default());
assert_eq!(vulnerable.status, Status::Vulnerable);
assert_eq!(vulnerable.complexity, Some(Complexity::Exponential));

let attack = vulnerable.attack.unwrap();
let input = attack.build(64);
assert!(input.starts_with('a') && input.ends_with('!'));
```

Patterns the automaton construction cannot model (backreferences,
conditionals) and analyses that exceed a size or time budget yield
`Status::Unknown` with a machine-readable reason, never a guess:

```
use redoscope::{Analyzer, Flags, Status};

let diagnostics = Analyzer::default().analyze(r"^((?:a|b)*)\1$", Flags::default());
assert_eq!(diagnostics.status, Status::Unknown);
assert_eq!(diagnostics.reason.as_deref(), Some("backreference_unsupported"));
```

## Caveats

Zero-width assertions (anchors, word boundaries, lookaround) are treated
as unconditional epsilon transitions. That is conservative: it can flag a
pattern whose assertions actually rule the ambiguity out, but it never
hides a real one. Unanchored patterns whose matches can always bail early
(e.g. `(a*)*` with nothing required after it) are reported safe, because
no input forces a backtracking engine through the pumped branches.

Under [`Flags::multiline`](syntax::Flags) the `^`/`$` anchors become
per-line: they gain a newline-boundary transition in the compiled
automaton, and they stop counting as input-pinning anchors for the
bail-early analysis above; `\A`/`\z` keep their force.
*/

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod syntax;
pub mod unicode;

mod analyzer;
mod automaton;
mod context;

pub use analyzer::Analyzer;
pub use config::{Config, MatchMode};
pub use diagnostics::{AttackString, Complexity, Diagnostics, Hotspot, Status};
pub use error::AnalysisError;
pub use syntax::{Flags, ParseError, Pattern};
pub use unicode::IChar;

/// Analyze `source` under `flags` with the default configuration.
pub fn analyze(source: &str, flags: Flags) -> Diagnostics {
    Analyzer::default().analyze(source, flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(source: &str) -> Diagnostics {
        analyze(source, Flags::default())
    }

    #[test]
    fn safe_patterns() {
        for source in [
            r"^$",
            r"^foo$",
            r"^a+$",
            r"^[a-z]+$",
            r"^(a|b)+$",
            r"^\d{4}-\d{2}-\d{2}$",
            r"^((fi|bu)z{2}){1,2}$",
            r"^(\w|\W)*$",
        ] {
            let diagnostics = verdict(source);
            assert_eq!(
                diagnostics.status,
                Status::Safe,
                "{source} should be safe, got {diagnostics}"
            );
            assert!(diagnostics.attack.is_none());
        }
    }

    #[test]
    fn simple_quantifier_family_is_safe() {
        for source in [r"^x+$", r"^x*$", r"^x?$", r"^x{2,5}$", r"^[0-9]{1,8}$", r"^abc*$"] {
            assert_eq!(verdict(source).status, Status::Safe, "{source}");
        }
    }

    #[test]
    fn exponential_patterns() {
        for source in [
            r"^(a|a)*$",
            r"^(a+)+$",
            r"^((a)*)*$",
            r"^(a|b|ab)*$",
            r"^(aa|b|aab)*$",
        ] {
            let diagnostics = verdict(source);
            assert_eq!(
                diagnostics.status,
                Status::Vulnerable,
                "{source} should be vulnerable, got {diagnostics}"
            );
            assert_eq!(
                diagnostics.complexity,
                Some(Complexity::Exponential),
                "{source}"
            );
            let attack = diagnostics.attack.expect("vulnerable verdicts carry an attack");
            assert!(!attack.pump.is_empty(), "{source}");
        }
    }

    #[test]
    fn polynomial_patterns() {
        // Degree 2: a single divergence link, pumping the connecting 'a'.
        // The dot labels cover everything but the newline, so the newline
        // is the one code point every transition rejects.
        let diagnostics = verdict(r"^.*a.*a$");
        assert_eq!(diagnostics.status, Status::Vulnerable);
        assert_eq!(diagnostics.complexity, Some(Complexity::Polynomial(2)));
        let attack = diagnostics.attack.expect("polynomial verdicts carry an attack");
        assert_eq!(attack.pump, vec![u32::from('a')]);
        assert_eq!(attack.suffix, vec![u32::from('\n')]);

        // Degree 3: two chain links, whose pump words concatenate.
        let diagnostics = verdict(r"^.*a.*a.*a$");
        assert_eq!(diagnostics.status, Status::Vulnerable);
        assert_eq!(diagnostics.complexity, Some(Complexity::Polynomial(3)));
        let attack = diagnostics.attack.expect("polynomial verdicts carry an attack");
        assert_eq!(attack.pump, vec![u32::from('a'), u32::from('a')]);
        assert_eq!(attack.suffix, vec![u32::from('\n')]);

        // Pumping actually grows the input, one pump word per repetition.
        let short = attack.build(8);
        let long = attack.build(20);
        assert_eq!(long.len(), short.len() + 12 * attack.pump.len());
        assert!(long.ends_with('\n'));
        assert!(long.contains(&"a".repeat(2 * 20)));
    }

    #[test]
    fn ignore_case_overlap_is_exponential() {
        let diagnostics = analyze(r"^(a|B|Ab)*$", Flags::ignore_case());
        assert_eq!(diagnostics.status, Status::Vulnerable);
        assert_eq!(diagnostics.complexity, Some(Complexity::Exponential));
    }

    #[test]
    fn backreferences_are_unknown() {
        let diagnostics = verdict(r"^((?:a|b)*)\1$");
        assert_eq!(diagnostics.status, Status::Unknown);
        assert_eq!(
            diagnostics.reason.as_deref(),
            Some("backreference_unsupported")
        );
        assert!(diagnostics.attack.is_none());
        assert!(diagnostics.complexity.is_none());
    }

    #[test]
    fn borderline_patterns_stay_within_their_acceptance_sets() {
        // Conservative either way: safe or exponential, never polynomial,
        // never an error.
        for source in [r"(a*)*", r"^(a()*a)*$", r"^([a:]|\b)*$", r"^(?:.|.)*$"] {
            let diagnostics = verdict(source);
            assert!(
                matches!(diagnostics.status, Status::Safe | Status::Vulnerable),
                "{source} gave {diagnostics}"
            );
            if diagnostics.status == Status::Vulnerable {
                assert_eq!(
                    diagnostics.complexity,
                    Some(Complexity::Exponential),
                    "{source}"
                );
            }
        }
        // The unanchored nested star can always bail early.
        assert_eq!(verdict(r"(a*)*").status, Status::Safe);
    }

    #[test]
    fn attack_strings_are_materializable() {
        let diagnostics = verdict(r"^(a+)+$");
        let attack = diagnostics.attack.unwrap();
        assert_eq!(attack.repeat_count, 1_000);
        let input = attack.build(8);
        assert!(input.contains("aaaaaaaa"));
        assert!(input.ends_with('!'));
    }

    #[test]
    fn hotspot_is_within_the_source() {
        let source = r"^(a+)+$";
        let diagnostics = verdict(source);
        let hotspot = diagnostics.hotspot.expect("hotspot for a vulnerable verdict");
        assert!(hotspot.start < hotspot.end);
        assert!(hotspot.end <= source.len());
    }

    #[test]
    fn verdicts_are_deterministic() {
        for source in [r"^(a+)+$", r"^(a|b|ab)*$", r"^.*a.*a$", r"^(a|b)+$"] {
            assert_eq!(verdict(source), verdict(source), "{source}");
        }
    }

    #[test]
    fn parse_failures_are_errors() {
        let diagnostics = verdict("(a");
        assert_eq!(diagnostics.status, Status::Error);
        assert!(diagnostics.reason.is_some());
    }

    #[test]
    fn nfa_size_cap_yields_unknown() {
        let analyzer = Analyzer::builder()
            .config(Config::builder().max_nfa_size(4).build())
            .build();
        let diagnostics = analyzer.analyze(r"^abcdefgh$", Flags::default());
        assert_eq!(diagnostics.status, Status::Unknown);
        assert_eq!(diagnostics.reason.as_deref(), Some("nfa_too_large"));
    }

    #[test]
    fn cancellation_yields_unknown() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let cancel = Arc::new(AtomicBool::new(false));
        cancel.store(true, Ordering::Relaxed);
        let analyzer = Analyzer::builder().cancel(cancel).build();
        let diagnostics = analyzer.analyze(r"^(a+)+$", Flags::default());
        assert_eq!(diagnostics.status, Status::Unknown);
        assert_eq!(diagnostics.reason.as_deref(), Some("cancelled"));
    }

    #[test]
    fn multiline_relaxes_line_anchors() {
        // Per-line anchors no longer pin the input ends, so every match
        // can bail early and the ambiguity is reported safe.
        let diagnostics = analyze(r"^(a+)+$", Flags::multiline());
        assert_eq!(diagnostics.status, Status::Safe);

        // String anchors keep their force under multiline.
        let diagnostics = analyze(r"\A(a+)+\z", Flags::multiline());
        assert_eq!(diagnostics.status, Status::Vulnerable);
        assert_eq!(diagnostics.complexity, Some(Complexity::Exponential));
        let attack = diagnostics.attack.unwrap();
        assert!(attack.pump.iter().all(|&cp| cp == u32::from('a')));
    }

    #[test]
    fn dotall_widens_the_dot() {
        let plain = analyze(r"^.+$", Flags::default());
        let dotall = analyze(r"^.+$", Flags::dot_all());
        assert_eq!(plain.status, Status::Safe);
        assert_eq!(dotall.status, Status::Safe);
    }

    #[test]
    fn classic_redos_patterns_are_caught() {
        for source in [r"^(a+)+b$", r"^([a-zA-Z0-9]+)*$", r"^([^@]+)+@$"] {
            let diagnostics = verdict(source);
            assert_eq!(
                diagnostics.status,
                Status::Vulnerable,
                "{source} gave {diagnostics}"
            );
        }
    }
}
