use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use bon::bon;
use tracing::debug;

use crate::automaton::builder::build_eps_nfa;
use crate::automaton::checker::{self, CheckOutcome, PatternProps};
use crate::config::Config;
use crate::context::AnalysisContext;
use crate::diagnostics::{AttackString, Complexity, Diagnostics, Hotspot};
use crate::error::AnalysisError;
use crate::syntax::{ast, Flags, Pattern};

/// The static ReDoS analyzer.
///
/// Holds configuration and an optional cancellation flag; every
/// [`analyze`](Analyzer::analyze) call is independent and produces a fresh
/// [`Diagnostics`].
///
/// ```
/// use redoscope::{Analyzer, Complexity, Flags};
///
/// let analyzer = Analyzer::default();
/// let diagnostics = analyzer.analyze(r"^(a+)+$", Flags::default());
/// assert_eq!(diagnostics.complexity, Some(Complexity::Exponential));
/// ```
pub struct Analyzer {
    config: Config,
    cancel: Option<Arc<AtomicBool>>,
}

#[bon]
impl Analyzer {
    /// Build an analyzer. Both members are optional:
    ///
    /// ```
    /// use std::sync::Arc;
    /// use std::sync::atomic::AtomicBool;
    /// use redoscope::{Analyzer, Config};
    ///
    /// let cancel = Arc::new(AtomicBool::new(false));
    /// let analyzer = Analyzer::builder()
    ///     .config(Config::builder().attack_limit(100).build())
    ///     .cancel(cancel.clone())
    ///     .build();
    /// # let _ = analyzer;
    /// ```
    #[builder]
    pub fn new(
        #[builder(default)] config: Config,
        /// Set to `true` from another thread to abort the analysis at the
        /// next checkpoint with an `Unknown(cancelled)` verdict.
        cancel: Option<Arc<AtomicBool>>,
    ) -> Analyzer {
        Analyzer { config, cancel }
    }
}

impl Default for Analyzer {
    fn default() -> Analyzer {
        Analyzer::builder().build()
    }
}

impl Analyzer {
    /// Parse `source` under `flags` and classify its worst-case
    /// backtracking complexity.
    pub fn analyze(&self, source: &str, flags: Flags) -> Diagnostics {
        match Pattern::parse(source, flags) {
            Ok(pattern) => self.analyze_pattern(&pattern),
            Err(error) => Diagnostics::error(source, error.to_string()),
        }
    }

    /// Classify an already-parsed pattern.
    pub fn analyze_pattern(&self, pattern: &Pattern) -> Diagnostics {
        let source = pattern.source.as_str();
        debug!(source, "analyzing pattern");

        if ast::has_unsupported_refs(&pattern.node) {
            return Diagnostics::unknown(
                source,
                AnalysisError::BackreferenceUnsupported.reason(),
            );
        }

        let ctx = AnalysisContext::new(self.config.timeout, self.cancel.clone());
        match self.run(pattern, &ctx) {
            Ok(outcome) => self.into_diagnostics(source, outcome),
            Err(error) if error.is_fatal() => Diagnostics::error(source, error.to_string()),
            Err(error) => Diagnostics::unknown(source, error.reason()),
        }
    }

    fn run(
        &self,
        pattern: &Pattern,
        ctx: &AnalysisContext,
    ) -> Result<CheckOutcome, AnalysisError> {
        let nfa = build_eps_nfa(pattern, &self.config)?;
        ctx.checkpoint()?;
        let props = PatternProps {
            has_end_anchor: ast::has_end_anchor(&pattern.node, pattern.flags.multiline),
            requires_continuation: ast::requires_continuation(&pattern.node),
        };
        checker::check(&nfa, &props, &self.config, ctx)
    }

    fn into_diagnostics(&self, source: &str, outcome: CheckOutcome) -> Diagnostics {
        match outcome.complexity {
            Complexity::Safe => Diagnostics::safe(source),
            complexity => {
                let Some(witness) = outcome.witness else {
                    return Diagnostics::error(
                        source,
                        AnalysisError::Internal("vulnerable outcome without witness").to_string(),
                    );
                };
                let attack = AttackString {
                    prefix: witness.prefix,
                    pump: witness.pump,
                    suffix: witness.suffix,
                    repeat_count: self.config.attack_limit,
                };
                let hotspot = outcome.hotspot.map(|span| Hotspot {
                    start: span.start,
                    end: span.end,
                });
                Diagnostics::vulnerable(source, complexity, attack, hotspot)
            }
        }
    }
}
