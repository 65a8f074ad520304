use thiserror::Error;

/// Failure modes of the analysis pipeline.
///
/// None of these escape the public API as panics or `Err` values:
/// [`Analyzer`](crate::Analyzer) maps every variant into a
/// [`Diagnostics`](crate::Diagnostics) verdict using [`AnalysisError::reason`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The pattern contains backreferences or conditionals, which the
    /// automaton construction cannot model.
    #[error("pattern contains backreferences or conditionals")]
    BackreferenceUnsupported,

    /// The epsilon-NFA grew past `max_nfa_size`.
    #[error("epsilon-NFA exceeds the size bound ({size} > {max})")]
    NfaTooLarge { size: usize, max: usize },

    /// The look-ahead DFA, the NFAwLA, or one of the derived pair/triple
    /// graphs grew past its budget.
    #[error("look-ahead construction exceeds the size bound ({size} > {max})")]
    LookAheadTooLarge { size: usize, max: usize },

    /// The configured deadline passed before the analysis finished.
    #[error("analysis deadline exceeded")]
    Timeout,

    /// The caller-supplied cancellation flag was raised.
    #[error("analysis cancelled")]
    Cancelled,

    /// A vulnerability was detected but no witness path could be
    /// reconstructed. The verdict degrades to unknown instead of reporting
    /// a synthetic attack.
    #[error("witness extraction failed after a positive detection")]
    WitnessUnavailable,

    /// A precondition was violated, e.g. a malformed AST reached the
    /// builder.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl AnalysisError {
    /// The machine-readable reason string surfaced in
    /// [`Diagnostics`](crate::Diagnostics).
    pub fn reason(&self) -> &'static str {
        match self {
            AnalysisError::BackreferenceUnsupported => "backreference_unsupported",
            AnalysisError::NfaTooLarge { .. } => "nfa_too_large",
            AnalysisError::LookAheadTooLarge { .. } => "look_ahead_too_large",
            AnalysisError::Timeout => "timeout",
            AnalysisError::Cancelled => "cancelled",
            AnalysisError::WitnessUnavailable => "witness_unavailable",
            AnalysisError::Internal(_) => "internal_error",
        }
    }

    /// Whether this error maps to [`Status::Error`](crate::Status::Error)
    /// rather than [`Status::Unknown`](crate::Status::Unknown).
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalysisError::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_stable() {
        assert_eq!(
            AnalysisError::BackreferenceUnsupported.reason(),
            "backreference_unsupported"
        );
        assert_eq!(
            AnalysisError::NfaTooLarge { size: 7, max: 5 }.reason(),
            "nfa_too_large"
        );
        assert_eq!(AnalysisError::Timeout.reason(), "timeout");
        assert_eq!(AnalysisError::Cancelled.reason(), "cancelled");
    }

    #[test]
    fn only_internal_is_fatal() {
        assert!(AnalysisError::Internal("bad ast").is_fatal());
        assert!(!AnalysisError::Timeout.is_fatal());
        assert!(!AnalysisError::LookAheadTooLarge { size: 1, max: 0 }.is_fatal());
    }
}
