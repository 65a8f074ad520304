use std::time::Duration;

use bon::Builder;

/// How the analyzer models the surrounding match semantics of a pattern.
///
/// A backtracking engine running in partial-match mode retries the pattern
/// at every start position, which behaves like an implicit lazy `.*?`
/// prefix. Whether that prefix exists changes which ambiguities are
/// reachable, so the analysis has to know about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Derive the mode from the pattern: a pattern anchored at the start is
    /// analyzed as written, anything else gets the implicit scan prefix.
    #[default]
    Auto,
    /// The pattern must match the entire input. No scan prefix, and
    /// vulnerable verdicts are reported even without an end anchor.
    Full,
    /// The pattern may match anywhere. The scan prefix is always added.
    Partial,
}

/// Analysis limits and knobs.
///
/// ```
/// use redoscope::Config;
///
/// let config = Config::builder().max_nfa_size(10_000).build();
/// assert_eq!(config.max_nfa_size, 10_000);
/// assert_eq!(config.attack_limit, 1_000);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// Cap on the epsilon-NFA state count.
    #[builder(default = 100_000)]
    pub max_nfa_size: usize,

    /// Cap on NFAwLA transition entries, shared by the pair/triple graphs
    /// derived from it.
    #[builder(default = 100_000)]
    pub max_delta_size: usize,

    /// Bound on the epsilon-path length explored while counting path
    /// multiplicities during epsilon elimination.
    #[builder(default = 20)]
    pub max_epsilon_path_len: usize,

    /// See [`MatchMode`].
    #[builder(default)]
    pub match_mode: MatchMode,

    /// `repeat_count` emitted in attack witnesses.
    #[builder(default = 1_000)]
    pub attack_limit: usize,

    /// Overall deadline. Checked at coarse checkpoints, so the analysis may
    /// overshoot by one pipeline phase.
    pub timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config::builder().build()
    }
}
