use tracing::debug;

use crate::config::{Config, MatchMode};
use crate::context::AnalysisContext;
use crate::diagnostics::Complexity;
use crate::error::AnalysisError;
use crate::syntax::Span;

use super::ambiguity::{self, Detection};
use super::eps_nfa::EpsNfa;
use super::lookahead::LookAheadDfa;
use super::ordered::OrderedNfa;
use super::product::NfaWithLookAhead;
use super::witness::{self, Witness};

/// AST-derived facts the complexity verdict depends on.
pub(crate) struct PatternProps {
    pub has_end_anchor: bool,
    pub requires_continuation: bool,
}

pub(crate) struct CheckOutcome {
    pub complexity: Complexity,
    pub witness: Option<Witness>,
    pub hotspot: Option<Span>,
}

/// Run the automaton pipeline over a compiled epsilon-NFA.
///
/// Phases: epsilon elimination, look-ahead determinization, product
/// construction, SCCs, EDA, IDA, witness extraction. The context is
/// polled between phases and inside the detector loops.
pub(crate) fn check(
    nfa: &EpsNfa,
    props: &PatternProps,
    config: &Config,
    ctx: &AnalysisContext,
) -> Result<CheckOutcome, AnalysisError> {
    let ordered = OrderedNfa::from_eps_nfa(nfa, config.max_epsilon_path_len);
    ctx.checkpoint()?;
    let dfa = LookAheadDfa::from_ordered(&ordered, config.max_nfa_size)?;
    ctx.checkpoint()?;
    let wla = NfaWithLookAhead::build(&ordered, &dfa, config.max_delta_size)?;
    ctx.checkpoint()?;

    let Some(detection) = ambiguity::detect(&wla, ctx, config.max_delta_size)? else {
        return Ok(safe());
    };

    // An ambiguity is only exploitable when a failing match forces the
    // engine through every pumped branch: the pattern must carry an end
    // anchor or required content after the choice point. Full-match
    // semantics anchor implicitly.
    let exploitable = props.has_end_anchor
        || props.requires_continuation
        || config.match_mode == MatchMode::Full;
    if !exploitable {
        debug!("ambiguity found, but every match can bail early; safe");
        return Ok(safe());
    }

    let complexity = match &detection {
        Detection::Exponential(_) => Complexity::Exponential,
        Detection::Polynomial { degree, .. } => Complexity::Polynomial(*degree),
    };
    let witness =
        witness::build_witness(&wla, &ordered, &detection).ok_or(AnalysisError::WitnessUnavailable)?;
    let (q, _) = wla.pairs[witness.anchor as usize];
    let hotspot = ordered.spans[q as usize];

    debug!(%complexity, "ambiguity confirmed");
    Ok(CheckOutcome {
        complexity,
        witness: Some(witness),
        hotspot,
    })
}

fn safe() -> CheckOutcome {
    CheckOutcome {
        complexity: Complexity::Safe,
        witness: None,
        hotspot: None,
    }
}
