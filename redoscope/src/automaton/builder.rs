use tracing::debug;

use crate::config::{Config, MatchMode};
use crate::error::AnalysisError;
use crate::syntax::ast::{self, ClassItem, Node, NodeKind};
use crate::syntax::{Flags, Pattern, Span};
use crate::unicode::IChar;

use super::eps_nfa::{EpsNfa, EpsState, EpsTransition, StateId};

/// Compile a parsed pattern into an epsilon-NFA.
///
/// Under [`MatchMode::Partial`], or [`MatchMode::Auto`] with a pattern that
/// is not anchored at the start, the automaton gets a lazy scan-loop
/// initial state: that is how a backtracking engine retries the pattern at
/// every input position.
pub(crate) fn build_eps_nfa(pattern: &Pattern, config: &Config) -> Result<EpsNfa, AnalysisError> {
    let mut builder = Builder {
        states: Vec::new(),
        max_states: config.max_nfa_size,
        flags: pattern.flags,
    };
    let (entry, exit) = builder.compile(&pattern.node)?;

    let scan_prefix = match config.match_mode {
        MatchMode::Full => false,
        MatchMode::Partial => true,
        MatchMode::Auto => !ast::is_start_anchored(&pattern.node, pattern.flags.multiline),
    };
    let initial = if scan_prefix {
        let scan = builder.add_state(None)?;
        // Lazy: try the pattern at the current position before consuming.
        builder.add_eps(scan, entry);
        builder.add_char(scan, scan, IChar::any());
        scan
    } else {
        entry
    };

    debug!(
        states = builder.states.len(),
        scan_prefix, "built epsilon-NFA"
    );
    Ok(EpsNfa {
        states: builder.states,
        initial,
        accepting: vec![exit],
    })
}

struct Builder {
    states: Vec<EpsState>,
    max_states: usize,
    flags: Flags,
}

impl Builder {
    fn add_state(&mut self, span: Option<Span>) -> Result<StateId, AnalysisError> {
        if self.states.len() >= self.max_states {
            return Err(AnalysisError::NfaTooLarge {
                size: self.states.len() + 1,
                max: self.max_states,
            });
        }
        self.states.push(EpsState {
            transitions: Vec::new(),
            span,
        });
        Ok((self.states.len() - 1) as StateId)
    }

    fn add_eps(&mut self, from: StateId, to: StateId) {
        self.states[from as usize].transitions.push(EpsTransition {
            label: None,
            target: to,
        });
    }

    fn add_char(&mut self, from: StateId, to: StateId, label: IChar) {
        self.states[from as usize].transitions.push(EpsTransition {
            label: Some(label),
            target: to,
        });
    }

    /// Compile `node` to a sub-NFA and return its entry and exit states.
    fn compile(&mut self, node: &Node) -> Result<(StateId, StateId), AnalysisError> {
        let span = Some(node.span);
        match &node.kind {
            // Zero-width constructs are unconditional epsilon transitions.
            // For ambiguity analysis this is conservative: it can surface
            // ambiguity that the assertion would rule out, never hide any.
            NodeKind::Empty
            | NodeKind::StringStart
            | NodeKind::StringEnd
            | NodeKind::WordBoundary
            | NodeKind::NonWordBoundary
            | NodeKind::LookAhead { .. }
            | NodeKind::LookBehind { .. } => self.epsilon_pair(span),

            NodeKind::LineStart | NodeKind::LineEnd => {
                if self.flags.multiline {
                    self.newline_boundary(span)
                } else {
                    self.epsilon_pair(span)
                }
            }

            NodeKind::Char(cp) => {
                let label = self.fold(IChar::single(*cp));
                self.consuming(Some(label), span)
            }
            NodeKind::Dot => self.consuming(Some(IChar::dot(self.flags.dot_all)), span),
            NodeKind::Digit { negated } => {
                self.consuming(predefined(IChar::digit(), *negated), span)
            }
            NodeKind::Word { negated } => self.consuming(predefined(IChar::word(), *negated), span),
            NodeKind::Space { negated } => {
                self.consuming(predefined(IChar::space(), *negated), span)
            }
            NodeKind::UnicodeProperty { name, negated } => {
                let base = IChar::unicode_property(name)
                    .ok_or(AnalysisError::Internal("unknown Unicode property"))?;
                self.consuming(predefined(self.fold(base), *negated), span)
            }
            NodeKind::CharClass { items, negated } => {
                let label = self.class_label(items, *negated)?;
                self.consuming(label, span)
            }

            NodeKind::Sequence(nodes) => {
                let mut chained: Option<(StateId, StateId)> = None;
                for child in nodes {
                    let (entry, exit) = self.compile(child)?;
                    chained = Some(match chained {
                        None => (entry, exit),
                        Some((first, previous)) => {
                            self.add_eps(previous, entry);
                            (first, exit)
                        }
                    });
                }
                match chained {
                    Some(pair) => Ok(pair),
                    None => self.epsilon_pair(span),
                }
            }

            NodeKind::Disjunction(nodes) => {
                let entry = self.add_state(span)?;
                let exit = self.add_state(span)?;
                for alternative in nodes {
                    let (alt_entry, alt_exit) = self.compile(alternative)?;
                    self.add_eps(entry, alt_entry);
                    self.add_eps(alt_exit, exit);
                }
                Ok((entry, exit))
            }

            NodeKind::Capture { node, .. }
            | NodeKind::NonCapture(node)
            | NodeKind::NamedCapture { node, .. }
            | NodeKind::AtomicGroup(node) => self.compile(node),

            NodeKind::Star { node, greedy } => self.star(node, *greedy, span),
            NodeKind::Plus { node, greedy } => self.plus(node, *greedy, span),
            NodeKind::Question { node, greedy } => self.question(node, *greedy, span),
            NodeKind::BoundedRepeat {
                node,
                min,
                max,
                greedy,
            } => self.bounded(node, *min, *max, *greedy, span),

            NodeKind::Backref(_) | NodeKind::NamedBackref(_) | NodeKind::Conditional { .. } => {
                Err(AnalysisError::BackreferenceUnsupported)
            }
        }
    }

    fn epsilon_pair(&mut self, span: Option<Span>) -> Result<(StateId, StateId), AnalysisError> {
        let entry = self.add_state(span)?;
        let exit = self.add_state(span)?;
        self.add_eps(entry, exit);
        Ok((entry, exit))
    }

    /// A per-line anchor: satisfiable at a string boundary (the epsilon
    /// path) or on a newline boundary, materialized as a consuming
    /// newline edge. The epsilon path keeps every run of the
    /// unconditional-epsilon model, so this only ever adds runs.
    fn newline_boundary(&mut self, span: Option<Span>) -> Result<(StateId, StateId), AnalysisError> {
        let entry = self.add_state(span)?;
        let exit = self.add_state(span)?;
        self.add_eps(entry, exit);
        self.add_char(entry, exit, IChar::single(u32::from('\n')));
        Ok((entry, exit))
    }

    /// A two-state sub-NFA consuming one code point of `label`. A `None`
    /// label (e.g. the empty class `[]`) leaves entry and exit
    /// disconnected: it can never match.
    fn consuming(
        &mut self,
        label: Option<IChar>,
        span: Option<Span>,
    ) -> Result<(StateId, StateId), AnalysisError> {
        let entry = self.add_state(span)?;
        let exit = self.add_state(span)?;
        if let Some(label) = label {
            self.add_char(entry, exit, label);
        }
        Ok((entry, exit))
    }

    fn fold(&self, label: IChar) -> IChar {
        if self.flags.ignore_case {
            label.case_fold()
        } else {
            label
        }
    }

    fn class_label(
        &self,
        items: &[ClassItem],
        negated: bool,
    ) -> Result<Option<IChar>, AnalysisError> {
        let mut intervals: Vec<(u32, u32)> = Vec::new();
        for item in items {
            let part = match item {
                ClassItem::Single(cp) => IChar::new([(*cp, *cp)]),
                ClassItem::Range(lo, hi) => IChar::new([(*lo, *hi)]),
                ClassItem::Digit { negated } => predefined(IChar::digit(), *negated),
                ClassItem::Word { negated } => predefined(IChar::word(), *negated),
                ClassItem::Space { negated } => predefined(IChar::space(), *negated),
                ClassItem::Property { name, negated } => {
                    let base = IChar::unicode_property(name)
                        .ok_or(AnalysisError::Internal("unknown Unicode property"))?;
                    predefined(base, *negated)
                }
            };
            if let Some(part) = part {
                intervals.extend_from_slice(part.intervals());
            }
        }
        let union = IChar::new(intervals).map(|label| self.fold(label));
        Ok(if negated {
            match union {
                Some(label) => label.complement(),
                // `[^]` matches everything.
                None => Some(IChar::any()),
            }
        } else {
            union
        })
    }

    fn star(
        &mut self,
        body: &Node,
        greedy: bool,
        span: Option<Span>,
    ) -> Result<(StateId, StateId), AnalysisError> {
        let entry = self.add_state(span)?;
        let exit = self.add_state(span)?;
        let (body_entry, body_exit) = self.compile(body)?;
        if greedy {
            self.add_eps(entry, body_entry);
            self.add_eps(entry, exit);
            self.add_eps(body_exit, body_entry);
            self.add_eps(body_exit, exit);
        } else {
            self.add_eps(entry, exit);
            self.add_eps(entry, body_entry);
            self.add_eps(body_exit, exit);
            self.add_eps(body_exit, body_entry);
        }
        Ok((entry, exit))
    }

    fn plus(
        &mut self,
        body: &Node,
        greedy: bool,
        span: Option<Span>,
    ) -> Result<(StateId, StateId), AnalysisError> {
        let entry = self.add_state(span)?;
        let exit = self.add_state(span)?;
        let (body_entry, body_exit) = self.compile(body)?;
        self.add_eps(entry, body_entry);
        if greedy {
            self.add_eps(body_exit, body_entry);
            self.add_eps(body_exit, exit);
        } else {
            self.add_eps(body_exit, exit);
            self.add_eps(body_exit, body_entry);
        }
        Ok((entry, exit))
    }

    fn question(
        &mut self,
        body: &Node,
        greedy: bool,
        span: Option<Span>,
    ) -> Result<(StateId, StateId), AnalysisError> {
        let entry = self.add_state(span)?;
        let exit = self.add_state(span)?;
        let (body_entry, body_exit) = self.compile(body)?;
        if greedy {
            self.add_eps(entry, body_entry);
            self.add_eps(entry, exit);
        } else {
            self.add_eps(entry, exit);
            self.add_eps(entry, body_entry);
        }
        self.add_eps(body_exit, exit);
        Ok((entry, exit))
    }

    /// `{min,max}` is unrolled: `min` mandatory copies, then `max - min`
    /// optional ones, or a trailing star when `max` is unbounded.
    fn bounded(
        &mut self,
        body: &Node,
        min: u32,
        max: Option<u32>,
        greedy: bool,
        span: Option<Span>,
    ) -> Result<(StateId, StateId), AnalysisError> {
        let entry = self.add_state(span)?;
        let mut current = entry;
        for _ in 0..min {
            let (body_entry, body_exit) = self.compile(body)?;
            self.add_eps(current, body_entry);
            current = body_exit;
        }
        match max {
            None => {
                let (star_entry, star_exit) = self.star(body, greedy, span)?;
                self.add_eps(current, star_entry);
                current = star_exit;
            }
            Some(max) => {
                for _ in min..max {
                    let (opt_entry, opt_exit) = self.question(body, greedy, span)?;
                    self.add_eps(current, opt_entry);
                    current = opt_exit;
                }
            }
        }
        Ok((entry, current))
    }
}

fn predefined(base: IChar, negated: bool) -> Option<IChar> {
    if negated {
        base.complement()
    } else {
        Some(base)
    }
}
