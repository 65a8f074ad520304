use std::fmt;

use itertools::Itertools;

/// Overall outcome of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No super-linear backtracking is possible.
    Safe,
    /// A concrete ambiguity was found and a witness constructed.
    Vulnerable,
    /// The analysis declined to answer (unsupported syntax, size budget,
    /// timeout, cancellation).
    Unknown,
    /// The pattern could not be analyzed at all (parse failure, internal
    /// error).
    Error,
}

/// Worst-case backtracking complexity of an NFA-simulating matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    /// Constant or linear in the input length.
    Safe,
    /// `Θ(n^k)` with `k >= 2`.
    Polynomial(u32),
    /// `Θ(2^n)`.
    Exponential,
}

impl Complexity {
    pub fn is_vulnerable(&self) -> bool {
        !matches!(self, Complexity::Safe)
    }

    /// The polynomial degree, if any.
    pub fn degree(&self) -> Option<u32> {
        match self {
            Complexity::Polynomial(k) => Some(*k),
            _ => None,
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Complexity::Safe => write!(f, "safe"),
            Complexity::Polynomial(k) => write!(f, "polynomial (degree {k})"),
            Complexity::Exponential => write!(f, "exponential"),
        }
    }
}

/// A concrete attack input, decomposed as `prefix · pump^n · suffix`.
///
/// The components are Unicode scalar values taken from real transition
/// labels of the analyzed automaton. `repeat_count` is the pump count the
/// analyzer suggests (the configured `attack_limit`); callers may pick any
/// `n` via [`AttackString::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackString {
    pub prefix: Vec<u32>,
    pub pump: Vec<u32>,
    pub suffix: Vec<u32>,
    pub repeat_count: usize,
}

impl AttackString {
    /// Materialize the attack input with `n` pump repetitions.
    pub fn build(&self, n: usize) -> String {
        let part = |cps: &[u32]| -> String {
            cps.iter().filter_map(|&cp| char::from_u32(cp)).collect()
        };
        let mut s = part(&self.prefix);
        let pump = part(&self.pump);
        for _ in 0..n {
            s.push_str(&pump);
        }
        s.push_str(&part(&self.suffix));
        s
    }

    /// Materialize with the suggested `repeat_count`.
    pub fn to_attack_input(&self) -> String {
        self.build(self.repeat_count)
    }
}

impl fmt::Display for AttackString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |cps: &[u32]| {
            cps.iter()
                .filter_map(|&cp| char::from_u32(cp))
                .map(|c| c.escape_default().to_string())
                .join("")
        };
        write!(
            f,
            "'{}' + '{}' x {} + '{}'",
            part(&self.prefix),
            part(&self.pump),
            self.repeat_count,
            part(&self.suffix)
        )
    }
}

/// Source span of the sub-pattern the witness points into. Best effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotspot {
    /// Byte offset of the start of the offending sub-pattern.
    pub start: usize,
    /// Byte offset one past its end.
    pub end: usize,
}

/// The aggregate result of analyzing one pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    /// The pattern source, as given.
    pub source: String,
    pub status: Status,
    /// Present for `Safe` and `Vulnerable` verdicts.
    pub complexity: Option<Complexity>,
    /// Present iff the verdict is `Vulnerable`.
    pub attack: Option<AttackString>,
    /// Present for vulnerable verdicts when the offending span is known.
    pub hotspot: Option<Hotspot>,
    /// Machine-readable reason for `Unknown`, human-readable message for
    /// `Error`.
    pub reason: Option<String>,
}

impl Diagnostics {
    pub fn safe(source: &str) -> Diagnostics {
        Diagnostics {
            source: source.to_owned(),
            status: Status::Safe,
            complexity: Some(Complexity::Safe),
            attack: None,
            hotspot: None,
            reason: None,
        }
    }

    pub fn vulnerable(
        source: &str,
        complexity: Complexity,
        attack: AttackString,
        hotspot: Option<Hotspot>,
    ) -> Diagnostics {
        Diagnostics {
            source: source.to_owned(),
            status: Status::Vulnerable,
            complexity: Some(complexity),
            attack: Some(attack),
            hotspot,
            reason: None,
        }
    }

    pub fn unknown(source: &str, reason: &str) -> Diagnostics {
        Diagnostics {
            source: source.to_owned(),
            status: Status::Unknown,
            complexity: None,
            attack: None,
            hotspot: None,
            reason: Some(reason.to_owned()),
        }
    }

    pub fn error(source: &str, message: String) -> Diagnostics {
        Diagnostics {
            source: source.to_owned(),
            status: Status::Error,
            complexity: None,
            attack: None,
            hotspot: None,
            reason: Some(message),
        }
    }

    pub fn is_safe(&self) -> bool {
        self.status == Status::Safe
    }

    pub fn is_vulnerable(&self) -> bool {
        self.status == Status::Vulnerable
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Status::Safe => write!(f, "{}: safe", self.source),
            Status::Vulnerable => {
                write!(f, "{}: vulnerable", self.source)?;
                if let Some(complexity) = self.complexity {
                    write!(f, ", {complexity}")?;
                }
                if let Some(attack) = &self.attack {
                    write!(f, ", attack {attack}")?;
                }
                Ok(())
            }
            Status::Unknown => write!(
                f,
                "{}: unknown ({})",
                self.source,
                self.reason.as_deref().unwrap_or("unspecified")
            ),
            Status::Error => write!(
                f,
                "{}: error ({})",
                self.source,
                self.reason.as_deref().unwrap_or("unspecified")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_string_materialization() {
        let attack = AttackString {
            prefix: vec!['x' as u32],
            pump: vec!['a' as u32, 'b' as u32],
            suffix: vec!['!' as u32],
            repeat_count: 3,
        };
        assert_eq!(attack.build(2), "xabab!");
        assert_eq!(attack.to_attack_input(), "xababab!");
        assert_eq!(attack.to_string(), "'x' + 'ab' x 3 + '!'");
    }

    #[test]
    fn verdict_constructors() {
        let safe = Diagnostics::safe("^a+$");
        assert!(safe.is_safe());
        assert_eq!(safe.complexity, Some(Complexity::Safe));

        let unknown = Diagnostics::unknown(r"(a)\1", "backreference_unsupported");
        assert_eq!(unknown.status, Status::Unknown);
        assert_eq!(unknown.reason.as_deref(), Some("backreference_unsupported"));
        assert!(unknown.attack.is_none());
    }

    #[test]
    fn complexity_accessors() {
        assert!(Complexity::Exponential.is_vulnerable());
        assert!(!Complexity::Safe.is_vulnerable());
        assert_eq!(Complexity::Polynomial(3).degree(), Some(3));
        assert_eq!(Complexity::Exponential.degree(), None);
        assert_eq!(Complexity::Polynomial(2).to_string(), "polynomial (degree 2)");
    }
}
