//! Decision-variable kinds and their relaxations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a decision variable.
///
/// The integer family covers binary, small finite domains and general
/// integers; the continuous family covers their relaxed counterparts.
/// [`VariableKind::relaxed`] maps each integer kind onto the continuous
/// kind with the same natural bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// {0, 1}
    Binary,
    /// {0, 1, 2}
    Ternary,
    /// {-1, 0, 1}
    BalancedTernary,
    /// Non-negative integer
    UInteger,
    /// General integer
    Integer,
    /// Continuous in [0, 1]
    Percentage,
    /// Non-negative continuous
    UContinuous,
    /// General continuous
    Continuous,
}

impl VariableKind {
    pub fn is_binary(&self) -> bool {
        matches!(self, VariableKind::Binary)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            VariableKind::Binary
                | VariableKind::Ternary
                | VariableKind::BalancedTernary
                | VariableKind::UInteger
                | VariableKind::Integer
        )
    }

    /// Integer kinds other than binary (the `Generals` section of LP files).
    pub fn is_not_binary_integer(&self) -> bool {
        self.is_integer() && !self.is_binary()
    }

    pub fn is_continuous(&self) -> bool {
        !self.is_integer()
    }

    /// The continuous counterpart of this kind.
    ///
    /// Continuous kinds map to themselves, so relaxation is idempotent.
    pub fn relaxed(&self) -> VariableKind {
        match self {
            VariableKind::Binary => VariableKind::Percentage,
            VariableKind::Ternary | VariableKind::UInteger => VariableKind::UContinuous,
            VariableKind::BalancedTernary | VariableKind::Integer => VariableKind::Continuous,
            other => *other,
        }
    }

    /// Natural lower bound of the kind, used when a token declares none.
    pub fn default_lower_bound(&self) -> f64 {
        match self {
            VariableKind::Binary
            | VariableKind::Ternary
            | VariableKind::UInteger
            | VariableKind::Percentage
            | VariableKind::UContinuous => 0.0,
            VariableKind::BalancedTernary => -1.0,
            VariableKind::Integer | VariableKind::Continuous => f64::NEG_INFINITY,
        }
    }

    /// Natural upper bound of the kind, used when a token declares none.
    pub fn default_upper_bound(&self) -> f64 {
        match self {
            VariableKind::Binary | VariableKind::Percentage => 1.0,
            VariableKind::Ternary => 2.0,
            VariableKind::BalancedTernary => 1.0,
            VariableKind::UInteger
            | VariableKind::Integer
            | VariableKind::UContinuous
            | VariableKind::Continuous => f64::INFINITY,
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableKind::Binary => write!(f, "binary"),
            VariableKind::Ternary => write!(f, "ternary"),
            VariableKind::BalancedTernary => write!(f, "balanced_ternary"),
            VariableKind::UInteger => write!(f, "uinteger"),
            VariableKind::Integer => write!(f, "integer"),
            VariableKind::Percentage => write!(f, "percentage"),
            VariableKind::UContinuous => write!(f, "ucontinuous"),
            VariableKind::Continuous => write!(f, "continuous"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relaxation_targets() {
        assert_eq!(VariableKind::Binary.relaxed(), VariableKind::Percentage);
        assert_eq!(VariableKind::Ternary.relaxed(), VariableKind::UContinuous);
        assert_eq!(VariableKind::UInteger.relaxed(), VariableKind::UContinuous);
        assert_eq!(
            VariableKind::BalancedTernary.relaxed(),
            VariableKind::Continuous
        );
        assert_eq!(VariableKind::Integer.relaxed(), VariableKind::Continuous);
    }

    #[test]
    fn test_relaxation_is_idempotent() {
        for kind in [
            VariableKind::Binary,
            VariableKind::Ternary,
            VariableKind::BalancedTernary,
            VariableKind::UInteger,
            VariableKind::Integer,
            VariableKind::Percentage,
            VariableKind::UContinuous,
            VariableKind::Continuous,
        ] {
            let relaxed = kind.relaxed();
            assert!(relaxed.is_continuous());
            assert_eq!(relaxed.relaxed(), relaxed);
        }
    }

    #[test]
    fn test_generals_membership() {
        assert!(!VariableKind::Binary.is_not_binary_integer());
        assert!(VariableKind::UInteger.is_not_binary_integer());
        assert!(VariableKind::Integer.is_not_binary_integer());
        assert!(!VariableKind::Continuous.is_not_binary_integer());
    }

    #[test]
    fn test_default_bounds() {
        assert_eq!(VariableKind::Binary.default_lower_bound(), 0.0);
        assert_eq!(VariableKind::Binary.default_upper_bound(), 1.0);
        assert_eq!(VariableKind::BalancedTernary.default_lower_bound(), -1.0);
        assert!(VariableKind::Continuous.default_lower_bound().is_infinite());
        assert!(VariableKind::UInteger.default_upper_bound().is_infinite());
    }
}
