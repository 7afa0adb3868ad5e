//! Mechanism model: the symbolic input to the compilation engine.
//!
//! A mechanism model is what the expression layer hands over once symbols
//! have been flattened into cells: a token list, algebraic constraints over
//! token references, and an objective made of sub-expressions. It carries no
//! matrix structure yet; the lowering passes assign columns and rows.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::kind::VariableKind;
use crate::token::{TokenId, TokenList};

/// Comparison sign of a constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    LessEqual,
    GreaterEqual,
    Equal,
}

impl Sign {
    /// The sign after multiplying both sides by -1.
    pub fn flipped(&self) -> Sign {
        match self {
            Sign::LessEqual => Sign::GreaterEqual,
            Sign::GreaterEqual => Sign::LessEqual,
            Sign::Equal => Sign::Equal,
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sign::LessEqual => write!(f, "<="),
            Sign::GreaterEqual => write!(f, ">="),
            Sign::Equal => write!(f, "="),
        }
    }
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectCategory {
    Minimize,
    Maximize,
}

impl ObjectCategory {
    pub fn reversed(&self) -> ObjectCategory {
        match self {
            ObjectCategory::Minimize => ObjectCategory::Maximize,
            ObjectCategory::Maximize => ObjectCategory::Minimize,
        }
    }
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectCategory::Minimize => write!(f, "Minimize"),
            ObjectCategory::Maximize => write!(f, "Maximize"),
        }
    }
}

/// One term of a constraint or sub-objective.
///
/// A cell with a `partner` is a bilinear term `coefficient * token * partner`;
/// without one it is plain `coefficient * token`. Linear and bilinear cells
/// may be mixed freely within one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MechCell {
    pub token: TokenId,
    pub partner: Option<TokenId>,
    pub coefficient: f64,
}

impl MechCell {
    pub fn linear(token: TokenId, coefficient: f64) -> Self {
        Self {
            token,
            partner: None,
            coefficient,
        }
    }

    pub fn quadratic(token: TokenId, partner: TokenId, coefficient: f64) -> Self {
        Self {
            token,
            partner: Some(partner),
            coefficient,
        }
    }

    pub fn is_linear(&self) -> bool {
        self.partner.is_none()
    }
}

/// An algebraic constraint over tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct MechConstraint {
    pub cells: Vec<MechCell>,
    pub sign: Sign,
    pub rhs: f64,
    pub name: String,
}

impl MechConstraint {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The single token this constraint bounds, if it is a pure bound:
    /// non-empty, all cells linear, all on the same token.
    ///
    /// Pure bounds are absorbed into variable bounds during lowering and
    /// produce no constraint row.
    pub fn pure_token(&self) -> Option<TokenId> {
        let first = self.cells.first()?;
        if !first.is_linear() {
            return None;
        }
        let token = first.token;
        self.cells
            .iter()
            .all(|cell| cell.is_linear() && cell.token == token)
            .then_some(token)
    }
}

/// One sub-expression of the objective.
#[derive(Debug, Clone, PartialEq)]
pub struct MechSubObject {
    pub category: ObjectCategory,
    pub cells: Vec<MechCell>,
    pub constant: f64,
    pub name: String,
}

/// The objective: an overall category plus contributing sub-expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct MechObjective {
    pub category: ObjectCategory,
    pub sub_objects: Vec<MechSubObject>,
}

/// The full symbolic model handed to the compilation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MechanismModel {
    pub name: String,
    pub tokens: TokenList,
    pub constraints: Vec<MechConstraint>,
    pub objective: MechObjective,
    /// Opt-in to concurrent lowering for large constraint sets.
    pub concurrent: bool,
}

impl MechanismModel {
    pub fn new(name: impl Into<String>, category: ObjectCategory) -> Self {
        Self {
            name: name.into(),
            tokens: TokenList::new(),
            constraints: Vec::new(),
            objective: MechObjective {
                category,
                sub_objects: Vec::new(),
            },
            concurrent: false,
        }
    }

    pub fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn add_token(&mut self, name: impl Into<String>, kind: VariableKind) -> TokenId {
        self.tokens.add(name, kind)
    }

    pub fn add_token_with_bounds(
        &mut self,
        name: impl Into<String>,
        kind: VariableKind,
        lower_bound: f64,
        upper_bound: f64,
    ) -> TokenId {
        self.tokens
            .add_with_bounds(name, kind, lower_bound, upper_bound)
    }

    pub fn add_constraint(
        &mut self,
        cells: Vec<MechCell>,
        sign: Sign,
        rhs: f64,
        name: impl Into<String>,
    ) {
        self.constraints.push(MechConstraint {
            cells,
            sign,
            rhs,
            name: name.into(),
        });
    }

    pub fn add_sub_object(
        &mut self,
        category: ObjectCategory,
        cells: Vec<MechCell>,
        constant: f64,
        name: impl Into<String>,
    ) {
        self.objective.sub_objects.push(MechSubObject {
            category,
            cells,
            constant,
            name: name.into(),
        });
    }
}

impl fmt::Display for MechanismModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_flip_and_display() {
        assert_eq!(Sign::LessEqual.flipped(), Sign::GreaterEqual);
        assert_eq!(Sign::GreaterEqual.flipped(), Sign::LessEqual);
        assert_eq!(Sign::Equal.flipped(), Sign::Equal);
        assert_eq!(Sign::LessEqual.to_string(), "<=");
        assert_eq!(Sign::Equal.to_string(), "=");
    }

    #[test]
    fn test_category_reversal() {
        assert_eq!(
            ObjectCategory::Minimize.reversed(),
            ObjectCategory::Maximize
        );
        assert_eq!(ObjectCategory::Maximize.to_string(), "Maximize");
    }

    #[test]
    fn test_pure_token_detection() {
        let mut model = MechanismModel::new("test", ObjectCategory::Minimize);
        let x = model.add_token("x", VariableKind::Continuous);
        let y = model.add_token("y", VariableKind::Continuous);

        // 2x + 3x >= 1 is a pure bound on x
        model.add_constraint(
            vec![MechCell::linear(x, 2.0), MechCell::linear(x, 3.0)],
            Sign::GreaterEqual,
            1.0,
            "pure",
        );
        // x + y <= 10 is not
        model.add_constraint(
            vec![MechCell::linear(x, 1.0), MechCell::linear(y, 1.0)],
            Sign::LessEqual,
            10.0,
            "mixed",
        );
        // x * x <= 4 involves a bilinear cell, not a pure bound
        model.add_constraint(
            vec![MechCell::quadratic(x, x, 1.0)],
            Sign::LessEqual,
            4.0,
            "square",
        );

        assert_eq!(model.constraints[0].pure_token(), Some(x));
        assert_eq!(model.constraints[1].pure_token(), None);
        assert_eq!(model.constraints[2].pure_token(), None);
    }

    #[test]
    fn test_sign_serde_round_trip() {
        let json = serde_json::to_string(&Sign::LessEqual).unwrap();
        assert_eq!(json, "\"less_equal\"");
        let back: Sign = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Sign::LessEqual);

        let json = serde_json::to_string(&ObjectCategory::Maximize).unwrap();
        assert_eq!(json, "\"maximize\"");
    }

    #[test]
    fn test_empty_constraint_has_no_pure_token() {
        let constraint = MechConstraint {
            cells: Vec::new(),
            sign: Sign::Equal,
            rhs: 0.0,
            name: "empty".into(),
        };
        assert!(constraint.is_empty());
        assert_eq!(constraint.pure_token(), None);
    }
}
