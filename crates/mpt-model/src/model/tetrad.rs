//! Quadratic canonical model: variables, constraints, objective, bilinear
//! cells.
//!
//! The tetrad model extends the triad with a second column index per cell,
//! carried as an exhaustive [`Term`] variant so linear and bilinear terms
//! can mix inside one row while staying checkable at every match site.

use std::sync::Arc;

use mpt_core::{MptError, MptResult, ObjectCategory, Sign, TokenIndexMap, VariableKind};

use crate::model::{normalize_bounds, Constraint, ConstraintSource, Objective, RowCell, Variable, VariableOrigin};

/// A linear or bilinear term shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    /// `coefficient * x[col]`
    Linear(usize),
    /// `coefficient * x[col] * x[col2]`
    Quadratic(usize, usize),
}

impl Term {
    pub fn col(&self) -> usize {
        match self {
            Term::Linear(col) => *col,
            Term::Quadratic(col, _) => *col,
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, Term::Linear(_))
    }
}

/// A coefficient at one row and one or two columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticCell {
    pub row: usize,
    pub term: Term,
    pub coefficient: f64,
}

impl RowCell for QuadraticCell {
    fn row(&self) -> usize {
        self.row
    }
}

/// A coefficient at one or two objective columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticTerm {
    pub term: Term,
    pub coefficient: f64,
}

pub type QuadraticConstraint = Constraint<QuadraticCell>;
pub type QuadraticObjective = Objective<QuadraticTerm>;

/// Canonical quadratic model in column-indexed matrix form.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticTetradModel {
    pub name: String,
    pub variables: Vec<Variable>,
    pub constraints: QuadraticConstraint,
    pub objective: QuadraticObjective,
    /// Shared read-only map from tokens to the leading columns.
    pub index_map: Arc<TokenIndexMap>,
}

impl QuadraticTetradModel {
    pub fn num_rows(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_cols(&self) -> usize {
        self.variables.len()
    }

    pub fn contains_binary(&self) -> bool {
        self.variables.iter().any(|v| v.kind.is_binary())
    }

    pub fn contains_integer(&self) -> bool {
        self.variables.iter().any(|v| v.kind.is_integer())
    }

    pub fn contains_not_binary_integer(&self) -> bool {
        self.variables.iter().any(|v| v.kind.is_not_binary_integer())
    }

    pub fn contains_continuous(&self) -> bool {
        self.variables.iter().any(|v| v.kind.is_continuous())
    }

    /// True if any cell carries a bilinear term.
    pub fn contains_quadratic_cell(&self) -> bool {
        self.constraints.cells().any(|c| !c.term.is_linear())
            || self.objective.cells.iter().any(|c| !c.term.is_linear())
    }

    pub fn is_normalized(&self) -> bool {
        self.variables.iter().all(Variable::is_normalized)
    }

    /// Relax every integer kind to its continuous counterpart.
    ///
    /// Idempotent; bounds are untouched.
    pub fn linear_relax(&mut self) -> &mut Self {
        for variable in &mut self.variables {
            variable.kind = variable.kind.relaxed();
        }
        self
    }

    /// Push out-of-pattern variable bounds into explicit rows. Idempotent.
    pub fn normalize(&mut self) -> &mut Self {
        normalize_bounds(
            &mut self.variables,
            &mut self.constraints,
            |row, col, coefficient| QuadraticCell {
                row,
                term: Term::Linear(col),
                coefficient,
            },
        );
        self
    }

    /// Quadratic duality is not provided.
    ///
    /// A sound quadratic dual needs its own KKT-based construction; falling
    /// back to the linear rules would silently produce a wrong model, so
    /// the operation is surfaced as an error instead.
    pub fn dual(&self) -> MptResult<QuadraticTetradModel> {
        Err(MptError::Unsupported(
            "dual() is not available for quadratic models".into(),
        ))
    }

    /// Quadratic Farkas duality is not provided; see [`Self::dual`].
    pub fn farkas_dual(&self) -> MptResult<QuadraticTetradModel> {
        Err(MptError::Unsupported(
            "farkas_dual() is not available for quadratic models".into(),
        ))
    }

    /// The phase-1 feasibility model of a normalized model.
    ///
    /// Identical to the linear construction; bilinear cells pass through
    /// unchanged (negated with the row when its right-hand side flips) and
    /// the appended slack/artificial columns are linear.
    pub fn feasibility(&self) -> QuadraticTetradModel {
        assert!(
            self.is_normalized(),
            "feasibility() requires a normalized model; call normalize() first"
        );

        let mut variables = self.variables.clone();
        let mut constraints = QuadraticConstraint::with_capacity(self.num_rows());
        let mut artificial_cols = Vec::new();

        for row in 0..self.num_rows() {
            let rhs = self.constraints.rhs()[row];
            let flip = rhs < 0.0;
            let sign = if flip {
                self.constraints.signs()[row].flipped()
            } else {
                self.constraints.signs()[row]
            };

            let mut cells: Vec<QuadraticCell> = self.constraints.lhs()[row]
                .iter()
                .map(|cell| QuadraticCell {
                    row,
                    term: cell.term,
                    coefficient: if flip {
                        -cell.coefficient
                    } else {
                        cell.coefficient
                    },
                })
                .collect();

            let name = &self.constraints.names()[row];
            let push_column =
                |variables: &mut Vec<Variable>, suffix: &str, origin: VariableOrigin| {
                    let col = variables.len();
                    variables.push(Variable {
                        index: col,
                        lower_bound: 0.0,
                        upper_bound: f64::INFINITY,
                        kind: VariableKind::UContinuous,
                        name: format!("{name}_{suffix}"),
                        initial: None,
                        origin,
                    });
                    col
                };

            match sign {
                Sign::LessEqual => {
                    let slack = push_column(&mut variables, "slack", VariableOrigin::SlackOf { row });
                    cells.push(QuadraticCell {
                        row,
                        term: Term::Linear(slack),
                        coefficient: 1.0,
                    });
                }
                Sign::GreaterEqual => {
                    let slack = push_column(&mut variables, "slack", VariableOrigin::SlackOf { row });
                    cells.push(QuadraticCell {
                        row,
                        term: Term::Linear(slack),
                        coefficient: -1.0,
                    });
                    let artificial = push_column(
                        &mut variables,
                        "artificial",
                        VariableOrigin::ArtificialOf { row },
                    );
                    cells.push(QuadraticCell {
                        row,
                        term: Term::Linear(artificial),
                        coefficient: 1.0,
                    });
                    artificial_cols.push(artificial);
                }
                Sign::Equal => {
                    let artificial = push_column(
                        &mut variables,
                        "artificial",
                        VariableOrigin::ArtificialOf { row },
                    );
                    cells.push(QuadraticCell {
                        row,
                        term: Term::Linear(artificial),
                        coefficient: 1.0,
                    });
                    artificial_cols.push(artificial);
                }
            }

            constraints.push_row(
                cells,
                Sign::Equal,
                rhs.abs(),
                name.clone(),
                ConstraintSource::Feasibility,
            );
        }

        QuadraticTetradModel {
            name: format!("{}-feasibility", self.name),
            variables,
            constraints,
            objective: QuadraticObjective {
                category: ObjectCategory::Minimize,
                cells: artificial_cols
                    .into_iter()
                    .map(|col| QuadraticTerm {
                        term: Term::Linear(col),
                        coefficient: 1.0,
                    })
                    .collect(),
                constant: 0.0,
            },
            index_map: Arc::clone(&self.index_map),
        }
    }
}
