//! Linear canonical model: variables, constraints, objective.
//!
//! The triad model is the matrix form handed to LP/MILP backends and the
//! substrate of the structural transforms. `normalize` and `linear_relax`
//! mutate the receiver; `dual`, `farkas_dual` and `feasibility` are pure
//! constructors returning a new model that shares only the token index map.

use std::sync::Arc;

use sprs::TriMat;

use mpt_core::{ObjectCategory, Sign, TokenIndexMap, VariableKind};

use crate::model::{
    normalize_bounds, BoundSign, Constraint, ConstraintSource, Objective, RowCell, Variable,
    VariableOrigin,
};

/// A coefficient at one row/column position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearCell {
    pub row: usize,
    pub col: usize,
    pub coefficient: f64,
}

impl RowCell for LinearCell {
    fn row(&self) -> usize {
        self.row
    }
}

/// A coefficient at one objective column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTerm {
    pub col: usize,
    pub coefficient: f64,
}

pub type LinearConstraint = Constraint<LinearCell>;
pub type LinearObjective = Objective<LinearTerm>;

/// Canonical linear model in column-indexed matrix form.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTriadModel {
    pub name: String,
    pub variables: Vec<Variable>,
    pub constraints: LinearConstraint,
    pub objective: LinearObjective,
    /// Shared read-only map from tokens to the leading columns, used to
    /// scatter solutions back onto tokens.
    pub index_map: Arc<TokenIndexMap>,
}

/// Bound of a dual variable attached to a primal row.
fn dual_variable_bounds(category: ObjectCategory, sign: Sign) -> (f64, f64) {
    match (category, sign) {
        (_, Sign::Equal) => (f64::NEG_INFINITY, f64::INFINITY),
        (ObjectCategory::Maximize, Sign::LessEqual) => (0.0, f64::INFINITY),
        (ObjectCategory::Maximize, Sign::GreaterEqual) => (f64::NEG_INFINITY, 0.0),
        (ObjectCategory::Minimize, Sign::LessEqual) => (f64::NEG_INFINITY, 0.0),
        (ObjectCategory::Minimize, Sign::GreaterEqual) => (0.0, f64::INFINITY),
    }
}

/// Sign of the dual constraint attached to a primal variable.
fn dual_constraint_sign(category: ObjectCategory, bound: BoundSign) -> Sign {
    match (category, bound) {
        (_, BoundSign::Free) => Sign::Equal,
        (ObjectCategory::Minimize, BoundSign::NonNegative) => Sign::LessEqual,
        (ObjectCategory::Minimize, BoundSign::NonPositive) => Sign::GreaterEqual,
        (ObjectCategory::Maximize, BoundSign::NonNegative) => Sign::GreaterEqual,
        (ObjectCategory::Maximize, BoundSign::NonPositive) => Sign::LessEqual,
    }
}

impl LinearTriadModel {
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

    /// Every variable's working bound is in one of the canonical shapes.
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

    /// Push out-of-pattern variable bounds into explicit rows.
    ///
    /// Appends a `>=` row per offending lower bound and a `<=` row per
    /// offending upper bound, then frees the working bound. Idempotent.
    pub fn normalize(&mut self) -> &mut Self {
        normalize_bounds(
            &mut self.variables,
            &mut self.constraints,
            |row, col, coefficient| LinearCell {
                row,
                col,
                coefficient,
            },
        );
        self
    }

    /// Dense objective coefficients, indexed by column.
    fn objective_by_column(&self) -> Vec<f64> {
        let mut coefficients = vec![0.0; self.num_cols()];
        for cell in &self.objective.cells {
            coefficients[cell.col] += cell.coefficient;
        }
        coefficients
    }

    /// Constraint cells grouped by column, each group sorted by row.
    ///
    /// The transpose of the constraint matrix, computed sparsely; duplicate
    /// positions are summed.
    fn cells_by_column(&self) -> Vec<Vec<(usize, f64)>> {
        let mut triplets = TriMat::new((self.num_rows(), self.num_cols()));
        for cell in self.constraints.cells() {
            triplets.add_triplet(cell.row, cell.col, cell.coefficient);
        }
        let by_column: sprs::CsMat<f64> = triplets.to_csc();

        let mut columns = Vec::with_capacity(self.num_cols());
        for column in by_column.outer_iterator() {
            columns.push(column.iter().map(|(row, &coef)| (row, coef)).collect());
        }
        columns
    }

    /// The LP dual of a normalized model.
    ///
    /// One dual variable per primal row, one dual constraint per primal
    /// column, objective and right-hand side swapped, category reversed.
    pub fn dual(&self) -> LinearTriadModel {
        assert!(
            self.is_normalized(),
            "dual() requires a normalized model; call normalize() first"
        );

        let category = self.objective.category;

        let mut variables = Vec::with_capacity(self.num_rows());
        for row in 0..self.num_rows() {
            let (lower_bound, upper_bound) =
                dual_variable_bounds(category, self.constraints.signs()[row]);
            variables.push(Variable {
                index: row,
                lower_bound,
                upper_bound,
                kind: VariableKind::Continuous,
                name: format!("{}_dual", self.constraints.names()[row]),
                initial: None,
                origin: VariableOrigin::DualOf { row },
            });
        }

        let objective_coefficients = self.objective_by_column();
        let columns = self.cells_by_column();

        let mut constraints = LinearConstraint::with_capacity(self.num_cols());
        for (col, primal) in self.variables.iter().enumerate() {
            let cells = columns[col]
                .iter()
                .map(|&(primal_row, coefficient)| LinearCell {
                    row: col,
                    col: primal_row,
                    coefficient,
                })
                .collect();
            constraints.push_row(
                cells,
                dual_constraint_sign(category, primal.bound_sign()),
                objective_coefficients[col],
                format!("{}_dual", primal.name),
                ConstraintSource::Dual,
            );
        }

        let objective = LinearObjective {
            category: category.reversed(),
            cells: (0..self.num_rows())
                .map(|row| LinearTerm {
                    col: row,
                    coefficient: self.constraints.rhs()[row],
                })
                .collect(),
            constant: self.objective.constant,
        };

        LinearTriadModel {
            name: format!("{}-dual", self.name),
            variables,
            constraints,
            objective,
            index_map: Arc::clone(&self.index_map),
        }
    }

    /// The Farkas alternative system of a normalized model.
    ///
    /// Its rows are the transposed homogeneous system plus a normalization
    /// row pinning the certificate scale; a bounded feasible solution
    /// certifies primal infeasibility. Free farkas variables (from primal
    /// equality rows) are split into a non-negative pair so the objective
    /// can charge their magnitude.
    pub fn farkas_dual(&self) -> LinearTriadModel {
        assert!(
            self.is_normalized(),
            "farkas_dual() requires a normalized model; call normalize() first"
        );

        let num_rows = self.num_rows();

        let mut variables = Vec::with_capacity(num_rows);
        for row in 0..num_rows {
            let (lower_bound, upper_bound) = match self.constraints.signs()[row] {
                Sign::LessEqual => (0.0, f64::INFINITY),
                Sign::GreaterEqual => (f64::NEG_INFINITY, 0.0),
                Sign::Equal => (f64::NEG_INFINITY, f64::INFINITY),
            };
            variables.push(Variable {
                index: row,
                lower_bound,
                upper_bound,
                kind: VariableKind::Continuous,
                name: format!("{}_farkas", self.constraints.names()[row]),
                initial: None,
                origin: VariableOrigin::DualOf { row },
            });
        }

        // Non-negative split pair per free farkas variable.
        let mut split_pairs = Vec::new();
        for row in 0..num_rows {
            if self.constraints.signs()[row] != Sign::Equal {
                continue;
            }
            let positive = variables.len();
            variables.push(Variable {
                index: positive,
                lower_bound: 0.0,
                upper_bound: f64::INFINITY,
                kind: VariableKind::UContinuous,
                name: format!("{}_farkas_pos", self.constraints.names()[row]),
                initial: None,
                origin: VariableOrigin::SlackOf { row },
            });
            let negative = variables.len();
            variables.push(Variable {
                index: negative,
                lower_bound: 0.0,
                upper_bound: f64::INFINITY,
                kind: VariableKind::UContinuous,
                name: format!("{}_farkas_neg", self.constraints.names()[row]),
                initial: None,
                origin: VariableOrigin::SlackOf { row },
            });
            split_pairs.push((row, positive, negative));
        }

        let columns = self.cells_by_column();
        let mut constraints =
            LinearConstraint::with_capacity(self.num_cols() + 1 + split_pairs.len());

        // Transposed homogeneous system, one row per primal column.
        for (col, primal) in self.variables.iter().enumerate() {
            let row = constraints.len();
            let cells = columns[col]
                .iter()
                .map(|&(primal_row, coefficient)| LinearCell {
                    row,
                    col: primal_row,
                    coefficient,
                })
                .collect();
            let sign = match primal.bound_sign() {
                BoundSign::NonNegative => Sign::GreaterEqual,
                BoundSign::NonPositive => Sign::LessEqual,
                BoundSign::Free => Sign::Equal,
            };
            constraints.push_row(
                cells,
                sign,
                0.0,
                format!("{}_farkas", primal.name),
                ConstraintSource::FarkasDual,
            );
        }

        // Normalization row fixing the certificate scale.
        {
            let row = constraints.len();
            let cells = (0..num_rows)
                .filter(|&primal_row| self.constraints.rhs()[primal_row] != 0.0)
                .map(|primal_row| LinearCell {
                    row,
                    col: primal_row,
                    coefficient: self.constraints.rhs()[primal_row],
                })
                .collect();
            constraints.push_row(
                cells,
                Sign::Equal,
                -1.0,
                "farkas_normalization".to_string(),
                ConstraintSource::FarkasDual,
            );
        }

        // Link each free farkas variable to its split pair.
        for &(primal_row, positive, negative) in &split_pairs {
            let row = constraints.len();
            constraints.push_row(
                vec![
                    LinearCell {
                        row,
                        col: primal_row,
                        coefficient: 1.0,
                    },
                    LinearCell {
                        row,
                        col: positive,
                        coefficient: -1.0,
                    },
                    LinearCell {
                        row,
                        col: negative,
                        coefficient: 1.0,
                    },
                ],
                Sign::Equal,
                0.0,
                format!("{}_farkas_split", self.constraints.names()[primal_row]),
                ConstraintSource::FarkasDual,
            );
        }

        // Charge the magnitude of every farkas variable.
        let mut objective_cells = Vec::new();
        for row in 0..num_rows {
            match self.constraints.signs()[row] {
                Sign::LessEqual => objective_cells.push(LinearTerm {
                    col: row,
                    coefficient: 1.0,
                }),
                Sign::GreaterEqual => objective_cells.push(LinearTerm {
                    col: row,
                    coefficient: -1.0,
                }),
                Sign::Equal => {}
            }
        }
        for &(_, positive, negative) in &split_pairs {
            objective_cells.push(LinearTerm {
                col: positive,
                coefficient: 1.0,
            });
            objective_cells.push(LinearTerm {
                col: negative,
                coefficient: 1.0,
            });
        }

        LinearTriadModel {
            name: format!("{}-farkas", self.name),
            variables,
            constraints,
            objective: LinearObjective {
                category: ObjectCategory::Minimize,
                cells: objective_cells,
                constant: 0.0,
            },
            index_map: Arc::clone(&self.index_map),
        }
    }

    /// The phase-1 feasibility model of a normalized model.
    ///
    /// Rows with negative right-hand sides are re-signed first; every row
    /// becomes an equality against a non-negative right-hand side with
    /// slack/artificial columns appended, and the objective minimizes the
    /// artificials alone. An optimal value of zero certifies feasibility of
    /// the original rows.
    pub fn feasibility(&self) -> LinearTriadModel {
        assert!(
            self.is_normalized(),
            "feasibility() requires a normalized model; call normalize() first"
        );

        let mut variables = self.variables.clone();
        let mut constraints = LinearConstraint::with_capacity(self.num_rows());
        let mut artificial_cols = Vec::new();

        for row in 0..self.num_rows() {
            let rhs = self.constraints.rhs()[row];
            let flip = rhs < 0.0;
            let sign = if flip {
                self.constraints.signs()[row].flipped()
            } else {
                self.constraints.signs()[row]
            };

            let mut cells: Vec<LinearCell> = self.constraints.lhs()[row]
                .iter()
                .map(|cell| LinearCell {
                    row,
                    col: cell.col,
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
                    cells.push(LinearCell {
                        row,
                        col: slack,
                        coefficient: 1.0,
                    });
                }
                Sign::GreaterEqual => {
                    let slack = push_column(&mut variables, "slack", VariableOrigin::SlackOf { row });
                    cells.push(LinearCell {
                        row,
                        col: slack,
                        coefficient: -1.0,
                    });
                    let artificial = push_column(
                        &mut variables,
                        "artificial",
                        VariableOrigin::ArtificialOf { row },
                    );
                    cells.push(LinearCell {
                        row,
                        col: artificial,
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
                    cells.push(LinearCell {
                        row,
                        col: artificial,
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

        LinearTriadModel {
            name: format!("{}-feasibility", self.name),
            variables,
            constraints,
            objective: LinearObjective {
                category: ObjectCategory::Minimize,
                cells: artificial_cols
                    .into_iter()
                    .map(|col| LinearTerm {
                        col,
                        coefficient: 1.0,
                    })
                    .collect(),
                constant: 0.0,
            },
            index_map: Arc::clone(&self.index_map),
        }
    }
}
