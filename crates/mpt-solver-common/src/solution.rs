//! Solution representation returned by solver backends.

use serde::{Deserialize, Serialize};

/// Status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    /// Proven optimal solution found.
    Optimal,
    /// Feasible solution found, optimality not proven (gap may be open).
    Feasible,
    /// Solution status unknown.
    Unknown,
}

impl SolutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::Feasible)
    }

    pub fn is_proven(&self) -> bool {
        matches!(self, SolutionStatus::Optimal)
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "optimal"),
            SolutionStatus::Feasible => write!(f, "feasible"),
            SolutionStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// A solution to a canonical model.
///
/// `values` is indexed by column index; scatter it back onto tokens with
/// [`mpt_core::TokenList::set_solution`] through the model's index map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSolution {
    pub status: SolutionStatus,

    /// Objective value of `values`.
    pub objective: f64,

    /// Best known bound on the objective (equals `objective` when optimal).
    pub best_bound: f64,

    /// Relative gap between objective and best bound.
    pub gap: f64,

    /// Variable values by column index.
    pub values: Vec<f64>,

    /// Solve time in milliseconds.
    pub solve_time_ms: u128,
}

impl SolverSolution {
    /// A proven-optimal solution with a closed gap.
    pub fn optimal(objective: f64, values: Vec<f64>) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            objective,
            best_bound: objective,
            gap: 0.0,
            values,
            solve_time_ms: 0,
        }
    }

    pub fn with_solve_time_ms(mut self, solve_time_ms: u128) -> Self {
        self.solve_time_ms = solve_time_ms;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_proven()
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }
}
