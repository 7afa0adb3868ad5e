//! Backend traits implemented by solver integrations.

use mpt_model::{LinearTriadModel, QuadraticTetradModel};

use crate::error::SolverResult;
use crate::solution::SolverSolution;

/// A solver that consumes canonical linear models.
///
/// Implementations wrap an LP/MILP engine; they receive the finished matrix
/// form and have no access to the mechanism model. Infeasible/unbounded
/// outcomes are typed errors, see [`crate::SolverError`].
pub trait LinearSolverBackend: Send + Sync {
    fn solve(&self, model: &LinearTriadModel) -> SolverResult<SolverSolution>;
}

/// A solver that consumes canonical quadratic models.
pub trait QuadraticSolverBackend: Send + Sync {
    fn solve(&self, model: &QuadraticTetradModel) -> SolverResult<SolverSolution>;
}
