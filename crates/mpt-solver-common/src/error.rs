//! Error types for solver integrations.

use thiserror::Error;

/// Errors a solver backend can return.
///
/// Infeasible and unbounded outcomes are errors at this boundary because
/// they carry no solution vector; callers that want to diagnose
/// infeasibility derive the Farkas-dual model and solve that instead.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The model admits no feasible point.
    #[error("model '{model}' is infeasible")]
    Infeasible { model: String },

    /// The objective is unbounded over the feasible region.
    #[error("model '{model}' is unbounded")]
    Unbounded { model: String },

    /// The backend hit its wall-clock limit.
    #[error("solver timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The backend hit its iteration limit before converging.
    #[error("solver stopped at iteration limit {limit}")]
    IterationLimit { limit: usize },

    /// Numerical difficulties inside the backend.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// The backend cannot handle this model shape.
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    /// Backend-specific failure.
    #[error("solver backend error: {0}")]
    Backend(String),
}

/// Result type alias for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;
