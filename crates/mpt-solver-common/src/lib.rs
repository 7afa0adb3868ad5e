//! Common types and backend traits for mpt solver integrations.
//!
//! This crate defines the boundary between the model compilation engine and
//! solver backends: a backend receives a finished canonical model
//! ([`mpt_model::LinearTriadModel`] or [`mpt_model::QuadraticTetradModel`])
//! and returns a [`SolverSolution`] or a typed [`SolverError`]. Backend
//! implementations live in their own crates; nothing here links a solver.
//!
//! # Diagnosing failures
//!
//! An [`SolverError::Infeasible`] outcome carries no certificate. Callers
//! that need one derive `model.farkas_dual()` and solve that: a bounded
//! feasible solution of the Farkas system is the infeasibility certificate,
//! and its values (indexed by primal row through each variable's
//! [`mpt_model::VariableOrigin`]) price the conflicting constraints.

pub mod backend;
pub mod error;
pub mod solution;

pub use backend::{LinearSolverBackend, QuadraticSolverBackend};
pub use error::{SolverError, SolverResult};
pub use solution::{SolutionStatus, SolverSolution};
