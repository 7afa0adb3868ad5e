//! # mpt-model: Model Compilation and Transformation Engine
//!
//! Compiles a symbolic mechanism model ([`mpt_core::MechanismModel`]) into
//! canonical, column-indexed matrix models, and derives the related
//! canonical forms used by solving strategies.
//!
//! ## Pipeline
//!
//! | Pass | Description |
//! |------|-------------|
//! | Token index map | tokens to contiguous columns, fixed tokens excluded |
//! | Variable lowering | bound tightening from pure single-token constraints |
//! | Constraint lowering | column re-indexing, fixed-token folding, clipping |
//! | Objective aggregation | sub-objectives merged under one category |
//!
//! The [`dump_linear`]/[`dump_quadratic`] schedulers run these passes
//! sequentially, or as a fork-join over row segments when the model opts in
//! and is large enough; both paths produce identical models.
//!
//! ## Canonical forms
//!
//! [`LinearTriadModel`] and [`QuadraticTetradModel`] support the structural
//! transforms: `linear_relax` and `normalize` mutate in place, while
//! `dual`, `farkas_dual` and `feasibility` construct new models sharing the
//! token index map.
//!
//! ## Example
//!
//! ```ignore
//! use mpt_core::*;
//! use mpt_model::{dump_linear, DumpOptions};
//!
//! let mut model = MechanismModel::new("plan", ObjectCategory::Minimize);
//! // ... tokens, constraints, sub-objectives ...
//!
//! let mut triad = dump_linear(&model, &DumpOptions::new())?;
//! triad.normalize();
//! let dual = triad.dual();
//! ```

pub mod arena;
pub mod export;
pub mod lower;
pub mod model;
pub mod numeric;

pub use arena::ArenaContext;
pub use lower::dump::{
    dump_linear, dump_linear_with_stats, dump_quadratic, dump_quadratic_with_stats, DumpOptions,
    DumpStats,
};
pub use model::tetrad::{
    QuadraticCell, QuadraticConstraint, QuadraticObjective, QuadraticTerm, QuadraticTetradModel,
    Term,
};
pub use model::triad::{
    LinearCell, LinearConstraint, LinearObjective, LinearTerm, LinearTriadModel,
};
pub use model::{BoundSign, Constraint, ConstraintSource, Objective, Variable, VariableOrigin};
