//! # mpt-core: Modeling Core for Mathematical Programming
//!
//! Provides the fundamental data structures shared by the mpt toolkit:
//! tokens (symbolic decision variables), the mechanism model produced by the
//! expression layer, and the unified error type.
//!
//! ## Design Philosophy
//!
//! Tokens are owned by a [`TokenList`] arena and referenced by [`TokenId`]
//! handles everywhere else. Column assignment for the canonical matrix form
//! is a separate, explicit step ([`TokenIndexMap`]), so that a token's
//! identity is never conflated with its position in a particular model:
//! derived models (duals, feasibility forms) share one index map and scatter
//! their solutions back through it.
//!
//! ## Quick Start
//!
//! ```rust
//! use mpt_core::*;
//!
//! let mut model = MechanismModel::new("diet", ObjectCategory::Minimize);
//! let x = model.add_token("x", VariableKind::UContinuous);
//! let y = model.add_token("y", VariableKind::UContinuous);
//!
//! // x + 2y >= 4
//! model.add_constraint(
//!     vec![MechCell::linear(x, 1.0), MechCell::linear(y, 2.0)],
//!     Sign::GreaterEqual,
//!     4.0,
//!     "protein",
//! );
//!
//! // minimize 3x + 5y
//! model.add_sub_object(
//!     ObjectCategory::Minimize,
//!     vec![MechCell::linear(x, 3.0), MechCell::linear(y, 5.0)],
//!     0.0,
//!     "cost",
//! );
//! ```

pub mod error;
pub mod kind;
pub mod mechanism;
pub mod token;

pub use error::{MptError, MptResult};
pub use kind::VariableKind;
pub use mechanism::{
    MechCell, MechConstraint, MechObjective, MechSubObject, MechanismModel, ObjectCategory, Sign,
};
pub use token::{Token, TokenId, TokenIndexMap, TokenList};
