//! Unified error types for the mpt ecosystem
//!
//! This module provides a common error type [`MptError`] that can represent
//! errors from any part of the toolkit. Domain-specific error types can be
//! converted to `MptError` for uniform error handling at API boundaries.
//!
//! # Example
//!
//! ```ignore
//! use mpt_core::{MptError, MptResult};
//!
//! fn compile(model: &MechanismModel) -> MptResult<()> {
//!     let lowered = dump_linear(model, &DumpOptions::new())?;
//!     export(&lowered)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all mpt operations.
///
/// This enum provides a common error representation for the toolkit,
/// allowing errors from I/O, lowering, solving, and validation to be
/// handled uniformly.
#[derive(Error, Debug)]
pub enum MptError {
    /// I/O errors (file access, export targets, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Malformed mechanism-model input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Solver/backend errors
    #[error("Solver error: {0}")]
    Solver(String),

    /// Operations a model variant does not support
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using MptError.
pub type MptResult<T> = Result<T, MptError>;

// Conversion from anyhow::Error
impl From<anyhow::Error> for MptError {
    fn from(err: anyhow::Error) -> Self {
        MptError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for MptError {
    fn from(s: String) -> Self {
        MptError::Other(s)
    }
}

impl From<&str> for MptError {
    fn from(s: &str) -> Self {
        MptError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MptError::Validation("cell references unknown token".into());
        assert!(err.to_string().contains("Validation error"));
        assert!(err.to_string().contains("unknown token"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MptError = io_err.into();
        assert!(matches!(err, MptError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> MptResult<()> {
            Err(MptError::Unsupported("quadratic dual".into()))
        }

        fn outer() -> MptResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
