//! Unified error types for the PWL workspace
//!
//! [`PwlError`] covers malformed breakpoint input, configuration problems and
//! the modeling-layer bridge. Every variant raised by the encoding engine is
//! produced before the ambient model is touched, so an `Err` always means
//! nothing was added.
//!
//! # Example
//!
//! ```
//! use pwl_core::{PwlError, PwlResult};
//!
//! fn check_lengths(x: &[f64], y: &[f64]) -> PwlResult<()> {
//!     if x.len() != y.len() {
//!         return Err(PwlError::InputShape(format!(
//!             "x has {} points, y has {}",
//!             x.len(),
//!             y.len()
//!         )));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_lengths(&[0.0, 1.0], &[0.0]).is_err());
//! ```

use crate::VarId;
use thiserror::Error;

/// Unified error type for all PWL operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PwlError {
    /// Breakpoint sequences are malformed (lengths, gap placement, ordering)
    #[error("Input shape error: {0}")]
    InputShape(String),

    /// A block collapses onto a single x value
    #[error("Degenerate segment: block {block} has all breakpoints at x = {x}")]
    DegenerateSegment { block: usize, x: f64 },

    /// An x value repeats more than twice, so the jump is ambiguous
    #[error("Ambiguous discontinuity: x = {x} occurs {occurrences} times (at most 2 allowed)")]
    AmbiguousDiscontinuity { x: f64, occurrences: usize },

    /// Referenced variable is not declared in the model
    #[error("Unknown variable: {0}")]
    UnknownVariable(VarId),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Feature not available on the target backend
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

impl PwlError {
    /// True for the errors caused by the breakpoint data itself.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PwlError::InputShape(_)
                | PwlError::DegenerateSegment { .. }
                | PwlError::AmbiguousDiscontinuity { .. }
        )
    }
}

/// Convenience type alias for Results using PwlError.
pub type PwlResult<T> = Result<T, PwlError>;

impl From<anyhow::Error> for PwlError {
    fn from(err: anyhow::Error) -> Self {
        PwlError::Other(format!("{:#}", err))
    }
}

impl From<String> for PwlError {
    fn from(s: String) -> Self {
        PwlError::Other(s)
    }
}

impl From<&str> for PwlError {
    fn from(s: &str) -> Self {
        PwlError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for PwlError {
    fn from(err: serde_json::Error) -> Self {
        PwlError::Other(format!("JSON error: {}", err))
    }
}
