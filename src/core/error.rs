//! Core error types for GSO and LLL operations

use crate::core::types::NumericBackend;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which precision sentinel fired during a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrecisionFailure {
    /// A Gram-Schmidt coefficient or squared norm became non-finite.
    Gso,
    /// Size reduction of a row stopped making progress.
    Babai,
    /// The swap loop exceeded its iteration limit.
    LllLoop,
}

impl fmt::Display for PrecisionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrecisionFailure::Gso => "GSO failure",
            PrecisionFailure::Babai => "Babai failure",
            PrecisionFailure::LllLoop => "LLL loop failure",
        };
        f.write_str(name)
    }
}

/// Error types for lattice reduction operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LatticeError {
    /// Parameters outside their documented domain or mutually inconsistent
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Invalid matrix dimensions
    #[error("Invalid dimensions: expected {expected:?}, found {found:?}")]
    InvalidDimensions {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Row or column index outside `[0, bound)`
    #[error("Index {index} out of range for dimension {bound}")]
    OutOfRange { index: usize, bound: usize },

    /// Operation on a released engine or on stale GSO data
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The active numeric backend could not keep up with the reduction
    #[error("Insufficient precision with backend {backend}: {kind} at kappa = {kappa}")]
    InsufficientPrecision {
        backend: NumericBackend,
        kind: PrecisionFailure,
        kappa: usize,
    },

    /// External cancellation observed mid-loop
    #[error("Reduction interrupted at kappa = {kappa}")]
    Interrupted { kappa: usize },

    /// Every candidate of a wrapper plan failed with insufficient precision
    #[error("Precision escalation exhausted; attempted backends: {}", join_backends(.attempted))]
    ExhaustedEscalation { attempted: Vec<NumericBackend> },

    /// Malformed matrix input
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(String),
}

fn join_backends(backends: &[NumericBackend]) -> String {
    backends
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<std::io::Error> for LatticeError {
    fn from(e: std::io::Error) -> Self {
        LatticeError::io_error(format!("I/O Error: {}", e))
    }
}

impl From<serde_json::Error> for LatticeError {
    fn from(e: serde_json::Error) -> Self {
        LatticeError::parse_error(format!("JSON: {}", e))
    }
}

/// Result type for lattice operations
pub type Result<T> = std::result::Result<T, LatticeError>;

impl LatticeError {
    /// Create an invalid parameters error
    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        LatticeError::InvalidParameters(msg.into())
    }

    /// Create an invalid dimensions error
    pub fn invalid_dimensions(expected: (usize, usize), found: (usize, usize)) -> Self {
        LatticeError::InvalidDimensions { expected, found }
    }

    /// Create an out of range error
    pub fn out_of_range(index: usize, bound: usize) -> Self {
        LatticeError::OutOfRange { index, bound }
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        LatticeError::InvalidState(msg.into())
    }

    /// Create an insufficient precision error
    pub fn insufficient_precision(
        backend: NumericBackend,
        kind: PrecisionFailure,
        kappa: usize,
    ) -> Self {
        LatticeError::InsufficientPrecision { backend, kind, kappa }
    }

    /// Create a parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        LatticeError::Parse(msg.into())
    }

    /// Create an I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        LatticeError::IoError(msg.into())
    }

    /// True for the only failure kind the escalation wrapper retries.
    pub fn is_insufficient_precision(&self) -> bool {
        matches!(self, LatticeError::InsufficientPrecision { .. })
    }
}
