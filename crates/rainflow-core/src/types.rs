//! Core types for rainflow cycle counting
//!
//! Defines the sample and turning-point representations shared by the
//! detector, the residue, the cycle finders and the histograms, plus the
//! engine state and error types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single real-valued load/stress sample.
pub type Sample = f64;

/// Result type for rainflow operations.
pub type RainflowResult<T> = Result<T, RainflowError>;

/// A confirmed or candidate turning point (local extremum) of the
/// filtered signal.
///
/// `pos` is the 1-based index of the sample in the overall stream,
/// counting every sample ever fed. `class` is the discretized value,
/// assigned when the sample enters the stream and left unclamped until
/// cycle processing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TurningPoint {
    /// Sample value.
    pub value: Sample,
    /// 1-based stream position.
    pub pos: u64,
    /// Class index, `floor((value - offset) / width)`.
    pub class: u32,
}

impl TurningPoint {
    pub fn new(value: Sample, pos: u64, class: u32) -> Self {
        Self { value, pos, class }
    }
}

/// Engine lifecycle state.
///
/// Transitions are monotonic forward (`Init` → `Busy` → `BusyInterim` →
/// `Finalize` → `Finished`), except `reset` which returns to `Init`.
/// `Error` is terminal until `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum State {
    /// Initialized, no samples consumed yet.
    Init,
    /// Searching for the first turning point.
    Busy,
    /// Residue active, interim turning point present.
    BusyInterim,
    /// Residue handling in progress.
    Finalize,
    /// Stream closed, results final.
    Finished,
    /// A fatal error occurred; only `reset` is accepted.
    Error,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Busy => "busy",
            Self::BusyInterim => "busy-interim",
            Self::Finalize => "finalize",
            Self::Finished => "finished",
            Self::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Errors that can occur during rainflow counting.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RainflowError {
    #[error("invalid class count: {0}. Must be between 2 and 512")]
    InvalidClassCount(u32),

    #[error("invalid class width: {0}. Must be greater than zero")]
    InvalidClassWidth(f64),

    #[error("invalid residual method code: {0}")]
    InvalidResidualMethod(u8),

    #[error("invalid counting method code: {0}")]
    InvalidCountingMethod(u8),

    #[error("operation '{op}' not allowed in state '{state}'")]
    InvalidState { op: &'static str, state: State },

    #[error("turning point storage is not enabled")]
    StorageDisabled,

    #[error("memory allocation failed while growing {what}")]
    OutOfMemory { what: &'static str },
}
