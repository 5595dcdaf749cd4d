//! # Rainflow Core - Streaming Cycle Counting for Fatigue Analysis
//!
//! This crate implements rainflow cycle counting for one-dimensional
//! load/stress time series, the standard preprocessing step for
//! fatigue-damage estimation (ASTM E1049, FVA counting guideline,
//! Clormann-Seeger).
//!
//! ```text
//!   |     .-.
//!   |    /   \         .-.
//!   |   /     \       /   \       .-.     .-.     _   _
//!   +--/-------\-----/-----\-----/---\---/---\---/-\-/-\/\/---
//!   | /         \   /       \   /     '-'     '-'
//!   |/           '-'         '-'
//! ```
//!
//! ## Overview
//!
//! Counting runs in four stages, all online:
//!
//! 1. **Hysteresis filtering**: reversals smaller than the hysteresis
//!    band are ignored
//! 2. **Peak-valley filtering**: only turning points (local extrema)
//!    survive
//! 3. **Discretization**: values map onto a uniform class partition
//! 4. **Cycle extraction**: the four-point method (or the
//!    Clormann-Seeger HCM variant) closes hysteresis cycles against a
//!    residue of open turning points
//!
//! Every closed cycle updates the from/to rainflow matrix, the
//! range-pair and level-crossing histograms and a Wöhler-curve based
//! pseudo damage. Input is consumed incrementally with memory bounded
//! by the class count, so streams of unbounded length can be processed;
//! results are invariant to how the stream is chunked across `feed`
//! calls. At stream end one of seven residue policies decides what
//! happens to the still-open cycles.
//!
//! ## Example
//!
//! ```rust
//! use rainflow_core::prelude::*;
//!
//! let mut engine = RainflowEngine::new(6, 1.0, 0.5, 1.0).unwrap();
//! engine
//!     .feed(&[2.0, 5.0, 3.0, 6.0, 2.0, 4.0, 1.0, 6.0, 1.0, 4.0])
//!     .unwrap();
//! engine.feed(&[1.0, 5.0, 3.0, 6.0, 3.0, 6.0, 1.0, 5.0, 2.0]).unwrap();
//! engine.finalize(ResidualMethod::None).unwrap();
//!
//! // Seven full cycles closed; five turning points remain open.
//! assert_eq!(engine.matrix().total(), 7 * engine.full_increment());
//! assert_eq!(engine.residue().len(), 5);
//! assert!(engine.pseudo_damage() > 0.0);
//! ```

pub mod class_map;
pub mod damage_history;
pub mod engine;
pub mod hcm;
pub mod histograms;
pub mod residue;
pub mod turning_point_detector;
pub mod turning_point_store;
pub mod types;
pub mod wohler;

// Re-export main types
pub use class_map::ClassMap;
pub use damage_history::SpreadMode;
pub use engine::{
    flags, CountingMethod, CountingSummary, RainflowEngine, ResidualMethod,
    FULL_CYCLE_INCREMENT, HALF_CYCLE_INCREMENT,
};
pub use histograms::{RainflowMatrix, COUNTS_LIMIT};
pub use turning_point_detector::TurningPointDetector;
pub use turning_point_store::TurningPointStore;
pub use types::{RainflowError, RainflowResult, Sample, State, TurningPoint};
pub use wohler::WohlerCurve;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::class_map::ClassMap;
    pub use crate::damage_history::SpreadMode;
    pub use crate::engine::{flags, CountingMethod, RainflowEngine, ResidualMethod};
    pub use crate::types::{RainflowError, RainflowResult, Sample, TurningPoint};
    pub use crate::wohler::WohlerCurve;
}
