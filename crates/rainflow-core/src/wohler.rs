//! Wöhler (S-N) curve and pseudo-damage calculation
//!
//! A fictive Wöhler curve relates stress amplitude to the number of
//! cycles to failure through a power law. The counting engine evaluates
//! it once per closed cycle to accumulate a scalar pseudo damage:
//!
//! ```text
//!   D_i = (Sa_i / SD)^|k| / ND          for Sa_i > SD
//!   D_i = (Sa_i / SD)^|k2| / ND         otherwise
//!   D_i = 0                             for Sa_i <= omission
//! ```
//!
//! evaluated in the log domain for numerical stability. With `k == k2`
//! the curve degenerates to the Miner-elementary rule.
//!
//! ## Example
//!
//! ```rust
//! use rainflow_core::wohler::WohlerCurve;
//!
//! let curve = WohlerCurve::builder().sd(1e3).nd(1e7).k(-5.0).build();
//! let d = curve.damage(2e3); // amplitude above SD
//! assert!(d > 0.0);
//! ```

use serde::{Deserialize, Serialize};

/// Wöhler curve parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WohlerCurve {
    /// Endurance amplitude `SD` (> 0).
    pub sd: f64,
    /// Endurance cycle count `ND` (> 0).
    pub nd: f64,
    /// Slope `k` (< 0).
    pub k: f64,
    /// Secondary slope `k2` below `SD`; equal to `k` for
    /// Miner-elementary.
    pub k2: f64,
    /// Omission amplitude; amplitudes at or below it contribute no
    /// damage.
    pub omission: f64,
}

impl Default for WohlerCurve {
    /// Fictive default curve: `SD = 1e3`, `ND = 1e7`, `k = k2 = -5`,
    /// no omission.
    fn default() -> Self {
        Self {
            sd: 1e3,
            nd: 1e7,
            k: -5.0,
            k2: -5.0,
            omission: 0.0,
        }
    }
}

impl WohlerCurve {
    /// Create a builder starting from the default curve.
    pub fn builder() -> WohlerCurveBuilder {
        WohlerCurveBuilder::default()
    }

    /// Pseudo damage of a single full cycle with the given amplitude.
    pub fn damage(&self, amplitude: f64) -> f64 {
        if amplitude <= self.omission || amplitude <= 0.0 {
            return 0.0;
        }
        let sd_log = self.sd.ln();
        let nd_log = self.nd.ln();
        let slope = if amplitude > self.sd { self.k } else { self.k2 };
        (slope.abs() * (amplitude.ln() - sd_log) - nd_log).exp()
    }
}

/// Builder for [`WohlerCurve`].
#[derive(Debug, Default)]
pub struct WohlerCurveBuilder {
    curve: WohlerCurve,
    k2_set: bool,
}

impl WohlerCurveBuilder {
    /// Endurance amplitude.
    pub fn sd(mut self, sd: f64) -> Self {
        self.curve.sd = sd;
        self
    }

    /// Endurance cycle count.
    pub fn nd(mut self, nd: f64) -> Self {
        self.curve.nd = nd;
        self
    }

    /// Primary slope. Also sets `k2` unless it was given explicitly.
    pub fn k(mut self, k: f64) -> Self {
        self.curve.k = k;
        if !self.k2_set {
            self.curve.k2 = k;
        }
        self
    }

    /// Secondary slope below `SD`.
    pub fn k2(mut self, k2: f64) -> Self {
        self.curve.k2 = k2;
        self.k2_set = true;
        self
    }

    /// Omission amplitude.
    pub fn omission(mut self, omission: f64) -> Self {
        self.curve.omission = omission;
        self
    }

    pub fn build(self) -> WohlerCurve {
        self.curve
    }
}
