//! Turning-point detector — hysteresis and peak-valley filtering
//!
//! Two-stage online filter that reduces a raw sample stream to its
//! turning points (local extrema). The first turning point comes out of
//! a running min/max search; afterwards the detector tracks one
//! unconfirmed *interim* point and a slope direction:
//!
//! ```text
//!   continuation  (same slope)          -> interim moves to the new extremum
//!   reversal      (delta >  hysteresis) -> interim is confirmed, emitted
//!   reversal      (delta <= hysteresis) -> ignored (hysteresis band)
//! ```
//!
//! The emitted sequence is a deterministic function of the concatenated
//! sample stream, regardless of how the stream is chunked.
//!
//! ## Example
//!
//! ```rust
//! use rainflow_core::turning_point_detector::TurningPointDetector;
//! use rainflow_core::types::TurningPoint;
//!
//! let mut det = TurningPointDetector::new(0.5);
//! let mut confirmed = Vec::new();
//! for (i, &v) in [1.0, 3.0, 2.0, 4.0].iter().enumerate() {
//!     let pt = TurningPoint::new(v, i as u64 + 1, 0);
//!     confirmed.extend(det.advance(pt));
//! }
//! let values: Vec<f64> = confirmed.iter().map(|tp| tp.value).collect();
//! assert_eq!(values, [1.0, 3.0, 2.0]);
//! assert_eq!(det.interim().unwrap().value, 4.0);
//! ```

use crate::types::TurningPoint;

/// Detector phase within the engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No sample seen yet.
    Idle,
    /// Running min/max search for the first turning point.
    Searching,
    /// First turning point found; interim point is live.
    Tracking,
}

/// Online turning-point detector.
#[derive(Debug, Clone)]
pub struct TurningPointDetector {
    /// Minimum reversal magnitude for a new turning point (strict).
    hysteresis: f64,
    phase: Phase,
    /// Current slope direction, +1 rising / -1 falling.
    slope: i8,
    /// Running minimum during the first-TP search.
    minimum: TurningPoint,
    /// Running maximum during the first-TP search.
    maximum: TurningPoint,
    /// Unconfirmed trailing turning point.
    interim: Option<TurningPoint>,
}

impl TurningPointDetector {
    pub fn new(hysteresis: f64) -> Self {
        Self {
            hysteresis,
            phase: Phase::Idle,
            slope: 0,
            minimum: TurningPoint::default(),
            maximum: TurningPoint::default(),
            interim: None,
        }
    }

    /// Feed one sample; returns the newly confirmed turning point, if
    /// this sample confirmed one.
    pub fn advance(&mut self, pt: TurningPoint) -> Option<TurningPoint> {
        match self.phase {
            Phase::Idle => {
                self.minimum = pt;
                self.maximum = pt;
                self.phase = Phase::Searching;
                None
            }
            Phase::Searching => self.search_first(pt),
            Phase::Tracking => self.track(pt),
        }
    }

    /// First-TP search: widen the global extrema until their spread
    /// exceeds the hysteresis, then emit the extremum opposite to the
    /// current slope.
    fn search_first(&mut self, pt: TurningPoint) -> Option<TurningPoint> {
        let is_falling = if pt.value < self.minimum.value {
            self.minimum = pt;
            true
        } else if pt.value > self.maximum.value {
            self.maximum = pt;
            false
        } else {
            // Extrema unchanged, spread cannot newly exceed hysteresis.
            return None;
        };

        let delta = self.maximum.value - self.minimum.value;
        if delta > self.hysteresis {
            // On a falling slope the maximum is the first turning
            // point, on a rising slope the minimum.
            let first = if is_falling { self.maximum } else { self.minimum };
            self.slope = if is_falling { -1 } else { 1 };
            self.interim = Some(pt);
            self.phase = Phase::Tracking;
            Some(first)
        } else {
            None
        }
    }

    /// Peak-valley filtering against the interim point.
    fn track(&mut self, pt: TurningPoint) -> Option<TurningPoint> {
        let interim = self.interim.expect("tracking phase always has an interim point");
        let delta = (pt.value - interim.value).abs();
        let sign: i8 = if pt.value - interim.value < 0.0 { -1 } else { 1 };

        if sign == self.slope {
            // Continuation: the interim point moves out to the new
            // extremum.
            if pt.value != interim.value {
                self.interim = Some(pt);
            }
            None
        } else if delta > self.hysteresis {
            // Reversal beyond the hysteresis band: the interim point is
            // confirmed, the current sample takes its place.
            self.slope = sign;
            self.interim = Some(pt);
            Some(interim)
        } else {
            // Reversal within the hysteresis band.
            None
        }
    }

    /// The unconfirmed trailing turning point, if any.
    #[inline]
    pub fn interim(&self) -> Option<&TurningPoint> {
        self.interim.as_ref()
    }

    /// Remove and return the interim point (promotion at finalization).
    pub fn take_interim(&mut self) -> Option<TurningPoint> {
        self.interim.take()
    }

    /// Whether an interim point is live (engine state `BusyInterim`).
    #[inline]
    pub fn has_interim(&self) -> bool {
        self.interim.is_some()
    }

    /// Whether any sample has been consumed.
    #[inline]
    pub fn started(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Return to the initial state.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.slope = 0;
        self.minimum = TurningPoint::default();
        self.maximum = TurningPoint::default();
        self.interim = None;
    }
}
