//! Rainflow counting engine
//!
//! Streaming context tying the pipeline together: samples pass the
//! turning-point detector, confirmed turning points enter the residue,
//! the configured cycle finder closes cycles against it, and every
//! closed cycle updates the rainflow matrix, the range-pair and
//! level-crossing histograms and the pseudo damage.
//!
//! ```text
//!   samples -> detector -> residue -> cycle finder -> cycle processor
//!                |                                        |
//!                +-> turning-point store                  +-> matrix, rp, lc,
//!                    (optional, margin-aware)                 damage (+ history)
//! ```
//!
//! Memory is bounded by the class count (residue and HCM stack hold at
//! most `2 * count` points); only the optional turning-point store and
//! damage history grow with the stream. Results depend solely on the
//! concatenation of fed samples, never on how the stream is chunked
//! across `feed` calls.
//!
//! ## Example
//!
//! ```rust
//! use rainflow_core::engine::{RainflowEngine, ResidualMethod};
//!
//! let mut engine = RainflowEngine::new(4, 0.875, 0.5, 0.875).unwrap();
//! engine.feed(&[1.0, 3.0, 2.0, 4.0]).unwrap();
//! engine.finalize(ResidualMethod::None).unwrap();
//!
//! // The inner 3 -> 2 excursion closed as one full cycle.
//! assert_eq!(engine.matrix().total(), engine.full_increment());
//! let residue: Vec<f64> = engine.residue().iter().map(|tp| tp.value).collect();
//! assert_eq!(residue, [1.0, 4.0]);
//! ```

use crate::class_map::ClassMap;
use crate::damage_history::{DamageHistory, SpreadMode};
use crate::hcm::HcmStack;
use crate::histograms::RainflowMatrix;
use crate::residue::Residue;
use crate::turning_point_detector::TurningPointDetector;
use crate::turning_point_store::TurningPointStore;
use crate::types::{RainflowError, RainflowResult, Sample, State, TurningPoint};
use crate::wohler::WohlerCurve;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counting-control flags.
pub mod flags {
    /// Count closed cycles into the rainflow matrix.
    pub const COUNT_MATRIX: u32 = 1 << 0;
    /// Count closed cycles into the range-pair histogram.
    pub const COUNT_RP: u32 = 1 << 1;
    /// Count rising boundary crossings.
    pub const COUNT_LC_UP: u32 = 1 << 2;
    /// Count falling boundary crossings.
    pub const COUNT_LC_DN: u32 = 1 << 3;
    /// Count boundary crossings in both directions.
    pub const COUNT_LC: u32 = COUNT_LC_UP | COUNT_LC_DN;
    /// Accumulate pseudo damage (and the damage history, if enabled).
    pub const COUNT_DAMAGE: u32 = 1 << 4;
    /// Everything above.
    pub const COUNT_ALL: u32 = COUNT_MATRIX | COUNT_RP | COUNT_LC | COUNT_DAMAGE;
    /// Force the first and last samples to be recorded as turning
    /// points (requires turning-point storage).
    pub const ENFORCE_MARGIN: u32 = 1 << 8;
}

/// Histogram increment of a full cycle.
pub const FULL_CYCLE_INCREMENT: u64 = 2;
/// Histogram increment of a half cycle.
pub const HALF_CYCLE_INCREMENT: u64 = 1;

/// Cycle-extraction algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountingMethod {
    /// Detect turning points only; the residue is discarded as it
    /// forms.
    None = 0,
    /// Symmetric four-point method (FVA / ASTM E1049).
    FourPointMethod = 1,
    /// Clormann-Seeger three-point stack method.
    Hcm = 2,
}

impl CountingMethod {
    pub fn from_u8(value: u8) -> RainflowResult<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::FourPointMethod),
            2 => Ok(Self::Hcm),
            _ => Err(RainflowError::InvalidCountingMethod(value)),
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }
}

impl Default for CountingMethod {
    fn default() -> Self {
        Self::FourPointMethod
    }
}

impl fmt::Display for CountingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::FourPointMethod => "4ptm",
            Self::Hcm => "hcm",
        };
        write!(f, "{}", name)
    }
}

/// Residue policy applied at stream end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResidualMethod {
    /// Keep the residue untouched.
    None = 0,
    /// Same as `None` under the canonical code assignment.
    Ignore = 1,
    /// Drop the residue without counting.
    Discard = 2,
    /// Count each adjacent residue pair as a half cycle.
    HalfCycles = 3,
    /// Count each adjacent residue pair as a full cycle.
    FullCycles = 4,
    /// Clormann-Seeger counting correction, remainder as half cycles.
    ClormannSeeger = 5,
    /// DIN 45667 slope pairing into range-pair/level-crossing only.
    Din45667 = 6,
    /// Marsh's repeated-residue method: re-feed the residue, then keep
    /// what remains.
    Repeated = 7,
}

impl ResidualMethod {
    pub fn from_u8(value: u8) -> RainflowResult<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Ignore),
            2 => Ok(Self::Discard),
            3 => Ok(Self::HalfCycles),
            4 => Ok(Self::FullCycles),
            5 => Ok(Self::ClormannSeeger),
            6 => Ok(Self::Din45667),
            7 => Ok(Self::Repeated),
            _ => Err(RainflowError::InvalidResidualMethod(value)),
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ResidualMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Ignore => "ignore",
            Self::Discard => "discard",
            Self::HalfCycles => "halfcycles",
            Self::FullCycles => "fullcycles",
            Self::ClormannSeeger => "clormann-seeger",
            Self::Din45667 => "rp-din45667",
            Self::Repeated => "repeated",
        };
        write!(f, "{}", name)
    }
}

/// Serializable snapshot of the counting results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountingSummary {
    /// Accumulated pseudo damage.
    pub pseudo_damage: f64,
    /// Closed full-cycle equivalents (matrix total over the full-cycle
    /// increment).
    pub closed_cycles: f64,
    /// Open turning points left in the residue.
    pub residue_len: usize,
    /// Recorded turning points, when storage is enabled.
    pub turning_points: Option<usize>,
    /// Samples consumed.
    pub samples: u64,
}

/// Streaming rainflow counting context.
///
/// Exclusively owned by its caller; one engine per stream. All
/// operations are synchronous, there is no interior mutability.
#[derive(Debug, Clone)]
pub struct RainflowEngine {
    class_map: ClassMap,
    hysteresis: f64,
    flags: u32,
    counting_method: CountingMethod,
    wohler: WohlerCurve,
    spread_mode: SpreadMode,

    full_inc: u64,
    half_inc: u64,
    curr_inc: u64,

    state: State,
    /// 1-based position of the most recent sample.
    pos: u64,

    detector: TurningPointDetector,
    residue: Residue,
    hcm: HcmStack,

    matrix: RainflowMatrix,
    rp: Vec<u64>,
    lc: Vec<u64>,
    pseudo_damage: f64,

    tp_store: Option<TurningPointStore>,
    damage_history: Option<DamageHistory>,

    /// Margin delay stage (active with `ENFORCE_MARGIN` + storage).
    left_margin: Option<TurningPoint>,
    right_margin: Option<TurningPoint>,
    delayed: Option<TurningPoint>,
}

impl RainflowEngine {
    /// Create an engine for the given class partition and hysteresis.
    ///
    /// Preconditions: `1 < class_count <= 512`, `class_width > 0`.
    pub fn new(
        class_count: u32,
        class_width: f64,
        class_offset: f64,
        hysteresis: f64,
    ) -> RainflowResult<Self> {
        let class_map = ClassMap::new(class_count, class_width, class_offset)?;
        Ok(Self {
            class_map,
            hysteresis,
            flags: flags::COUNT_ALL,
            counting_method: CountingMethod::default(),
            wohler: WohlerCurve::default(),
            spread_mode: SpreadMode::Half23,
            full_inc: FULL_CYCLE_INCREMENT,
            half_inc: HALF_CYCLE_INCREMENT,
            curr_inc: FULL_CYCLE_INCREMENT,
            state: State::Init,
            pos: 0,
            detector: TurningPointDetector::new(hysteresis),
            residue: Residue::with_class_count(class_count),
            hcm: HcmStack::with_class_count(class_count),
            matrix: RainflowMatrix::new(class_count),
            rp: vec![0; class_count as usize],
            lc: vec![0; class_count as usize],
            pseudo_damage: 0.0,
            tp_store: None,
            damage_history: None,
            left_margin: None,
            right_margin: None,
            delayed: None,
        })
    }

    // --- configuration (rejected once finalization has begun) ---

    fn check_configurable(&self, op: &'static str) -> RainflowResult<()> {
        if self.state >= State::Finalize {
            return Err(RainflowError::InvalidState {
                op,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Replace the counting flags (see [`flags`]).
    pub fn set_flags(&mut self, flags: u32) -> RainflowResult<()> {
        self.check_configurable("set_flags")?;
        self.flags = flags;
        Ok(())
    }

    #[inline]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Select the cycle-extraction algorithm.
    pub fn set_counting_method(&mut self, method: CountingMethod) -> RainflowResult<()> {
        self.check_configurable("set_counting_method")?;
        self.counting_method = method;
        Ok(())
    }

    #[inline]
    pub fn counting_method(&self) -> CountingMethod {
        self.counting_method
    }

    /// Replace the Wöhler curve used for damage accumulation.
    pub fn set_wohler(&mut self, wohler: WohlerCurve) -> RainflowResult<()> {
        self.check_configurable("set_wohler")?;
        self.wohler = wohler;
        Ok(())
    }

    #[inline]
    pub fn wohler(&self) -> &WohlerCurve {
        &self.wohler
    }

    /// Enable the per-sample damage history with the given spread mode.
    pub fn set_spread_mode(&mut self, mode: SpreadMode) -> RainflowResult<()> {
        self.check_configurable("set_spread_mode")?;
        self.spread_mode = mode;
        let pos = self.pos;
        let dh = self.damage_history.get_or_insert_with(DamageHistory::new);
        if pos > 0 {
            if let Err(e) = dh.ensure_pos(pos) {
                self.state = State::Error;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Enable the append-only turning-point log.
    pub fn enable_turning_point_storage(&mut self, capacity: usize) -> RainflowResult<()> {
        self.check_configurable("enable_turning_point_storage")?;
        self.tp_store
            .get_or_insert_with(|| TurningPointStore::with_capacity(capacity));
        Ok(())
    }

    // --- ingestion ---

    fn check_feedable(&self, op: &'static str) -> RainflowResult<()> {
        if self.state >= State::Finalize {
            return Err(RainflowError::InvalidState {
                op,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Feed a block of samples; positions are assigned automatically,
    /// continuing the running 1-based sample count.
    pub fn feed(&mut self, values: &[Sample]) -> RainflowResult<()> {
        self.check_feedable("feed")?;
        for &v in values {
            self.pos += 1;
            let tp = TurningPoint::new(v, self.pos, self.class_map.quantize(v));
            self.feed_once(tp)?;
        }
        Ok(())
    }

    /// Feed samples carrying explicit 1-based positions. A position of
    /// zero is auto-assigned like [`feed`](Self::feed).
    pub fn feed_with_positions(&mut self, samples: &[(Sample, u64)]) -> RainflowResult<()> {
        self.check_feedable("feed_with_positions")?;
        for &(v, pos) in samples {
            let pos = if pos == 0 { self.pos + 1 } else { pos };
            self.pos = self.pos.max(pos);
            let tp = TurningPoint::new(v, pos, self.class_map.quantize(v));
            self.feed_once(tp)?;
        }
        Ok(())
    }

    /// Process one quantized sample: detector, margin delay stage,
    /// turning-point storage, cycle search.
    fn feed_once(&mut self, pt: TurningPoint) -> RainflowResult<()> {
        if let Some(dh) = self.damage_history.as_mut() {
            if let Err(e) = dh.ensure_pos(pt.pos) {
                self.state = State::Error;
                return Err(e);
            }
        }

        let confirmed = self.detector.advance(pt);
        self.state = if self.detector.has_interim() {
            State::BusyInterim
        } else {
            State::Busy
        };

        if let Some(tp) = confirmed {
            self.residue.push(tp);
        }

        // With margin enforcement the store trails the detector by one
        // turning point, so the right-margin sample can still override
        // the last one.
        let mut emitted = confirmed;
        if self.margin_active() {
            if pt.pos == 1 {
                self.left_margin = Some(pt);
                self.delayed = Some(pt);
                emitted = None;
            } else if let (Some(delayed), Some(tp)) = (self.delayed, emitted) {
                if delayed.value == tp.value {
                    emitted = None;
                }
            }
            if pt.pos > 1 {
                self.right_margin = Some(pt);
            }
            if let Some(tp) = emitted {
                emitted = self.delayed.replace(tp);
            }
        }

        if let Some(tp) = emitted {
            self.tp_add(tp)?;
            self.cycle_find();
        }
        Ok(())
    }

    fn margin_active(&self) -> bool {
        self.flags & flags::ENFORCE_MARGIN != 0
            && self.tp_store.as_ref().is_some_and(|s| !s.is_locked())
    }

    fn tp_add(&mut self, tp: TurningPoint) -> RainflowResult<()> {
        if let Some(store) = self.tp_store.as_mut() {
            if let Err(e) = store.add(tp) {
                self.state = State::Error;
                return Err(e);
            }
        }
        Ok(())
    }

    // --- cycle search ---

    fn cycle_find(&mut self) {
        match self.counting_method {
            CountingMethod::None => self.residue.clear(),
            CountingMethod::FourPointMethod => self.cycle_find_4ptm(),
            CountingMethod::Hcm => self.cycle_find_hcm(),
        }
    }

    /// Four-point method: close `B -> C` while the inner range of the
    /// last four residue points lies within the outer one.
    fn cycle_find_4ptm(&mut self) {
        while self.residue.len() >= 4 {
            let n = self.residue.len();
            let pts = self.residue.points();
            let (a, b, c, d) = (pts[n - 4], pts[n - 3], pts[n - 2], pts[n - 1]);

            let (inner_lo, inner_hi) = min_max(b.value, c.value);
            let (outer_lo, outer_hi) = min_max(a.value, d.value);

            if outer_lo <= inner_lo && inner_hi <= outer_hi {
                self.cycle_process(b, c, Some(d), self.flags);
                self.residue.remove(n - 3, 2);
            } else {
                break;
            }
        }
    }

    /// HCM: confirmed turning points migrate from the residue front
    /// onto the Clormann-Seeger stack, closing cycles on the way.
    fn cycle_find_hcm(&mut self) {
        while !self.residue.is_empty() {
            let k = self.residue.points()[0];
            let mut closed: Vec<(TurningPoint, TurningPoint)> = Vec::new();
            self.hcm.advance(k, |from, to| closed.push((from, to)));
            self.residue.remove(0, 1);
            for (from, to) in closed {
                self.cycle_process(from, to, None, self.flags);
            }
        }
    }

    /// Count one closing cycle into the enabled targets.
    fn cycle_process(
        &mut self,
        from: TurningPoint,
        to: TurningPoint,
        next: Option<TurningPoint>,
        cycle_flags: u32,
    ) {
        // Margin turning points may form excursions below the
        // hysteresis; those never count.
        if cycle_flags & flags::ENFORCE_MARGIN != 0
            && (to.value - from.value).abs() <= self.hysteresis
        {
            return;
        }

        debug_assert!(
            from.value > self.class_map.offset() && to.value > self.class_map.offset(),
            "sample value at or below the class offset"
        );

        let cf = self.class_map.clamped(from.value);
        let ct = self.class_map.clamped(to.value);
        if cf == ct {
            return;
        }

        if cycle_flags & flags::COUNT_DAMAGE != 0 {
            let range = self.class_map.width() * ct.abs_diff(cf) as f64;
            let damage = self.wohler.damage(range / 2.0) * self.curr_inc as f64
                / self.full_inc as f64;
            self.pseudo_damage += damage;
            if let Some(dh) = self.damage_history.as_mut() {
                dh.spread(
                    damage,
                    self.spread_mode,
                    from.pos,
                    to.pos,
                    next.map(|tp| tp.pos),
                );
            }
        }

        if cycle_flags & flags::COUNT_MATRIX != 0 {
            self.matrix.increment(cf, ct, self.curr_inc);
        }

        if cycle_flags & flags::COUNT_RP != 0 {
            let idx = ct.abs_diff(cf) as usize;
            debug_assert!(self.rp[idx] <= crate::histograms::COUNTS_LIMIT - self.curr_inc);
            self.rp[idx] += self.curr_inc;
        }

        if cf < ct && cycle_flags & flags::COUNT_LC_UP != 0 {
            for i in cf..ct {
                debug_assert!(self.lc[i as usize] <= crate::histograms::COUNTS_LIMIT - self.curr_inc);
                self.lc[i as usize] += self.curr_inc;
            }
        } else if ct < cf && cycle_flags & flags::COUNT_LC_DN != 0 {
            for i in ct..cf {
                debug_assert!(self.lc[i as usize] <= crate::histograms::COUNTS_LIMIT - self.curr_inc);
                self.lc[i as usize] += self.curr_inc;
            }
        }
    }

    // --- finalization ---

    /// Close the stream, applying the given residue policy. The engine
    /// ends in `Finished` (or `Error`); results are final.
    pub fn finalize(&mut self, method: ResidualMethod) -> RainflowResult<()> {
        if self.state >= State::Finalize {
            return Err(RainflowError::InvalidState {
                op: "finalize",
                state: self.state,
            });
        }
        tracing::debug!(
            method = %method,
            residue = self.residue.len(),
            samples = self.pos,
            "finalizing rainflow stream"
        );

        let result = match method {
            ResidualMethod::None | ResidualMethod::Ignore => self.feed_finalize(),
            ResidualMethod::Discard => self.finalize_discard(),
            ResidualMethod::HalfCycles => self.finalize_weight_cycles(self.half_inc),
            ResidualMethod::FullCycles => self.finalize_weight_cycles(self.full_inc),
            ResidualMethod::ClormannSeeger => self.finalize_clormann_seeger(),
            ResidualMethod::Din45667 => self.finalize_din45667(),
            ResidualMethod::Repeated => self.finalize_repeated(),
        };

        match result {
            Ok(()) => {
                self.state = State::Finished;
                Ok(())
            }
            Err(e) => {
                self.state = State::Error;
                Err(e)
            }
        }
    }

    /// Promote the interim turning point, settle the margin delay
    /// stage, run one last cycle search, lock the store, and under HCM
    /// hand the stack over as the final residue.
    fn feed_finalize(&mut self) -> RainflowResult<()> {
        if self.state >= State::Finalize {
            return Err(RainflowError::InvalidState {
                op: "finalize",
                state: self.state,
            });
        }

        let interim = self.detector.take_interim();
        if let Some(tp) = interim {
            self.residue.push(tp);
        }

        if self.margin_active() {
            let mut pending: Option<TurningPoint> = None;
            if self.left_margin.is_some() {
                if let Some(i) = interim {
                    if let Some(d) = self.delayed.take() {
                        self.tp_add(d)?;
                    }
                    pending = Some(i);
                } else {
                    pending = self.delayed.take();
                }
            }

            if let Some(right) = self.right_margin {
                if let Some(p) = pending {
                    // The right margin dominates only on an exact value
                    // match against a non-leading pending point.
                    if p.value == right.value && p.pos > 1 {
                        self.tp_add(right)?;
                    } else {
                        self.tp_add(p)?;
                        self.tp_add(right)?;
                    }
                }
            } else if let Some(p) = pending {
                self.tp_add(p)?;
            }
        } else if let Some(tp) = interim {
            self.tp_add(tp)?;
        }

        if interim.is_some() {
            self.cycle_find();
        }

        if let Some(store) = self.tp_store.as_mut() {
            store.lock();
        }

        if self.counting_method == CountingMethod::Hcm && !self.hcm.is_empty() {
            let stacked = self.hcm.drain();
            self.residue.replace(stacked);
        }

        self.state = State::Finalize;
        Ok(())
    }

    fn finalize_discard(&mut self) -> RainflowResult<()> {
        self.feed_finalize()?;
        self.residue.clear();
        Ok(())
    }

    /// Count every adjacent residue pair with the given weight, then
    /// drop the residue.
    fn weight_residue_cycles(&mut self, weight: u64) {
        if self.residue.len() >= 2 {
            let old_inc = self.curr_inc;
            self.curr_inc = weight;
            for i in 0..self.residue.len() - 1 {
                let from = self.residue.points()[i];
                let to = self.residue.points()[i + 1];
                let next = self.residue.get(i + 2).copied();
                self.cycle_process(from, to, next, self.flags);
            }
            self.curr_inc = old_inc;
        }
        self.residue.clear();
    }

    fn finalize_weight_cycles(&mut self, weight: u64) -> RainflowResult<()> {
        self.feed_finalize()?;
        self.weight_residue_cycles(weight);
        Ok(())
    }

    /// Clormann-Seeger counting correction on the residue, remainder
    /// as half cycles.
    fn finalize_clormann_seeger(&mut self) -> RainflowResult<()> {
        self.feed_finalize()?;

        if self.counting_method == CountingMethod::FourPointMethod {
            let mut i = 0;
            while i + 4 <= self.residue.len() {
                let pts = self.residue.points();
                let b = pts[i + 1];
                let c = pts[i + 2];
                let d = pts[i + 3];

                if b.value * c.value < 0.0
                    && d.value.abs() >= b.value.abs()
                    && b.value.abs() >= c.value.abs()
                {
                    self.cycle_process(b, c, Some(d), self.flags);
                    self.residue.remove(i + 1, 2);
                } else {
                    i += 1;
                }
            }
        }

        self.weight_residue_cycles(self.half_inc);
        Ok(())
    }

    /// DIN 45667: pair up adjacent slopes of equal magnitude and
    /// opposite sign; matched pairs count into range-pair and
    /// level-crossing only, every left-hand slope into level-crossing.
    fn finalize_din45667(&mut self) -> RainflowResult<()> {
        self.feed_finalize()?;

        if self.flags & (flags::COUNT_RP | flags::COUNT_LC) != 0 {
            while self.residue.len() >= 2 {
                let pts = self.residue.points();
                let from_i = pts[0];
                let to_i = pts[1];
                let srange_i = self.class_map.quantize(to_i.value) as i64
                    - self.class_map.quantize(from_i.value) as i64;

                let mut j = 1;
                while j + 1 < self.residue.len() {
                    let pts = self.residue.points();
                    let from_j = pts[j];
                    let to_j = pts[j + 1];
                    let next = pts.get(j + 2).copied();
                    let srange_j = self.class_map.quantize(to_j.value) as i64
                        - self.class_map.quantize(from_j.value) as i64;

                    if srange_i == -srange_j {
                        let masked = self.flags & (flags::COUNT_LC | flags::COUNT_RP);
                        self.cycle_process(from_j, to_j, next, masked);
                        self.residue.remove(j, 2);
                    } else {
                        j += 2;
                    }
                }

                self.cycle_process(from_i, to_i, None, self.flags & flags::COUNT_LC);
                self.residue.remove(0, 1);
            }
        }

        self.residue.clear();
        Ok(())
    }

    /// Marsh's repeated-residue method: feed the residue (with its
    /// interim point) once more as if the stream repeated, then keep
    /// nothing.
    fn finalize_repeated(&mut self) -> RainflowResult<()> {
        if !self.residue.is_empty() {
            let mut replay: Vec<TurningPoint> = Vec::new();
            replay
                .try_reserve(self.residue.len() + 1)
                .map_err(|_| RainflowError::OutOfMemory {
                    what: "residue replay",
                })?;
            replay.extend_from_slice(self.residue.points());
            if let Some(interim) = self.detector.interim() {
                replay.push(*interim);
            }

            tracing::debug!(points = replay.len(), "re-feeding residue");
            for tp in replay {
                self.feed_once(tp)?;
            }
        }
        self.feed_finalize()?;
        self.residue.clear();
        Ok(())
    }

    // --- results ---

    /// Accumulated pseudo damage.
    #[inline]
    pub fn pseudo_damage(&self) -> f64 {
        self.pseudo_damage
    }

    /// Turning points not consumed by any closed cycle.
    #[inline]
    pub fn residue(&self) -> &[TurningPoint] {
        self.residue.points()
    }

    /// Rainflow matrix, row-major from x to, in increment units.
    #[inline]
    pub fn matrix(&self) -> &RainflowMatrix {
        &self.matrix
    }

    /// Range-pair histogram indexed by class distance.
    #[inline]
    pub fn range_pairs(&self) -> &[u64] {
        &self.rp
    }

    /// Level-crossing histogram; index `k` counts crossings of the
    /// upper boundary of class `k`.
    #[inline]
    pub fn level_crossings(&self) -> &[u64] {
        &self.lc
    }

    /// Recorded turning points, when storage is enabled.
    pub fn turning_points(&self) -> Option<&[TurningPoint]> {
        self.tp_store.as_ref().map(|s| s.points())
    }

    /// Per-sample damage history, when enabled; one entry per fed
    /// sample position.
    pub fn damage_history(&self) -> Option<&[f64]> {
        self.damage_history.as_ref().map(|dh| {
            let n = dh.as_slice().len().min(self.pos as usize);
            &dh.as_slice()[..n]
        })
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn class_map(&self) -> &ClassMap {
        &self.class_map
    }

    #[inline]
    pub fn hysteresis(&self) -> f64 {
        self.hysteresis
    }

    #[inline]
    pub fn full_increment(&self) -> u64 {
        self.full_inc
    }

    #[inline]
    pub fn half_increment(&self) -> u64 {
        self.half_inc
    }

    /// Samples consumed so far.
    #[inline]
    pub fn samples(&self) -> u64 {
        self.pos
    }

    /// Snapshot of the result totals.
    pub fn summary(&self) -> CountingSummary {
        CountingSummary {
            pseudo_damage: self.pseudo_damage,
            closed_cycles: self.matrix.total() as f64 / self.full_inc as f64,
            residue_len: self.residue.len(),
            turning_points: self.tp_store.as_ref().map(|s| s.len()),
            samples: self.pos,
        }
    }

    /// Replay the recorded turning points as a fresh stream, optionally
    /// under new class parameters. Counting state is reset first; the
    /// replayed points get consecutive positions and are re-quantized,
    /// so a recount with a different partition needs no access to the
    /// original samples.
    pub fn refeed(&mut self, new_class_map: Option<ClassMap>) -> RainflowResult<()> {
        let Some(store) = self.tp_store.as_mut() else {
            return Err(RainflowError::StorageDisabled);
        };
        let points = store.take();
        self.reset();

        if let Some(map) = new_class_map {
            if map.count() != self.class_map.count() {
                self.residue = Residue::with_class_count(map.count());
                self.hcm = HcmStack::with_class_count(map.count());
                self.matrix = RainflowMatrix::new(map.count());
                self.rp = vec![0; map.count() as usize];
                self.lc = vec![0; map.count() as usize];
            }
            self.class_map = map;
        }

        tracing::debug!(points = points.len(), "re-feeding turning point log");
        for (i, tp) in points.iter().enumerate() {
            self.pos = i as u64 + 1;
            let tp = TurningPoint::new(tp.value, self.pos, self.class_map.quantize(tp.value));
            self.feed_once(tp)?;
        }
        Ok(())
    }

    /// Zero all counting state while retaining allocations, class
    /// parameters, Wöhler parameters and configuration. The engine
    /// returns to `Init` and accepts a fresh stream.
    pub fn reset(&mut self) {
        self.matrix.clear();
        self.rp.fill(0);
        self.lc.fill(0);
        self.pseudo_damage = 0.0;
        self.residue.clear();
        self.detector.reset();
        self.hcm.reset();
        self.pos = 0;
        self.curr_inc = self.full_inc;
        self.left_margin = None;
        self.right_margin = None;
        self.delayed = None;
        if let Some(store) = self.tp_store.as_mut() {
            store.clear();
        }
        if let Some(dh) = self.damage_history.as_mut() {
            dh.clear();
        }
        self.state = State::Init;
    }
}

#[inline]
fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a < b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Siemens knowledge-base example series; every sample is a turning
    /// point under unit hysteresis.
    const SIEMENS: [f64; 19] = [
        2.0, 5.0, 3.0, 6.0, 2.0, 4.0, 1.0, 6.0, 1.0, 4.0, 1.0, 5.0, 3.0, 6.0, 3.0, 6.0, 1.0,
        5.0, 2.0,
    ];

    /// Engine over classes centered on integer values 1..=count.
    fn unit_engine(count: u32) -> RainflowEngine {
        RainflowEngine::new(count, 1.0, 0.5, 1.0).unwrap()
    }

    fn residue_values(engine: &RainflowEngine) -> Vec<f64> {
        engine.residue().iter().map(|tp| tp.value).collect()
    }

    #[test]
    fn test_empty_stream() {
        let mut engine = unit_engine(4);
        engine.feed(&[]).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();
        assert_eq!(engine.state(), State::Finished);
        assert_eq!(engine.matrix().total(), 0);
        assert!(engine.residue().is_empty());
        assert_eq!(engine.pseudo_damage(), 0.0);
    }

    #[test]
    fn test_one_cycle_up() {
        // Narrow classes so the inner 3 -> 2 reversal clears the
        // hysteresis.
        let mut engine = RainflowEngine::new(4, 0.875, 0.5, 0.875).unwrap();
        engine.feed(&[1.0, 3.0, 2.0, 4.0]).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();

        assert_eq!(engine.matrix().at(2, 1), FULL_CYCLE_INCREMENT);
        assert_eq!(engine.matrix().total(), FULL_CYCLE_INCREMENT);
        assert_eq!(residue_values(&engine), [1.0, 4.0]);
        let positions: Vec<u64> = engine.residue().iter().map(|tp| tp.pos).collect();
        assert_eq!(positions, [1, 4]);
    }

    #[test]
    fn test_one_cycle_down() {
        let mut engine = RainflowEngine::new(4, 0.875, 0.5, 0.875).unwrap();
        engine.feed(&[4.0, 2.0, 3.0, 1.0]).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();

        assert_eq!(engine.matrix().at(1, 2), FULL_CYCLE_INCREMENT);
        assert_eq!(engine.matrix().total(), FULL_CYCLE_INCREMENT);
        assert_eq!(residue_values(&engine), [4.0, 1.0]);
    }

    #[test]
    fn test_siemens_example() {
        let mut engine = unit_engine(6);
        engine.feed(&SIEMENS).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();

        let full = FULL_CYCLE_INCREMENT;
        let m = engine.matrix();
        assert_eq!(m.total(), 7 * full);
        // Classes are value - 1 here; entries quoted from / to by value.
        assert_eq!(m.at(4, 2), 2 * full); // 5 -> 3, twice
        assert_eq!(m.at(5, 2), full); // 6 -> 3
        assert_eq!(m.at(0, 3), full); // 1 -> 4
        assert_eq!(m.at(1, 3), full); // 2 -> 4
        assert_eq!(m.at(0, 5), 2 * full); // 1 -> 6, twice
        assert_eq!(residue_values(&engine), [2.0, 6.0, 1.0, 5.0, 2.0]);

        // Histograms agree with their matrix derivations.
        assert_eq!(engine.range_pairs(), m.range_pairs().as_slice());
        assert_eq!(
            engine.level_crossings(),
            m.level_crossings(true, true).as_slice()
        );
        assert_eq!(engine.range_pairs()[2], 3 * full);
        assert_eq!(engine.range_pairs()[3], 2 * full);
        assert_eq!(engine.range_pairs()[5], 2 * full);
        assert!(engine.pseudo_damage() > 0.0);
    }

    #[test]
    fn test_chunking_invariance() {
        let mut whole = unit_engine(6);
        whole.feed(&SIEMENS).unwrap();
        whole.finalize(ResidualMethod::None).unwrap();

        for split in 1..SIEMENS.len() {
            let mut chunked = unit_engine(6);
            chunked.feed(&SIEMENS[..split]).unwrap();
            chunked.feed(&SIEMENS[split..]).unwrap();
            chunked.finalize(ResidualMethod::None).unwrap();

            assert_eq!(chunked.matrix(), whole.matrix(), "split at {}", split);
            assert_eq!(chunked.range_pairs(), whole.range_pairs());
            assert_eq!(chunked.level_crossings(), whole.level_crossings());
            assert_eq!(chunked.residue(), whole.residue());
            assert_eq!(
                chunked.pseudo_damage().to_bits(),
                whole.pseudo_damage().to_bits()
            );
        }
    }

    #[test]
    fn test_turning_point_log() {
        let mut engine = RainflowEngine::new(10, 1.0, 0.0, 1.0).unwrap();
        engine.enable_turning_point_storage(16).unwrap();
        engine
            .feed(&[1.0, 1.1, 1.2, 2.0, 2.1, 1.1, 1.3, 1.0, 1.98, 1.0])
            .unwrap();
        engine.finalize(ResidualMethod::None).unwrap();

        let tps: Vec<(f64, u64)> = engine
            .turning_points()
            .unwrap()
            .iter()
            .map(|tp| (tp.value, tp.pos))
            .collect();
        assert_eq!(tps, [(1.0, 1), (2.1, 5), (1.0, 8)]);
        let residue: Vec<(f64, u64)> = engine
            .residue()
            .iter()
            .map(|tp| (tp.value, tp.pos))
            .collect();
        assert_eq!(residue, [(1.0, 1), (2.1, 5), (1.0, 8)]);
    }

    #[test]
    fn test_series_within_hysteresis_band() {
        let mut engine = RainflowEngine::new(10, 1.0, 0.0, 1.0).unwrap();
        engine.enable_turning_point_storage(16).unwrap();
        engine
            .feed(&[1.0, 1.1, 1.2, 1.1, 1.3, 1.0, 1.98, 1.0])
            .unwrap();
        engine.finalize(ResidualMethod::None).unwrap();
        assert!(engine.turning_points().unwrap().is_empty());
        assert!(engine.residue().is_empty());
    }

    #[test]
    fn test_margin_constant_series() {
        let mut engine = RainflowEngine::new(4, 1.0, -0.5, 1.0).unwrap();
        engine.enable_turning_point_storage(16).unwrap();
        engine
            .set_flags(flags::COUNT_ALL | flags::ENFORCE_MARGIN)
            .unwrap();
        engine.feed(&[0.0, 0.0, 1.0, 1.0]).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();

        let tps: Vec<(f64, u64)> = engine
            .turning_points()
            .unwrap()
            .iter()
            .map(|tp| (tp.value, tp.pos))
            .collect();
        assert_eq!(tps, [(0.0, 1), (1.0, 4)]);
        assert!(engine.residue().is_empty());
        assert_eq!(engine.matrix().total(), 0);
    }

    #[test]
    fn test_margin_single_and_two_samples() {
        let mut engine = RainflowEngine::new(10, 1.0, 0.0, 1.0).unwrap();
        engine.enable_turning_point_storage(16).unwrap();
        engine
            .set_flags(flags::COUNT_ALL | flags::ENFORCE_MARGIN)
            .unwrap();
        engine.feed(&[0.5]).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();
        let tps = engine.turning_points().unwrap();
        assert_eq!(tps.len(), 1);
        assert_eq!((tps[0].value, tps[0].pos), (0.5, 1));

        let mut engine = RainflowEngine::new(10, 1.0, 0.0, 1.0).unwrap();
        engine.enable_turning_point_storage(16).unwrap();
        engine
            .set_flags(flags::COUNT_ALL | flags::ENFORCE_MARGIN)
            .unwrap();
        engine.feed(&[0.5, 0.6]).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();
        let tps: Vec<(f64, u64)> = engine
            .turning_points()
            .unwrap()
            .iter()
            .map(|tp| (tp.value, tp.pos))
            .collect();
        assert_eq!(tps, [(0.5, 1), (0.6, 2)]);
    }

    #[test]
    fn test_margin_right_margin_dominates() {
        // Interim turning point and right margin share the value; the
        // store records the margin position, the residue the original.
        let mut engine = RainflowEngine::new(10, 1.0, 0.0, 1.0).unwrap();
        engine.enable_turning_point_storage(16).unwrap();
        engine
            .set_flags(flags::COUNT_ALL | flags::ENFORCE_MARGIN)
            .unwrap();
        engine.feed(&[1.0, 1.0, 2.1, 2.1, 1.0, 1.0]).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();

        let tps: Vec<(f64, u64)> = engine
            .turning_points()
            .unwrap()
            .iter()
            .map(|tp| (tp.value, tp.pos))
            .collect();
        assert_eq!(tps, [(1.0, 1), (2.1, 3), (1.0, 6)]);
        let residue: Vec<(f64, u64)> = engine
            .residue()
            .iter()
            .map(|tp| (tp.value, tp.pos))
            .collect();
        assert_eq!(residue, [(1.0, 1), (2.1, 3), (1.0, 5)]);
    }

    #[test]
    fn test_residue_discard() {
        let mut engine = RainflowEngine::new(4, 0.875, 0.5, 0.875).unwrap();
        engine.feed(&[1.0, 3.0, 2.0, 4.0]).unwrap();
        engine.finalize(ResidualMethod::Discard).unwrap();
        assert!(engine.residue().is_empty());
        assert_eq!(engine.matrix().total(), FULL_CYCLE_INCREMENT);
    }

    #[test]
    fn test_residue_half_and_full_cycles() {
        for (method, weight) in [
            (ResidualMethod::HalfCycles, HALF_CYCLE_INCREMENT),
            (ResidualMethod::FullCycles, FULL_CYCLE_INCREMENT),
        ] {
            let mut engine = RainflowEngine::new(4, 0.875, 0.5, 0.875).unwrap();
            engine.feed(&[1.0, 3.0, 2.0, 4.0]).unwrap();
            engine.finalize(method).unwrap();

            // Closed cycle 3 -> 2 plus the weighted residue pair 1 -> 4.
            assert_eq!(engine.matrix().at(2, 1), FULL_CYCLE_INCREMENT);
            assert_eq!(engine.matrix().at(0, 3), weight);
            assert!(engine.residue().is_empty());
        }
    }

    #[test]
    fn test_residue_repeated() {
        let mut engine = RainflowEngine::new(4, 0.875, 0.5, 0.875).unwrap();
        engine.feed(&[1.0, 3.0, 2.0, 4.0]).unwrap();
        engine.finalize(ResidualMethod::Repeated).unwrap();

        // Repetition closes 3 -> 2 twice and the outer 4 -> 1 once.
        assert_eq!(engine.matrix().at(2, 1), 2 * FULL_CYCLE_INCREMENT);
        assert_eq!(engine.matrix().at(3, 0), FULL_CYCLE_INCREMENT);
        assert_eq!(engine.matrix().total(), 3 * FULL_CYCLE_INCREMENT);
        assert!(engine.residue().is_empty());
    }

    #[test]
    fn test_repeated_on_residue_free_stream_is_noop() {
        let mut engine = unit_engine(4);
        engine.finalize(ResidualMethod::Repeated).unwrap();
        assert_eq!(engine.state(), State::Finished);
        assert_eq!(engine.matrix().total(), 0);
        assert_eq!(engine.pseudo_damage(), 0.0);
        assert!(engine.residue().is_empty());
    }

    #[test]
    fn test_residue_clormann_seeger() {
        let mut engine = RainflowEngine::new(8, 1.0, -4.5, 1.0).unwrap();
        engine.feed(&[1.0, -3.0, 2.0, -4.0]).unwrap();
        engine.finalize(ResidualMethod::ClormannSeeger).unwrap();

        // Quadruple (1, -3, 2, -4): B*C < 0, |D| >= |B| >= |C| closes
        // -3 -> 2 as a full cycle; the rest (1, -4) counts half.
        assert_eq!(engine.matrix().at(1, 6), FULL_CYCLE_INCREMENT);
        assert_eq!(engine.matrix().at(5, 0), HALF_CYCLE_INCREMENT);
        assert_eq!(engine.range_pairs()[5], FULL_CYCLE_INCREMENT + HALF_CYCLE_INCREMENT);
        assert!(engine.residue().is_empty());
    }

    #[test]
    fn test_residue_din45667() {
        let mut engine = unit_engine(6);
        engine.feed(&[1.0, 5.0, 1.02]).unwrap();
        engine.finalize(ResidualMethod::Din45667).unwrap();

        // Slopes +4 and -4 pair up: range-pair and level crossings
        // count, matrix and damage stay untouched.
        assert_eq!(engine.matrix().total(), 0);
        assert_eq!(engine.pseudo_damage(), 0.0);
        assert_eq!(engine.range_pairs()[4], FULL_CYCLE_INCREMENT);
        assert_eq!(engine.level_crossings()[..4], [4, 4, 4, 4]);
        assert_eq!(engine.level_crossings()[4], 0);
        assert!(engine.residue().is_empty());
    }

    #[test]
    fn test_hcm_engine() {
        let mut engine = RainflowEngine::new(4, 0.875, 0.5, 0.875).unwrap();
        engine.set_counting_method(CountingMethod::Hcm).unwrap();
        engine.feed(&[1.0, 3.0, 2.0, 4.0]).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();

        assert_eq!(engine.matrix().at(2, 1), FULL_CYCLE_INCREMENT);
        assert_eq!(engine.matrix().total(), FULL_CYCLE_INCREMENT);
        assert_eq!(residue_values(&engine), [1.0, 4.0]);
    }

    #[test]
    fn test_counting_method_none_keeps_turning_points_only() {
        let mut engine = unit_engine(6);
        engine.set_counting_method(CountingMethod::None).unwrap();
        engine.enable_turning_point_storage(32).unwrap();
        engine.feed(&SIEMENS).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();

        assert_eq!(engine.matrix().total(), 0);
        assert_eq!(engine.pseudo_damage(), 0.0);
        assert!(engine.residue().is_empty());
        assert_eq!(engine.turning_points().unwrap().len(), SIEMENS.len());
    }

    #[test]
    fn test_flag_subsets() {
        let mut engine = unit_engine(6);
        engine.set_flags(flags::COUNT_RP).unwrap();
        engine.feed(&SIEMENS).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();

        assert_eq!(engine.matrix().total(), 0);
        assert!(engine.level_crossings().iter().all(|&c| c == 0));
        assert_eq!(engine.pseudo_damage(), 0.0);
        assert!(engine.range_pairs().iter().any(|&c| c > 0));
    }

    #[test]
    fn test_damage_single_cycle_formula() {
        // One closed cycle spanning two classes of width 2000:
        // amplitude 2000 above SD = 1000 gives D = 2^5 / 1e7.
        let mut engine = RainflowEngine::new(4, 2000.0, -4500.0, 2000.0).unwrap();
        engine
            .feed(&[-3500.0, 3000.0, -1000.0, 3400.0])
            .unwrap();
        engine.finalize(ResidualMethod::None).unwrap();

        assert_eq!(engine.matrix().at(3, 1), FULL_CYCLE_INCREMENT);
        assert_relative_eq!(engine.pseudo_damage(), 32.0 / 1e7, max_relative = 1e-12);
    }

    #[test]
    fn test_damage_omission() {
        let mut engine = RainflowEngine::new(4, 2000.0, -4500.0, 2000.0).unwrap();
        engine
            .set_wohler(WohlerCurve::builder().omission(2000.0).build())
            .unwrap();
        engine
            .feed(&[-3500.0, 3000.0, -1000.0, 3400.0])
            .unwrap();
        engine.finalize(ResidualMethod::None).unwrap();
        assert_eq!(engine.matrix().total(), FULL_CYCLE_INCREMENT);
        assert_eq!(engine.pseudo_damage(), 0.0);
    }

    #[test]
    fn test_damage_history_matches_pseudo_damage() {
        for mode in [
            SpreadMode::Half23,
            SpreadMode::RampAmplitude23,
            SpreadMode::Transient23,
            SpreadMode::Transient23c,
        ] {
            let mut engine = unit_engine(6);
            engine.set_spread_mode(mode).unwrap();
            engine.feed(&SIEMENS).unwrap();
            engine.finalize(ResidualMethod::FullCycles).unwrap();

            let history = engine.damage_history().unwrap();
            assert_eq!(history.len(), SIEMENS.len());
            let total: f64 = history.iter().sum();
            assert_relative_eq!(total, engine.pseudo_damage(), max_relative = 1e-10);
            assert!(engine.pseudo_damage() > 0.0);
        }
    }

    #[test]
    fn test_reset_then_refeed_is_identical() {
        let mut engine = unit_engine(6);
        engine.feed(&SIEMENS).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();
        let matrix = engine.matrix().clone();
        let residue = engine.residue().to_vec();
        let damage = engine.pseudo_damage();

        engine.reset();
        assert_eq!(engine.state(), State::Init);
        assert_eq!(engine.matrix().total(), 0);

        engine.feed(&SIEMENS).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();
        assert_eq!(engine.matrix(), &matrix);
        assert_eq!(engine.residue(), residue.as_slice());
        assert_eq!(engine.pseudo_damage().to_bits(), damage.to_bits());
    }

    #[test]
    fn test_lifecycle_guards() {
        let mut engine = unit_engine(4);
        engine.feed(&[1.0, 3.0]).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();

        assert!(matches!(
            engine.feed(&[1.0]),
            Err(RainflowError::InvalidState { op: "feed", .. })
        ));
        assert!(matches!(
            engine.finalize(ResidualMethod::None),
            Err(RainflowError::InvalidState { .. })
        ));
        assert!(engine.set_flags(flags::COUNT_RP).is_err());
        assert!(engine
            .set_counting_method(CountingMethod::Hcm)
            .is_err());
        assert_eq!(engine.state(), State::Finished);
    }

    #[test]
    fn test_feed_with_positions() {
        let mut auto = RainflowEngine::new(4, 0.875, 0.5, 0.875).unwrap();
        auto.feed(&[1.0, 3.0, 2.0, 4.0]).unwrap();
        auto.finalize(ResidualMethod::None).unwrap();

        let mut explicit = RainflowEngine::new(4, 0.875, 0.5, 0.875).unwrap();
        explicit
            .feed_with_positions(&[(1.0, 1), (3.0, 2), (2.0, 3), (4.0, 4)])
            .unwrap();
        explicit.finalize(ResidualMethod::None).unwrap();

        assert_eq!(auto.matrix(), explicit.matrix());
        assert_eq!(auto.residue(), explicit.residue());
        assert_eq!(explicit.samples(), 4);
    }

    #[test]
    fn test_counter_monotonicity() {
        let mut engine = unit_engine(6);
        let mut last_total = 0;
        for &v in &SIEMENS {
            engine.feed(&[v]).unwrap();
            let total = engine.matrix().total();
            assert!(total >= last_total);
            last_total = total;
            assert!(engine.residue.is_alternating());
        }
    }

    #[test]
    fn test_long_random_series_invariants() {
        let mut rng = StdRng::seed_from_u64(42);
        let series: Vec<f64> = (0..3000).map(|_| rng.gen_range(-2000.0..2900.0)).collect();

        let build = || {
            let mut engine = RainflowEngine::new(100, 50.0, -2025.0, 50.0).unwrap();
            engine.enable_turning_point_storage(1024).unwrap();
            engine
                .set_flags(flags::COUNT_ALL | flags::ENFORCE_MARGIN)
                .unwrap();
            engine.set_spread_mode(SpreadMode::RampAmplitude23).unwrap();
            engine
        };

        let mut whole = build();
        whole.feed(&series).unwrap();
        whole.finalize(ResidualMethod::None).unwrap();

        for chunk_size in [7usize, 64, 1000] {
            let mut chunked = build();
            for chunk in series.chunks(chunk_size) {
                chunked.feed(chunk).unwrap();
            }
            chunked.finalize(ResidualMethod::None).unwrap();

            assert_eq!(chunked.matrix(), whole.matrix());
            assert_eq!(chunked.residue(), whole.residue());
            assert_eq!(chunked.turning_points(), whole.turning_points());
            assert_eq!(
                chunked.pseudo_damage().to_bits(),
                whole.pseudo_damage().to_bits()
            );
        }

        assert!(whole.residue.is_alternating());
        let history_total: f64 = whole.damage_history().unwrap().iter().sum();
        assert_relative_eq!(history_total, whole.pseudo_damage(), max_relative = 1e-10);
        assert!(whole.matrix().total() > 0);
    }

    #[test]
    fn test_refeed_turning_point_log() {
        let mut engine = unit_engine(6);
        engine.enable_turning_point_storage(32).unwrap();
        engine.feed(&SIEMENS).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();
        let matrix = engine.matrix().clone();
        let residue = engine.residue().to_vec();

        // Every sample of the series is a turning point, so replaying
        // the log reproduces the original counting.
        engine.refeed(None).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();
        assert_eq!(engine.matrix(), &matrix);
        assert_eq!(engine.residue(), residue.as_slice());
        assert_eq!(engine.turning_points().unwrap().len(), SIEMENS.len());
    }

    #[test]
    fn test_refeed_with_new_class_map() {
        let mut engine = unit_engine(6);
        engine.enable_turning_point_storage(32).unwrap();
        engine.feed(&SIEMENS).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();

        // Recount on a coarser partition without the original samples.
        engine
            .refeed(Some(ClassMap::new(3, 2.0, 0.5).unwrap()))
            .unwrap();
        engine.finalize(ResidualMethod::None).unwrap();
        assert_eq!(engine.class_map().count(), 3);
        assert_eq!(engine.matrix().class_count(), 3);
        assert!(engine.matrix().total() > 0);

        let mut plain = unit_engine(4);
        assert!(matches!(
            plain.refeed(None),
            Err(RainflowError::StorageDisabled)
        ));
    }

    #[test]
    fn test_method_codes() {
        assert_eq!(ResidualMethod::from_u8(6).unwrap(), ResidualMethod::Din45667);
        assert_eq!(ResidualMethod::Repeated.value(), 7);
        assert!(ResidualMethod::from_u8(8).is_err());
        assert_eq!(
            CountingMethod::from_u8(1).unwrap(),
            CountingMethod::FourPointMethod
        );
        assert!(CountingMethod::from_u8(3).is_err());
    }

    #[test]
    fn test_summary() {
        let mut engine = unit_engine(6);
        engine.feed(&SIEMENS).unwrap();
        engine.finalize(ResidualMethod::None).unwrap();
        let summary = engine.summary();
        assert_eq!(summary.closed_cycles, 7.0);
        assert_eq!(summary.residue_len, 5);
        assert_eq!(summary.samples, 19);
        assert!(summary.turning_points.is_none());
    }
}
