//! Damage history — per-sample damage attribution
//!
//! Optionally distributes each closed cycle's pseudo damage over the
//! sample positions it spans, producing a damage-over-time vector
//! aligned with the input stream. The vector grows in fixed increments
//! as the stream advances. Whatever the spread mode, the distributed
//! weights sum to the exact cycle damage, so the history total always
//! matches the accumulated pseudo damage.

use crate::types::{RainflowError, RainflowResult};
use serde::{Deserialize, Serialize};

/// Growth increment for the per-sample vector.
const GROWTH_INCREMENT: usize = 1024;

/// How a cycle's damage is distributed over sample positions.
///
/// "2" and "3" refer to the cycle's two inner turning points (`from`
/// and `to`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadMode {
    /// Half the damage on the `from` sample, half on the `to` sample.
    Half23,
    /// Linear ramp over `(from, to]`, weight growing with the excursion
    /// amplitude.
    RampAmplitude23,
    /// Uniform over `(from, to]`.
    Transient23,
    /// Uniform over `(from, next]`, covering the samples up to the next
    /// turning point; falls back to `to` when there is none.
    Transient23c,
}

/// Per-sample damage accumulator.
#[derive(Debug, Clone, Default)]
pub struct DamageHistory {
    per_sample: Vec<f64>,
}

impl DamageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure positions `1..=pos` are backed; grows in fixed
    /// increments.
    pub fn ensure_pos(&mut self, pos: u64) -> RainflowResult<()> {
        let needed = pos as usize;
        if needed > self.per_sample.len() {
            let target = needed.div_ceil(GROWTH_INCREMENT) * GROWTH_INCREMENT;
            self.per_sample
                .try_reserve(target - self.per_sample.len())
                .map_err(|_| RainflowError::OutOfMemory {
                    what: "damage history",
                })?;
            self.per_sample.resize(target, 0.0);
        }
        Ok(())
    }

    /// Distribute `damage` according to `mode` over the cycle spanning
    /// 1-based positions `from_pos..to_pos`, with `next_pos` the
    /// position of the turning point after the cycle, if any.
    pub fn spread(
        &mut self,
        damage: f64,
        mode: SpreadMode,
        from_pos: u64,
        to_pos: u64,
        next_pos: Option<u64>,
    ) {
        if damage == 0.0 {
            return;
        }
        match mode {
            SpreadMode::Half23 => {
                self.add(from_pos, damage * 0.5);
                self.add(to_pos, damage * 0.5);
            }
            SpreadMode::RampAmplitude23 => self.ramp(damage, from_pos, to_pos),
            SpreadMode::Transient23 => self.uniform(damage, from_pos, to_pos),
            SpreadMode::Transient23c => {
                let end = next_pos.unwrap_or(to_pos).max(to_pos);
                self.uniform(damage, from_pos, end);
            }
        }
    }

    fn add(&mut self, pos: u64, damage: f64) {
        let idx = pos.saturating_sub(1) as usize;
        debug_assert!(idx < self.per_sample.len(), "damage position out of range");
        if let Some(cell) = self.per_sample.get_mut(idx) {
            *cell += damage;
        }
    }

    /// Linearly growing weights over `(from, to]`, normalized to sum to
    /// `damage`.
    fn ramp(&mut self, damage: f64, from_pos: u64, to_pos: u64) {
        if to_pos <= from_pos {
            self.add(to_pos, damage);
            return;
        }
        let span = to_pos - from_pos;
        let norm = (span * (span + 1) / 2) as f64;
        for step in 1..=span {
            self.add(from_pos + step, damage * step as f64 / norm);
        }
    }

    /// Equal weights over `(from, to]`.
    fn uniform(&mut self, damage: f64, from_pos: u64, to_pos: u64) {
        if to_pos <= from_pos {
            self.add(to_pos, damage);
            return;
        }
        let span = to_pos - from_pos;
        let share = damage / span as f64;
        for step in 1..=span {
            self.add(from_pos + step, share);
        }
    }

    /// Accumulated damage per sample position (index 0 is position 1).
    pub fn as_slice(&self) -> &[f64] {
        &self.per_sample
    }

    /// Sum over all samples.
    pub fn total(&self) -> f64 {
        self.per_sample.iter().sum()
    }

    /// Empty the history, retaining the allocation.
    pub fn clear(&mut self) {
        self.per_sample.clear();
    }
}
