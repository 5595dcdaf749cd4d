//! Rainflow matrix and histogram storage
//!
//! Dense `count x count` from/to cycle matrix in row-major order plus
//! derivations of the range-pair and level-crossing histograms from it.
//! Counts are kept in `u64` cells in units of the configured cycle
//! increment (full cycle = 2 by convention), so half cycles stay
//! integral. Cells must stay at or below [`COUNTS_LIMIT`]; exceeding it
//! is a caller precondition violation, checked with debug assertions
//! rather than silent wrapping.
//!
//! ```text
//!            t o
//!      +-------------
//!      | 0 1 2 3 4 5
//!    f | 6 7 8 9 . .
//!    r | . . . . . .
//!    o | . . . . . .
//!    m | . . . . . .
//! ```
//!
//! ## Example
//!
//! ```rust
//! use rainflow_core::histograms::RainflowMatrix;
//!
//! let mut m = RainflowMatrix::new(6);
//! m.increment(4, 2, 2); // one full cycle, class 4 -> class 2
//! assert_eq!(m.at(4, 2), 2);
//! assert_eq!(m.range_pairs()[2], 2);
//! ```

use serde::{Deserialize, Serialize};

/// Documented ceiling for a single histogram cell.
pub const COUNTS_LIMIT: u64 = 4_294_967_295;

/// Dense from/to rainflow matrix, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainflowMatrix {
    count: u32,
    data: Vec<u64>,
}

impl RainflowMatrix {
    /// Create a zeroed `count x count` matrix.
    pub fn new(count: u32) -> Self {
        Self {
            count,
            data: vec![0; count as usize * count as usize],
        }
    }

    /// Class count (matrix dimension).
    #[inline]
    pub fn class_count(&self) -> u32 {
        self.count
    }

    /// Cell value for the directed cycle `from -> to`.
    #[inline]
    pub fn at(&self, from: u32, to: u32) -> u64 {
        self.data[from as usize * self.count as usize + to as usize]
    }

    /// Add `inc` counts to the directed cycle `from -> to`.
    #[inline]
    pub fn increment(&mut self, from: u32, to: u32, inc: u64) {
        let cell = &mut self.data[from as usize * self.count as usize + to as usize];
        debug_assert!(*cell <= COUNTS_LIMIT - inc, "rainflow matrix cell overflow");
        *cell += inc;
    }

    /// Row-major backing storage.
    #[inline]
    pub fn as_slice(&self) -> &[u64] {
        &self.data
    }

    /// Sum of all cells.
    pub fn total(&self) -> u64 {
        self.data.iter().sum()
    }

    /// Zero all cells, retaining the allocation.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Range-pair histogram recomputed from the matrix: index `r` sums
    /// both directions of all cycles with `|to - from| == r`.
    pub fn range_pairs(&self) -> Vec<u64> {
        let n = self.count as usize;
        let mut rp = vec![0u64; n];
        for (r, slot) in rp.iter_mut().enumerate().skip(1) {
            let mut counts = 0u64;
            for k in 0..n - r {
                counts += self.data[k * n + (k + r)];
                counts += self.data[(k + r) * n + k];
            }
            *slot = counts;
        }
        rp
    }

    /// Level-crossing histogram recomputed from the matrix: index `i`
    /// counts crossings of the upper boundary of class `i`, i.e. cycles
    /// spanning `from <= i < to` (rising) or `to <= i < from` (falling).
    pub fn level_crossings(&self, count_up: bool, count_down: bool) -> Vec<u64> {
        let n = self.count as usize;
        let mut lc = vec![0u64; n];
        for (i, slot) in lc.iter_mut().enumerate() {
            let mut counts = 0u64;
            for from in 0..n {
                for to in 0..n {
                    let crosses_up = from <= i && i < to;
                    let crosses_down = to <= i && i < from;
                    if (count_up && crosses_up) || (count_down && crosses_down) {
                        counts += self.data[from * n + to];
                    }
                }
            }
            *slot = counts;
        }
        lc
    }
}
