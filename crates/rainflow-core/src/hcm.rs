//! Clormann-Seeger HCM cycle finder
//!
//! Three-point rainflow variant after Clormann and Seeger (TU Darmstadt,
//! 1985). Confirmed turning points are pushed onto an auxiliary stack;
//! a new point `K` closes the cycle `I -> J` formed by the two points
//! below it whenever its reversal spans theirs. The pointer `IZ` marks
//! the stack top, `IR` the floor below which points are material memory
//! and can no longer pair up (both base 1, matching the reference
//! RAINFLOW.F formulation).
//!
//! The reference implementation drives this with labelled gotos; here it
//! is a single loop with explicit `continue` targets.
//!
//! ## Example
//!
//! ```rust
//! use rainflow_core::hcm::HcmStack;
//! use rainflow_core::types::TurningPoint;
//!
//! let mut hcm = HcmStack::with_class_count(4);
//! let mut cycles = Vec::new();
//! for (i, &v) in [1.0, 3.0, 2.0, 4.0].iter().enumerate() {
//!     hcm.advance(TurningPoint::new(v, i as u64 + 1, 0), |from, to| {
//!         cycles.push((from.value, to.value));
//!     });
//! }
//! assert_eq!(cycles, [(3.0, 2.0)]);
//! ```

use crate::types::TurningPoint;

/// HCM auxiliary stack with base-1 `IZ`/`IR` pointers.
#[derive(Debug, Clone)]
pub struct HcmStack {
    stack: Vec<TurningPoint>,
    /// Stack top, base 1; 0 means empty.
    iz: usize,
    /// Reserved floor, base 1.
    ir: usize,
}

impl HcmStack {
    /// Create a stack sized for the given class count (capacity
    /// `2 * class_count`, like the residue).
    pub fn with_class_count(class_count: u32) -> Self {
        Self {
            stack: vec![TurningPoint::default(); 2 * class_count as usize],
            iz: 0,
            ir: 1,
        }
    }

    /// Process one confirmed turning point. `on_cycle(from, to)` is
    /// invoked for every closed cycle.
    pub fn advance<F>(&mut self, k: TurningPoint, mut on_cycle: F)
    where
        F: FnMut(TurningPoint, TurningPoint),
    {
        // Work in base 0; -1 encodes an empty stack.
        let mut iz = self.iz as isize - 1;
        let mut ir = self.ir as isize - 1;

        if ir == 0 {
            // Very first turning point seeds the floor.
            self.stack[0] = k;
            ir = 1;
        }

        loop {
            if iz > ir {
                // At least two stacked points above the floor may close.
                let i = self.stack[(iz - 1) as usize];
                let j = self.stack[iz as usize];

                if (k.value - j.value) * (j.value - i.value) >= 0.0 {
                    // J is no turning point relative to K; discard it.
                    iz -= 1;
                    continue;
                }
                if (k.value - j.value).abs() >= (j.value - i.value).abs() {
                    // K spans the I-J reversal: cycle I -> J closes.
                    on_cycle(i, j);
                    iz -= 2;
                    continue;
                }
            } else if iz == ir {
                let j = self.stack[iz as usize];

                if (k.value - j.value) * j.value >= 0.0 {
                    // J is no turning point relative to K.
                    iz -= 1;
                    continue;
                }
                if k.value.abs() > j.value.abs() {
                    // K reaches beyond the floor point; raise the floor.
                    ir += 1;
                }
            }
            break;
        }

        iz += 1;
        debug_assert!((iz as usize) < self.stack.len(), "HCM stack overflow");
        self.stack[iz as usize] = k;

        self.iz = (iz + 1) as usize;
        self.ir = (ir + 1) as usize;
    }

    /// Number of stacked points.
    #[inline]
    pub fn len(&self) -> usize {
        self.iz
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.iz == 0
    }

    /// Stacked points, bottom first.
    pub fn points(&self) -> &[TurningPoint] {
        &self.stack[..self.iz]
    }

    /// Hand the stacked points over (the final residue under HCM) and
    /// reset the pointers.
    pub fn drain(&mut self) -> Vec<TurningPoint> {
        let out = self.stack[..self.iz].to_vec();
        self.iz = 0;
        self.ir = 1;
        out
    }

    /// Reset the stack pointers; allocations are retained.
    pub fn reset(&mut self) {
        self.iz = 0;
        self.ir = 1;
    }
}
