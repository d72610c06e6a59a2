//! Fixed-timestep accumulator.
//!
//! Hosts feed real elapsed milliseconds into [`FixedTimestep::accumulate`]
//! and run [`World::step`](crate::world::World::step) once per returned tick.

use serde::{Deserialize, Serialize};

/// Default cap on ticks run for a single frame.
pub const DEFAULT_MAX_TICKS_PER_FRAME: u32 = 10;

/// Converts elapsed wall time into whole simulation ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedTimestep {
    tick_ms: u32,
    accumulator_ms: u32,
    max_ticks_per_frame: u32,
}

impl FixedTimestep {
    /// Accumulator for `tick_rate` ticks per second. A rate of zero is
    /// treated as one.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_ms: (1000 / tick_rate.max(1)).max(1),
            accumulator_ms: 0,
            max_ticks_per_frame: DEFAULT_MAX_TICKS_PER_FRAME,
        }
    }

    /// Same accumulator with a different catch-up cap (at least one tick).
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks_per_frame: u32) -> Self {
        self.max_ticks_per_frame = max_ticks_per_frame.max(1);
        self
    }

    /// Length of one tick.
    #[must_use]
    pub const fn tick_ms(&self) -> u32 {
        self.tick_ms
    }

    /// Time carried over towards the next tick.
    #[must_use]
    pub const fn pending_ms(&self) -> u32 {
        self.accumulator_ms
    }

    /// Most ticks [`accumulate`](Self::accumulate) will hand out at once.
    #[must_use]
    pub const fn max_ticks_per_frame(&self) -> u32 {
        self.max_ticks_per_frame
    }

    /// Add `elapsed_ms` and return how many ticks are due.
    ///
    /// Time beyond the per-frame cap is dropped rather than replayed later.
    pub fn accumulate(&mut self, elapsed_ms: u32) -> u32 {
        self.accumulator_ms = self.accumulator_ms.saturating_add(elapsed_ms);
        let due = self.accumulator_ms / self.tick_ms;
        if due > self.max_ticks_per_frame {
            tracing::debug!(
                due,
                cap = self.max_ticks_per_frame,
                "Dropping simulation time after stall"
            );
            self.accumulator_ms = 0;
            return self.max_ticks_per_frame;
        }
        self.accumulator_ms -= due * self.tick_ms;
        due
    }

    /// Forget any carried-over time.
    pub fn reset(&mut self) {
        self.accumulator_ms = 0;
    }
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(20)
    }
}
