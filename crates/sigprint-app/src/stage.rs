//! Stage rotation clock
//!
//! The packet format carries a stage number and its entrainment frequency.
//! Rotation is a host concern: the core only maps stage numbers to
//! frequencies. This clock advances through stages 1..=6, holding each
//! for a fixed dwell time.

use std::time::{Duration, Instant};

use sigprint_core::protocol::{stage_frequency, STAGE_FREQUENCIES_HZ};

/// How long each stage is held before rotating.
pub const STAGE_HOLD: Duration = Duration::from_secs(15);

/// Rotating stage state.
#[derive(Clone, Debug)]
pub struct StageClock {
    stage: u8,
    last_transition: Instant,
}

impl StageClock {
    /// Start at stage 1.
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            stage: 1,
            last_transition: now,
        }
    }

    /// Advance the rotation if the hold time has elapsed.
    pub fn poll(&mut self, now: Instant) {
        if now.duration_since(self.last_transition) >= STAGE_HOLD {
            self.stage += 1;
            if usize::from(self.stage) > STAGE_FREQUENCIES_HZ.len() {
                self.stage = 1;
            }
            self.last_transition = now;
        }
    }

    /// Current stage number (1..=6).
    #[must_use]
    pub fn stage(&self) -> u8 {
        self.stage
    }

    /// Entrainment frequency of the current stage in Hz.
    #[must_use]
    pub fn frequency_hz(&self) -> u16 {
        stage_frequency(self.stage)
    }
}
