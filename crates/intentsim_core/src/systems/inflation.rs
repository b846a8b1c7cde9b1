//! Watches the intent-information scalar and decides when the domain inflates.
//!
//! The controller only holds the trigger state. Expanding the domain and
//! spawning the burst is done by the universe, which owns both.

use crate::config::InflationTuning;
use rand::Rng;

/// `avg|intent| * avg knowledge * complexity index`.
#[must_use]
pub fn intent_information(average_intent: f64, average_knowledge: f64, complexity_index: f64) -> f64 {
    average_intent * average_knowledge * complexity_index
}

/// Number of particles an inflation burst adds.
#[must_use]
pub fn burst_size(tuning: &InflationTuning, max_particles: usize) -> usize {
    tuning.burst_cap.min(max_particles.saturating_mul(2))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InflationController {
    /// Tick at which the current inflation started.
    active_since: Option<u64>,
    completed: u64,
}

impl InflationController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_inflated(&self) -> bool {
        self.active_since.is_some()
    }

    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Returns `true` if an inflation should start this tick.
    ///
    /// Never fires while one is already active. Beyond the deterministic
    /// threshold there is a small spontaneous chance once the population is
    /// large enough.
    pub fn check<R: Rng>(
        &self,
        intent_information: f64,
        particle_count: usize,
        tuning: &InflationTuning,
        rng: &mut R,
    ) -> bool {
        if self.is_inflated() {
            return false;
        }
        if intent_information > tuning.threshold {
            return true;
        }
        particle_count > tuning.spontaneous_min_particles
            && rng.gen::<f64>() < tuning.spontaneous_probability
    }

    pub fn begin(&mut self, tick: u64) {
        self.active_since = Some(tick);
    }

    /// Ends the active inflation once it has lasted `duration_ticks`.
    /// Returns `true` on the tick it ends.
    pub fn expire(&mut self, tick: u64, tuning: &InflationTuning) -> bool {
        match self.active_since {
            Some(start) if tick.saturating_sub(start) >= tuning.duration_ticks => {
                self.active_since = None;
                self.completed += 1;
                true
            }
            _ => false,
        }
    }
}
