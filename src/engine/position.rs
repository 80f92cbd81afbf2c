//! Freeze and drift controllers for the grain read position.

use rand::{rngs::SmallRng, Rng};

// -------------------------------------------------------------------------------------------------

/// Computes the base read position grains spawn from.
///
/// Three modes with strict priority: frozen > drifting > manual. Freezing pins the
/// position to the value captured when the freeze was commanded. Drifting replaces the
/// manual position with a bounded random walk around a base position, with a restoring
/// force pulling the walk back towards it. The manual position is the engine's smoothed
/// position parameter and is only consulted when neither mode is engaged.
#[derive(Debug, Clone)]
pub(crate) struct PositionController {
    frozen: bool,
    frozen_position: f32,
    drifting: bool,
    drift_position: f32,
    drift_base: f32,
    drift_speed: f32,
    drift_return: f32,
}

impl PositionController {
    pub fn new() -> Self {
        Self {
            frozen: false,
            frozen_position: 0.0,
            drifting: false,
            drift_position: 0.0,
            drift_base: 0.0,
            drift_speed: 0.0,
            drift_return: 0.0,
        }
    }

    /// Engage or release the freeze, capturing the given position.
    pub fn set_frozen(&mut self, frozen: bool, position: f32) {
        self.frozen = frozen;
        if frozen {
            self.frozen_position = position.clamp(0.0, 1.0);
        }
    }

    /// Engage or release drifting around the given base position.
    ///
    /// `speed` scales the random step per block, `return_tendency` the restoring
    /// force towards the base. Both are expected in \[0, 1].
    pub fn set_drift(&mut self, drifting: bool, base: f32, speed: f32, return_tendency: f32) {
        self.drifting = drifting;
        if drifting {
            self.drift_base = base.clamp(0.0, 1.0);
            self.drift_position = self.drift_base;
            self.drift_speed = speed.clamp(0.0, 1.0);
            self.drift_return = return_tendency.clamp(0.0, 1.0);
        }
    }

    /// Current position of the drift walk.
    #[allow(dead_code)]
    #[inline]
    pub fn drift_position(&self) -> f32 {
        self.drift_position
    }

    /// Advance the drift walk by one block of `block_duration` seconds.
    ///
    /// Drifting is suppressed entirely while frozen: the walk does not wander
    /// in the background.
    pub fn update_drift(&mut self, block_duration: f64, rng: &mut SmallRng) {
        if !self.drifting || self.frozen {
            return;
        }
        let dt = block_duration as f32;
        let step = self.drift_speed * dt * 0.5;
        let random_step = (rng.random::<f32>() - 0.5) * 2.0 * step;
        let return_force = (self.drift_base - self.drift_position) * self.drift_return * dt * 0.5;
        self.drift_position = (self.drift_position + random_step + return_force).clamp(0.0, 1.0);
    }

    /// The base position for the next grain spawn, given the smoothed manual position.
    #[inline]
    pub fn base_position(&self, manual_position: f32) -> f32 {
        if self.frozen {
            self.frozen_position
        } else if self.drifting {
            self.drift_position
        } else {
            manual_position
        }
    }
}

// -------------------------------------------------------------------------------------------------
