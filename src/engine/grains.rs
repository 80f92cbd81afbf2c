//! Grain records, the grain amplitude envelope and the fixed-capacity grain pool.

use crate::utils::sample_at;

// -------------------------------------------------------------------------------------------------

/// Number of grain slots in the pool. With the minimum spawn period of 5ms and the
/// maximum grain duration of 500ms at most 100 grains overlap, so 128 slots cover the
/// worst case with headroom for modulation transients.
pub const GRAIN_POOL_SIZE: usize = 128;

/// Fraction of the grain envelope reserved for the anti-click fade-in.
const FADE_IN_RATIO: f32 = 0.01;

/// Click-safety floor the fade-in ramps up to and the envelope snaps to in
/// degenerate attack regions.
const ENVELOPE_FLOOR: f32 = 0.001;

// -------------------------------------------------------------------------------------------------

/// Evaluate the grain amplitude envelope at a normalized phase in \[0, 1].
///
/// The first 1% of the phase is a fixed fade-in from silence to the click-safety
/// floor, independent of the attack setting. The attack then scales the floor up to
/// full level, the release scales back down to silence, and whatever remains between
/// them sustains at full level. When attack and release overlap (`attack + release > 1`)
/// the sustain region is empty and release starts right at the end of the attack.
///
/// `exponential` selects a quadratic approximation of an exponential curve for the
/// attack and release slopes instead of linear ramps.
pub(crate) fn envelope_gain(phase: f32, attack: f32, release: f32, exponential: bool) -> f32 {
    if phase <= 0.0 || phase >= 1.0 {
        return 0.0;
    }
    if phase < FADE_IN_RATIO {
        return phase / FADE_IN_RATIO * ENVELOPE_FLOOR;
    }
    let release_start = (1.0 - release).max(attack);
    if phase < attack {
        let span = attack - FADE_IN_RATIO;
        if span < ENVELOPE_FLOOR {
            return ENVELOPE_FLOOR;
        }
        let mut ramp = (phase - FADE_IN_RATIO) / span;
        if exponential {
            ramp *= ramp;
        }
        ENVELOPE_FLOOR + (1.0 - ENVELOPE_FLOOR) * ramp
    } else if phase < release_start {
        1.0
    } else {
        let span = 1.0 - release_start;
        if span < ENVELOPE_FLOOR {
            return 0.0;
        }
        let mut ramp = 1.0 - (phase - release_start) / span;
        if exponential {
            ramp *= ramp;
        }
        ramp
    }
}

// -------------------------------------------------------------------------------------------------

/// Playback state of a single grain.
///
/// Grains are plain copyable records without heap references: the pool recycles them
/// in place and per-sample processing receives the sample data as an argument.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Grain {
    /// Is this grain currently playing?
    active: bool,
    /// Fractional read position in the source buffer, in frames.
    read_pos: f64,
    /// Read position increment per output sample. Negative for reversed grains.
    rate: f64,
    /// Output samples left until the grain ends.
    samples_remaining: u32,
    /// Envelope progress in \[0, 1].
    env_phase: f32,
    /// Envelope phase increment per output sample (1 / total samples).
    env_increment: f32,
    /// Fraction of the envelope assigned to the attack.
    attack_ratio: f32,
    /// Fraction of the envelope assigned to the release.
    release_ratio: f32,
    /// Quadratic instead of linear envelope slopes.
    exponential_env: bool,
    /// Precomputed equal-power gain for the left channel.
    pan_l: f32,
    /// Precomputed equal-power gain for the right channel.
    pan_r: f32,
}

impl Default for Grain {
    fn default() -> Self {
        Self::new()
    }
}

impl Grain {
    /// Create a new inactive grain.
    pub const fn new() -> Self {
        Self {
            active: false,
            read_pos: 0.0,
            rate: 0.0,
            samples_remaining: 0,
            env_phase: 0.0,
            env_increment: 0.0,
            attack_ratio: 0.0,
            release_ratio: 0.0,
            exponential_env: false,
            pan_l: 0.0,
            pan_r: 0.0,
        }
    }

    /// Check if this grain is currently active.
    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Output samples left until this grain ends. Used for pool eviction.
    #[inline(always)]
    pub fn samples_remaining(&self) -> u32 {
        self.samples_remaining
    }

    /// Current fractional read position in the source buffer.
    #[allow(dead_code)]
    #[inline(always)]
    pub fn read_pos(&self) -> f64 {
        self.read_pos
    }

    /// Read position increment per output sample.
    #[allow(dead_code)]
    #[inline(always)]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// (Re)start this grain with the given playback state.
    #[allow(clippy::too_many_arguments)]
    pub fn activate(
        &mut self,
        read_pos: f64,
        rate: f64,
        samples_total: u32,
        attack_ratio: f32,
        release_ratio: f32,
        exponential_env: bool,
        pan_l: f32,
        pan_r: f32,
    ) {
        debug_assert!(samples_total > 0, "Grains can't be empty");
        self.active = true;
        self.read_pos = read_pos;
        self.rate = rate;
        self.samples_remaining = samples_total;
        self.env_phase = 0.0;
        self.env_increment = 1.0 / samples_total as f32;
        self.attack_ratio = attack_ratio;
        self.release_ratio = release_ratio;
        self.exponential_env = exponential_env;
        self.pan_l = pan_l;
        self.pan_r = pan_r;
    }

    /// Stop this grain immediately.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.samples_remaining = 0;
    }

    /// Process this grain for one output sample and return its stereo contribution.
    ///
    /// Advances the read position and envelope, and deactivates the grain when it
    /// played through or its read position left the buffer.
    #[inline]
    pub fn process(&mut self, samples: &[f32]) -> (f32, f32) {
        debug_assert!(self.active, "Should only process active grains");

        let value = sample_at(samples, self.read_pos)
            * envelope_gain(
                self.env_phase,
                self.attack_ratio,
                self.release_ratio,
                self.exponential_env,
            );

        self.read_pos += self.rate;
        self.env_phase += self.env_increment;
        self.samples_remaining = self.samples_remaining.saturating_sub(1);
        if self.samples_remaining == 0
            || self.read_pos < 0.0
            || self.read_pos >= samples.len() as f64
        {
            self.active = false;
        }

        (value * self.pan_l, value * self.pan_r)
    }
}

// -------------------------------------------------------------------------------------------------

/// Fixed-capacity pool of reusable grains.
///
/// Slots never move: spawning reuses an inactive slot when one exists and otherwise
/// evicts the grain closest to its natural end, which keeps the audible truncation
/// of a steal as short as possible.
pub(crate) struct GrainPool {
    grains: [Grain; GRAIN_POOL_SIZE],
}

impl GrainPool {
    /// Create a new pool with all slots inactive.
    pub fn new() -> Self {
        Self {
            grains: [Grain::new(); GRAIN_POOL_SIZE],
        }
    }

    /// Get the slot to use for a new grain.
    pub fn allocate(&mut self) -> &mut Grain {
        let index = match self.grains.iter().position(|grain| !grain.is_active()) {
            Some(index) => index,
            None => {
                // all slots busy: steal the grain with the fewest samples left
                let mut victim = 0;
                let mut least_remaining = u32::MAX;
                for (index, grain) in self.grains.iter().enumerate() {
                    if grain.samples_remaining() < least_remaining {
                        least_remaining = grain.samples_remaining();
                        victim = index;
                    }
                }
                victim
            }
        };
        &mut self.grains[index]
    }

    /// Immediately stop all grains.
    pub fn deactivate_all(&mut self) {
        for grain in &mut self.grains {
            grain.deactivate();
        }
    }

    /// Number of currently active grains.
    pub fn active_count(&self) -> usize {
        self.grains.iter().filter(|grain| grain.is_active()).count()
    }

    /// Mutable access to all slots, for the mix loop.
    #[inline]
    pub fn grains_mut(&mut self) -> &mut [Grain; GRAIN_POOL_SIZE] {
        &mut self.grains
    }

    /// Read access to all slots.
    #[allow(dead_code)]
    #[inline]
    pub fn grains(&self) -> &[Grain; GRAIN_POOL_SIZE] {
        &self.grains
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_boundaries() {
        for exponential in [false, true] {
            for (attack, release) in [(0.1, 0.3), (0.5, 0.5), (0.9, 0.9)] {
                let env = |phase| envelope_gain(phase, attack, release, exponential);
                // silent at both ends, floor at the end of the fade-in
                assert_eq!(env(0.0), 0.0);
                assert!(env(0.01) <= 0.001 + 1e-6);
                assert!(env(1.0) <= 0.001);
                // full level at the end of the attack
                assert_eq!(env(attack), 1.0);
                if attack + release < 1.0 {
                    assert_eq!(env(1.0 - release), 1.0);
                    assert_eq!(env((attack + 1.0 - release) * 0.5), 1.0);
                }
            }
        }
    }

    #[test]
    fn envelope_degenerate_regions() {
        // an attack no longer than the fade-in holds the click-safety floor,
        // then jumps straight to sustain
        let env = |phase| envelope_gain(phase, 0.0105, 0.3, false);
        assert_eq!(env(0.0102), 0.001);
        assert_eq!(env(0.05), 1.0);
        // a degenerate release region is instantly silent
        let env = |phase| envelope_gain(phase, 0.2, 0.0001, false);
        assert_eq!(env(0.99995), 0.0);
    }

    #[test]
    fn envelope_is_continuous() {
        // no step in the curve may exceed the phase step times the steepest slope
        for exponential in [false, true] {
            for (attack, release) in [(0.2, 0.2), (0.5, 0.5), (0.8, 0.8), (0.05, 0.9)] {
                let steps = 10000;
                let mut previous = 0.0f32;
                for i in 0..=steps {
                    let phase = i as f32 / steps as f32;
                    let value = envelope_gain(phase, attack, release, exponential);
                    assert!(
                        (value - previous).abs() < 0.02,
                        "discontinuity at phase {phase} ({attack}/{release})"
                    );
                    previous = value;
                }
            }
        }
    }

    #[test]
    fn envelope_overlapping_attack_release() {
        // attack + release > 1: no sustain, release starts at the attack end
        let env = |phase| envelope_gain(phase, 0.8, 0.8, false);
        assert_eq!(env(0.8), 1.0);
        assert!(env(0.9) < 1.0);
        assert!(env(0.79) < 1.0);
    }

    #[test]
    fn grain_lifecycle() {
        let samples = vec![1.0f32; 100];
        let mut grain = Grain::new();
        grain.activate(0.0, 1.0, 10, 0.5, 0.5, false, 0.7, 0.7);
        assert!(grain.is_active());

        for _ in 0..10 {
            assert!(grain.is_active());
            grain.process(&samples);
        }
        assert!(!grain.is_active());
    }

    #[test]
    fn grain_deactivates_at_buffer_end() {
        let samples = vec![1.0f32; 8];
        let mut grain = Grain::new();
        grain.activate(6.0, 1.0, 100, 0.5, 0.5, false, 0.7, 0.7);

        let mut processed = 0;
        while grain.is_active() && processed < 100 {
            grain.process(&samples);
            processed += 1;
            assert!(grain.read_pos() >= 0.0 || !grain.is_active());
        }
        // left the buffer long before its samples ran out
        assert!(processed < 100);
    }

    #[test]
    fn reversed_grain_deactivates_at_buffer_start() {
        let samples = vec![1.0f32; 8];
        let mut grain = Grain::new();
        grain.activate(7.0, -1.0, 100, 0.5, 0.5, false, 0.7, 0.7);

        let mut processed = 0;
        while grain.is_active() && processed < 100 {
            grain.process(&samples);
            processed += 1;
        }
        assert!(processed < 100);
    }

    #[test]
    fn pool_allocation_and_eviction() {
        let mut pool = GrainPool::new();
        assert_eq!(pool.active_count(), 0);

        // fill the pool with grains of decreasing length
        for i in 0..GRAIN_POOL_SIZE {
            let grain = pool.allocate();
            assert!(!grain.is_active());
            grain.activate(0.0, 1.0, 1000 - i as u32, 0.5, 0.5, false, 0.7, 0.7);
        }
        assert_eq!(pool.active_count(), GRAIN_POOL_SIZE);

        // a full pool steals the grain closest to its end
        let least_remaining = 1000 - (GRAIN_POOL_SIZE as u32 - 1);
        let stolen = pool.allocate();
        assert_eq!(stolen.samples_remaining(), least_remaining);
        stolen.activate(0.0, 1.0, 5000, 0.5, 0.5, false, 0.7, 0.7);
        assert_eq!(pool.active_count(), GRAIN_POOL_SIZE);
        assert!(pool
            .grains()
            .iter()
            .all(|grain| grain.samples_remaining() != least_remaining));

        pool.deactivate_all();
        assert_eq!(pool.active_count(), 0);
    }
}
