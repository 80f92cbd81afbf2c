use std::ops::RangeInclusive;

use crate::{modulation::LfoTargetMask, utils::lfo::LfoShape};

// -------------------------------------------------------------------------------------------------

// Valid value ranges of all engine parameters. The engine clamps incoming parameter
// records into these bounds, and the modulation mux clamps modulated values back into
// them, so everything downstream can rely on the ranges without re-checking.

/// Grain duration in seconds.
pub const GRAIN_SIZE_RANGE: RangeInclusive<f32> = 0.01..=0.5;
/// Period between grain spawns in seconds.
pub const DENSITY_RANGE: RangeInclusive<f32> = 0.005..=0.5;
/// Random grain start offset, as a multiple of half the buffer length.
pub const SPREAD_RANGE: RangeInclusive<f32> = 0.0..=2.0;
/// Normalized playback position in the source buffer.
pub const POSITION_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Probability of a grain playing in reverse.
pub const REVERSAL_CHANCE_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Stereo panning center position.
pub const PAN_RANGE: RangeInclusive<f32> = -1.0..=1.0;
/// Half-range of the random per-grain panning offset.
pub const PAN_SPREAD_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Pitch shift in semitones.
pub const PITCH_RANGE: RangeInclusive<f32> = -24.0..=24.0;
/// Random detune half-range in cents.
pub const DETUNE_RANGE: RangeInclusive<f32> = 0.0..=100.0;
/// FM carrier frequency in Hz.
pub const FM_FREQ_RANGE: RangeInclusive<f32> = 0.0..=1000.0;
/// FM amount: rate deviation of `amount * 0.01` at full modulation.
pub const FM_AMOUNT_RANGE: RangeInclusive<f32> = 0.0..=100.0;
/// Grain envelope attack, as a fraction of the grain duration.
pub const ATTACK_RANGE: RangeInclusive<f32> = 0.01..=0.9;
/// Grain envelope release, as a fraction of the grain duration.
pub const RELEASE_RANGE: RangeInclusive<f32> = 0.01..=0.9;
/// LFO rate in Hz.
pub const LFO_RATE_RANGE: RangeInclusive<f32> = 0.1..=20.0;
/// LFO modulation depth.
pub const LFO_AMOUNT_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Output gain applied to the summed grain mix.
pub const VOLUME_RANGE: RangeInclusive<f32> = 0.0..=2.0;

/// Lowpass filter cutoff in Hz (forwarded to the effect chain).
pub const FILTER_FREQ_RANGE: RangeInclusive<f32> = 20.0..=20000.0;
/// Lowpass filter resonance (forwarded to the effect chain).
pub const FILTER_RES_RANGE: RangeInclusive<f32> = 0.0..=30.0;
/// Distortion amount (forwarded to the effect chain).
pub const DIST_AMOUNT_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Delay wet mix (forwarded to the effect chain).
pub const DELAY_MIX_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Delay time in seconds (forwarded to the effect chain).
pub const DELAY_TIME_RANGE: RangeInclusive<f32> = 0.01..=2.0;
/// Delay feedback (forwarded to the effect chain).
pub const DELAY_FEEDBACK_RANGE: RangeInclusive<f32> = 0.0..=0.95;
/// Reverb wet mix (forwarded to the effect chain).
pub const REVERB_MIX_RANGE: RangeInclusive<f32> = 0.0..=1.0;

// -------------------------------------------------------------------------------------------------

/// The complete, flat parameter record of the grain engine.
///
/// Records are committed atomically via
/// [`EngineController::update_params`](crate::EngineController::update_params): the audio
/// thread either sees the previous or the new record, never a partial mix. Out of range
/// values are clamped at the engine boundary.
///
/// The filter, distortion, delay and reverb fields are not consumed by the grain engine
/// itself: they ride along for the effect chain that typically follows it and are
/// modulatable through the shared [`LfoTargetMask`] table.
#[derive(Debug, Clone, PartialEq)]
pub struct GranularParams {
    /// Grain duration in seconds.
    pub grain_size: f32,
    /// Period between grain spawns in seconds. This is a period, not a rate:
    /// smaller values spawn more grains per second.
    pub density: f32,
    /// Random grain start position jitter, scaled by half the buffer length.
    pub spread: f32,
    /// Normalized read position in the source buffer.
    pub position: f32,
    /// Probability in \[0, 1] that a grain plays in reverse.
    pub grain_reversal_chance: f32,
    /// Stereo pan center, -1 = full left, +1 = full right.
    pub pan: f32,
    /// Half-range of the uniform random pan offset added per grain.
    pub pan_spread: f32,
    /// Pitch shift in semitones.
    pub pitch: f32,
    /// Random detune half-range in cents, applied per grain.
    pub detune: f32,
    /// FM carrier frequency in Hz.
    pub fm_freq: f32,
    /// FM rate deviation amount.
    pub fm_amount: f32,
    /// Envelope attack as a fraction of the grain duration.
    pub attack: f32,
    /// Envelope release as a fraction of the grain duration.
    pub release: f32,
    /// Use a quadratic instead of a linear envelope curve.
    pub exponential_env: bool,
    /// LFO rate in Hz.
    pub lfo_rate: f32,
    /// LFO modulation depth in \[0, 1].
    pub lfo_amount: f32,
    /// LFO waveform shape.
    pub lfo_shape: LfoShape,
    /// Set of parameters the LFO applies to.
    pub lfo_targets: LfoTargetMask,
    /// Output gain applied to the summed grain mix.
    pub volume: f32,

    // Effect chain pass-through
    pub filter_freq: f32,
    pub filter_res: f32,
    pub dist_amount: f32,
    pub delay_mix: f32,
    pub delay_time: f32,
    pub delay_feedback: f32,
    pub reverb_mix: f32,
}

impl Default for GranularParams {
    fn default() -> Self {
        Self {
            grain_size: 0.1,
            density: 0.1,
            spread: 0.2,
            position: 0.0,
            grain_reversal_chance: 0.0,
            pan: 0.0,
            pan_spread: 0.0,
            pitch: 0.0,
            detune: 0.0,
            fm_freq: 100.0,
            fm_amount: 0.0,
            attack: 0.1,
            release: 0.3,
            exponential_env: false,
            lfo_rate: 1.0,
            lfo_amount: 0.0,
            lfo_shape: LfoShape::Sine,
            lfo_targets: LfoTargetMask::empty(),
            volume: 1.0,
            filter_freq: 20000.0,
            filter_res: 0.7,
            dist_amount: 0.0,
            delay_mix: 0.0,
            delay_time: 0.3,
            delay_feedback: 0.3,
            reverb_mix: 0.0,
        }
    }
}

impl GranularParams {
    /// Return a copy of the record with every field clamped into its valid range.
    pub fn clamped(&self) -> Self {
        let clamp = |value: f32, range: RangeInclusive<f32>| -> f32 {
            value.clamp(*range.start(), *range.end())
        };
        Self {
            grain_size: clamp(self.grain_size, GRAIN_SIZE_RANGE),
            density: clamp(self.density, DENSITY_RANGE),
            spread: clamp(self.spread, SPREAD_RANGE),
            position: clamp(self.position, POSITION_RANGE),
            grain_reversal_chance: clamp(self.grain_reversal_chance, REVERSAL_CHANCE_RANGE),
            pan: clamp(self.pan, PAN_RANGE),
            pan_spread: clamp(self.pan_spread, PAN_SPREAD_RANGE),
            pitch: clamp(self.pitch, PITCH_RANGE),
            detune: clamp(self.detune, DETUNE_RANGE),
            fm_freq: clamp(self.fm_freq, FM_FREQ_RANGE),
            fm_amount: clamp(self.fm_amount, FM_AMOUNT_RANGE),
            attack: clamp(self.attack, ATTACK_RANGE),
            release: clamp(self.release, RELEASE_RANGE),
            exponential_env: self.exponential_env,
            lfo_rate: clamp(self.lfo_rate, LFO_RATE_RANGE),
            lfo_amount: clamp(self.lfo_amount, LFO_AMOUNT_RANGE),
            lfo_shape: self.lfo_shape,
            lfo_targets: self.lfo_targets,
            volume: clamp(self.volume, VOLUME_RANGE),
            filter_freq: clamp(self.filter_freq, FILTER_FREQ_RANGE),
            filter_res: clamp(self.filter_res, FILTER_RES_RANGE),
            dist_amount: clamp(self.dist_amount, DIST_AMOUNT_RANGE),
            delay_mix: clamp(self.delay_mix, DELAY_MIX_RANGE),
            delay_time: clamp(self.delay_time, DELAY_TIME_RANGE),
            delay_feedback: clamp(self.delay_feedback, DELAY_FEEDBACK_RANGE),
            reverb_mix: clamp(self.reverb_mix, REVERB_MIX_RANGE),
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_range() {
        let params = GranularParams::default();
        assert_eq!(params, params.clamped());
    }

    #[test]
    fn clamping() {
        let params = GranularParams {
            grain_size: 10.0,
            density: 0.0,
            pitch: -100.0,
            pan: 3.0,
            lfo_rate: 0.0,
            ..GranularParams::default()
        };
        let clamped = params.clamped();
        assert_eq!(clamped.grain_size, 0.5);
        assert_eq!(clamped.density, 0.005);
        assert_eq!(clamped.pitch, -24.0);
        assert_eq!(clamped.pan, 1.0);
        assert_eq!(clamped.lfo_rate, 0.1);
    }
}
