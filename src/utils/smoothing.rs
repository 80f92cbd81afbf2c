//! Parameter smoothing to avoid clicks on value changes.

// -------------------------------------------------------------------------------------------------

/// Provides smooth transitions between a current and target f32 value.
/// Smoothing needs to be applied to avoid clicks in e.g. volume or pitch parameter changes.
pub trait SmoothedValue {
    /// Access to the current, possibly ramped value.
    #[must_use]
    fn current(&self) -> f32;
    /// Access to the target value.
    #[must_use]
    fn target(&self) -> f32;

    /// Ramp, if needed, and get the current ramped value, else returns the target value.
    #[must_use]
    fn next(&mut self) -> f32 {
        if self.need_ramp() {
            self.ramp();
            self.current()
        } else {
            self.target()
        }
    }

    /// Test if ramping is necessary. When ramping is not necessary, parameter changes
    /// may be applied in blocks, which usually is faster.
    #[must_use]
    fn need_ramp(&self) -> bool;
    /// Move current towards the target value, when ramping is necessary.
    fn ramp(&mut self);

    /// Set current and target to the same value, skipping any ramp.
    fn init(&mut self, value: f32);
    /// Set a new target value and ramp current, when current is different from the target.
    fn set_target(&mut self, target: f32);
}

// -------------------------------------------------------------------------------------------------

/// One-pole exponential smoothed value.
///
/// Each ramp step moves the current value towards the target by a fixed fraction
/// `c = 1 - e^(-1 / (sample_rate * time))` of the remaining distance, so a parameter
/// change converges exponentially with the configured time constant.
#[derive(Debug, Clone)]
pub struct ExponentialSmoothedValue {
    current: f32,
    target: f32,
    coefficient: f32,
}

impl ExponentialSmoothedValue {
    /// Create a new smoother with the given time constant in milliseconds.
    pub fn new(sample_rate: u32, smooth_time_ms: f32) -> Self {
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        debug_assert!(smooth_time_ms > 0.0, "Invalid smoothing time");
        let samples = sample_rate as f32 * smooth_time_ms / 1000.0;
        let coefficient = 1.0 - (-1.0 / samples).exp();
        Self {
            current: 0.0,
            target: 0.0,
            coefficient,
        }
    }

    /// The per-sample ramp coefficient.
    #[inline(always)]
    pub fn coefficient(&self) -> f32 {
        self.coefficient
    }
}

impl SmoothedValue for ExponentialSmoothedValue {
    #[inline(always)]
    fn current(&self) -> f32 {
        self.current
    }

    #[inline(always)]
    fn target(&self) -> f32 {
        self.target
    }

    #[inline(always)]
    fn need_ramp(&self) -> bool {
        self.current != self.target
    }

    #[inline]
    fn ramp(&mut self) {
        const EPSILON: f32 = f32::EPSILON * 100.0;
        let step = (self.target - self.current) * self.coefficient;
        if step.abs() <= EPSILON {
            // a step this small can round away entirely and stall the ramp
            self.current = self.target;
        } else {
            self.current += step;
        }
    }

    fn init(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    fn set_target(&mut self, target: f32) {
        self.target = target;
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_skips_ramp() {
        let mut value = ExponentialSmoothedValue::new(48000, 10.0);
        value.init(0.25);
        assert!(!value.need_ramp());
        for _ in 0..128 {
            assert_eq!(value.next(), 0.25);
        }
    }

    #[test]
    fn converges_exponentially() {
        let mut value = ExponentialSmoothedValue::new(48000, 10.0);
        value.init(0.0);
        value.set_target(1.0);
        assert!(value.need_ramp());

        // after N steps the remaining distance is bounded by (1 - c)^N
        let c = value.coefficient();
        let mut bound = 1.0f32;
        for _ in 0..2048 {
            value.ramp();
            bound *= 1.0 - c;
            assert!((value.target() - value.current()).abs() <= bound * 1.01 + 1e-6);
        }

        // converges monotonically from below
        let mut value = ExponentialSmoothedValue::new(48000, 10.0);
        value.init(0.0);
        value.set_target(1.0);
        let mut previous = 0.0;
        for _ in 0..48000 {
            let v = value.next();
            assert!(v >= previous && v <= 1.0);
            previous = v;
        }
        assert_eq!(value.current(), 1.0);
    }

    #[test]
    fn coefficient_follows_time_constant() {
        // 10ms at 48kHz is 480 samples
        let value = ExponentialSmoothedValue::new(48000, 10.0);
        let expected = 1.0 - (-1.0f32 / 480.0).exp();
        assert!((value.coefficient() - expected).abs() < 1e-9);

        // shorter smoothing time ramps faster
        let fast = ExponentialSmoothedValue::new(48000, 1.0);
        assert!(fast.coefficient() > value.coefficient());
    }
}
