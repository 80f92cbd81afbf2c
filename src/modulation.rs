//! LFO modulation routing: which parameters the LFO applies to, and how much.

use std::ops::RangeInclusive;

use crate::parameter;

// -------------------------------------------------------------------------------------------------

/// Parameters that can be modulated by the LFO.
///
/// The discriminants are the bit positions used in [`LfoTargetMask`] and are stable:
/// they are shared with UI and preset consumers and must not be reordered.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    strum::EnumCount,
)]
#[repr(u8)]
pub enum LfoTarget {
    GrainSize = 0,
    Density = 1,
    Spread = 2,
    Position = 3,
    Pitch = 4,
    FmFreq = 5,
    FmAmount = 6,
    FilterFreq = 7,
    FilterRes = 8,
    Attack = 9,
    Release = 10,
    DistAmount = 11,
    DelayMix = 12,
    DelayTime = 13,
    DelayFeedback = 14,
    Pan = 15,
    PanSpread = 16,
}

impl LfoTarget {
    /// All modulation targets, in bit order.
    pub const ALL: [LfoTarget; 17] = [
        Self::GrainSize,
        Self::Density,
        Self::Spread,
        Self::Position,
        Self::Pitch,
        Self::FmFreq,
        Self::FmAmount,
        Self::FilterFreq,
        Self::FilterRes,
        Self::Attack,
        Self::Release,
        Self::DistAmount,
        Self::DelayMix,
        Self::DelayTime,
        Self::DelayFeedback,
        Self::Pan,
        Self::PanSpread,
    ];

    /// The target's bit in an [`LfoTargetMask`].
    #[inline(always)]
    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Maximum swing the LFO adds to this target at full depth.
    ///
    /// These scales are part of the contract with UI consumers and match the
    /// target's value range in spirit: e.g. a pitch swing of a full ±24 semitones,
    /// a position swing of half the buffer.
    pub const fn scale(self) -> f32 {
        match self {
            Self::GrainSize => 0.2,
            Self::Density => 0.1,
            Self::Spread => 1.0,
            Self::Position => 0.5,
            Self::Pitch => 24.0,
            Self::FmFreq => 200.0,
            Self::FmAmount => 50.0,
            Self::FilterFreq => 5000.0,
            Self::FilterRes => 10.0,
            Self::Attack => 0.5,
            Self::Release => 0.5,
            Self::DistAmount => 0.5,
            Self::DelayMix => 0.5,
            Self::DelayTime => 0.5,
            Self::DelayFeedback => 0.5,
            Self::Pan => 1.0,
            Self::PanSpread => 1.0,
        }
    }

    /// Bounds that modulated values are clamped into after the LFO offset is applied.
    pub fn clamp_range(self) -> RangeInclusive<f32> {
        match self {
            Self::GrainSize => parameter::GRAIN_SIZE_RANGE,
            Self::Density => parameter::DENSITY_RANGE,
            Self::Spread => parameter::SPREAD_RANGE,
            Self::Position => parameter::POSITION_RANGE,
            Self::Pitch => parameter::PITCH_RANGE,
            Self::FmFreq => parameter::FM_FREQ_RANGE,
            Self::FmAmount => parameter::FM_AMOUNT_RANGE,
            Self::FilterFreq => parameter::FILTER_FREQ_RANGE,
            Self::FilterRes => parameter::FILTER_RES_RANGE,
            Self::Attack => parameter::ATTACK_RANGE,
            Self::Release => parameter::RELEASE_RANGE,
            Self::DistAmount => parameter::DIST_AMOUNT_RANGE,
            Self::DelayMix => parameter::DELAY_MIX_RANGE,
            Self::DelayTime => parameter::DELAY_TIME_RANGE,
            Self::DelayFeedback => parameter::DELAY_FEEDBACK_RANGE,
            Self::Pan => parameter::PAN_RANGE,
            Self::PanSpread => parameter::PAN_SPREAD_RANGE,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Bit-set of [`LfoTarget`]s the LFO is routed to.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct LfoTargetMask(u32);

impl LfoTargetMask {
    /// A mask with no targets set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// A mask with every target set.
    pub const fn all() -> Self {
        Self((1 << LfoTarget::ALL.len()) - 1)
    }

    /// Create a mask from raw bits, ignoring bits beyond the known targets.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & Self::all().0)
    }

    /// The raw bit representation.
    #[inline(always)]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Test if the given target is routed.
    #[inline(always)]
    pub const fn contains(self, target: LfoTarget) -> bool {
        self.0 & target.bit() != 0
    }

    /// Return the mask with the given target routed.
    #[must_use]
    pub const fn with(self, target: LfoTarget) -> Self {
        Self(self.0 | target.bit())
    }

    /// Return the mask with the given target removed.
    #[must_use]
    pub const fn without(self, target: LfoTarget) -> Self {
        Self(self.0 & !target.bit())
    }
}

impl FromIterator<LfoTarget> for LfoTargetMask {
    fn from_iter<I: IntoIterator<Item = LfoTarget>>(targets: I) -> Self {
        targets
            .into_iter()
            .fold(Self::empty(), |mask, target| mask.with(target))
    }
}

// -------------------------------------------------------------------------------------------------

/// Apply LFO modulation to a base parameter value.
///
/// When `target` is routed in `mask`, offsets `base` by the LFO value scaled by depth
/// and the target's fixed swing, then clamps back into the target's bounds. Returns
/// `base` unchanged otherwise.
#[inline]
pub fn modulated(base: f32, target: LfoTarget, mask: LfoTargetMask, lfo: f32, depth: f32) -> f32 {
    if mask.contains(target) {
        let range = target.clamp_range();
        (base + lfo * depth * target.scale()).clamp(*range.start(), *range.end())
    } else {
        base
    }
}

// -------------------------------------------------------------------------------------------------
