//! The granular engine: command ingress, grain scheduling and block processing.

mod controller;
mod grains;
mod message;
mod position;

use std::sync::Arc;

use basedrop::{Collector, Owned};
use crossbeam_queue::ArrayQueue;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    buffer::SampleBuffer,
    error::Error,
    event::{GrainEvent, GRAIN_EVENT_CAPACITY},
    modulation::{modulated, LfoTarget},
    parameter::GranularParams,
    utils::{
        lfo, panning_factors,
        smoothing::{ExponentialSmoothedValue, SmoothedValue},
    },
};

use self::{
    grains::GrainPool,
    message::{EngineMessage, COMMAND_QUEUE_CAPACITY},
    position::PositionController,
};

pub use controller::EngineController;
pub use grains::GRAIN_POOL_SIZE;

// -------------------------------------------------------------------------------------------------

/// Time constant of all parameter smoothers.
const SMOOTH_TIME_MS: f32 = 10.0;

/// Safety floor for the spawn period, applied after modulation. Keeps a runaway
/// modulated density from exploding the grain rate.
const MIN_DENSITY: f32 = 0.005;

/// Safety floor for the grain duration, applied after modulation.
const MIN_GRAIN_SIZE: f32 = 0.01;

/// Minimum magnitude of the playback rate after FM deviation: FM may bend a grain's
/// rate but never stall or reverse it.
const MIN_RATE: f64 = 0.1;

// -------------------------------------------------------------------------------------------------

/// A real-time granular synthesis engine.
///
/// The engine continuously granulates a committed [`SampleBuffer`]: a sample-accurate
/// scheduler spawns short, windowed, pitch-shifted grains at the configured density and
/// mixes all active grains into a stereo output block by block.
///
/// Construction returns the engine paired with an [`EngineController`]. Move the engine
/// to the audio thread and call [`process`](Self::process) from the audio callback; keep
/// the controller on a control thread for parameter updates, transport and buffer
/// commits. `process` is realtime-safe: all state it touches is thread-private or
/// crosses over through lock-free bounded queues, and the processing path performs no
/// allocations.
///
/// Identically seeded engines (see [`with_seed`](Self::with_seed)) given the same
/// command history render bit-identical output.
pub struct GranularEngine {
    sample_rate: u32,
    params: GranularParams,
    buffer: Option<Owned<SampleBuffer>>,
    pool: GrainPool,
    playing: bool,
    current_time: f64,
    next_spawn_time: f64,
    block_lfo: f32,
    rng: SmallRng,
    position: PositionController,
    smoothed_pitch: ExponentialSmoothedValue,
    smoothed_position: ExponentialSmoothedValue,
    smoothed_grain_size: ExponentialSmoothedValue,
    smoothed_pan: ExponentialSmoothedValue,
    smoothed_volume: ExponentialSmoothedValue,
    commands: Arc<ArrayQueue<EngineMessage>>,
    pending_buffer: Arc<ArrayQueue<Owned<SampleBuffer>>>,
    events: Arc<ArrayQueue<GrainEvent>>,
}

impl GranularEngine {
    /// Create a new engine and its controller for the given output sample rate,
    /// seeded from the OS.
    pub fn new(sample_rate: u32) -> Result<(Self, EngineController), Error> {
        Self::with_rng(sample_rate, SmallRng::from_os_rng())
    }

    /// Create a new engine with an explicit random seed.
    ///
    /// Engines with the same seed, sample rate and command history produce
    /// bit-identical output.
    pub fn with_seed(sample_rate: u32, seed: u64) -> Result<(Self, EngineController), Error> {
        Self::with_rng(sample_rate, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(sample_rate: u32, rng: SmallRng) -> Result<(Self, EngineController), Error> {
        if sample_rate == 0 {
            return Err(Error::InvalidSampleRate(sample_rate));
        }

        let commands = Arc::new(ArrayQueue::new(COMMAND_QUEUE_CAPACITY));
        let pending_buffer = Arc::new(ArrayQueue::new(1));
        let events = Arc::new(ArrayQueue::new(GRAIN_EVENT_CAPACITY));
        let collector = Collector::new();

        let params = GranularParams::default();
        let smoother = |value: f32| {
            let mut smoother = ExponentialSmoothedValue::new(sample_rate, SMOOTH_TIME_MS);
            smoother.init(value);
            smoother
        };

        let engine = Self {
            sample_rate,
            smoothed_pitch: smoother(params.pitch),
            smoothed_position: smoother(params.position),
            smoothed_grain_size: smoother(params.grain_size),
            smoothed_pan: smoother(params.pan),
            smoothed_volume: smoother(params.volume),
            params,
            buffer: None,
            pool: GrainPool::new(),
            playing: false,
            current_time: 0.0,
            next_spawn_time: 0.0,
            block_lfo: 0.0,
            rng,
            position: PositionController::new(),
            commands: Arc::clone(&commands),
            pending_buffer: Arc::clone(&pending_buffer),
            events: Arc::clone(&events),
        };
        let controller = EngineController::new(commands, pending_buffer, events, collector);
        Ok((engine, controller))
    }

    /// The engine's output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The engine clock in seconds, advanced by one block duration per process call.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Is the engine granulating?
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Number of currently sounding grains.
    pub fn active_grain_count(&self) -> usize {
        self.pool.active_count()
    }

    /// The engine's current parameter record.
    pub fn params(&self) -> &GranularParams {
        &self.params
    }

    /// Render one block of audio into the given planar stereo output buffers.
    ///
    /// Writes `out_left.len()` frames (both outputs must have equal lengths) and leaves
    /// them zeroed while stopped or without usable sample material. Pending controller
    /// commands are absorbed before anything else, so parameter updates apply at block
    /// boundaries. Realtime-safe: never blocks, locks or allocates.
    pub fn process(&mut self, out_left: &mut [f32], out_right: &mut [f32]) {
        assert_no_alloc(|| self.process_block(out_left, out_right));
    }

    fn process_block(&mut self, out_left: &mut [f32], out_right: &mut [f32]) {
        debug_assert_eq!(out_left.len(), out_right.len(), "Unbalanced output buffers");
        let num_frames = out_left.len().min(out_right.len());
        let out_left = &mut out_left[..num_frames];
        let out_right = &mut out_right[..num_frames];

        self.apply_pending_messages();

        out_left.fill(0.0);
        out_right.fill(0.0);
        if num_frames == 0 {
            return;
        }

        let block_duration = num_frames as f64 / self.sample_rate as f64;
        let has_material = self.buffer.as_ref().is_some_and(|buffer| !buffer.is_empty());
        if !self.playing || !has_material {
            self.current_time += block_duration;
            return;
        }

        // evaluate the LFO once at block start time; rates are bounded low enough
        // that block resolution keeps the phase error inaudible
        self.block_lfo = lfo::value(
            self.current_time,
            self.params.lfo_rate,
            self.params.lfo_shape,
        );

        // advance all smoothers through the block so spawns see ramped values
        for _ in 0..num_frames {
            let _ = self.smoothed_pitch.next();
            let _ = self.smoothed_position.next();
            let _ = self.smoothed_grain_size.next();
            let _ = self.smoothed_pan.next();
            let _ = self.smoothed_volume.next();
        }

        self.position.update_drift(block_duration, &mut self.rng);

        self.run_scheduler(block_duration);

        // sum all active grains into the output
        if let Some(buffer) = &self.buffer {
            let samples = buffer.samples();
            let gain = self.smoothed_volume.current();
            for frame in 0..num_frames {
                let mut left = 0.0;
                let mut right = 0.0;
                for grain in self.pool.grains_mut().iter_mut() {
                    if grain.is_active() {
                        let (l, r) = grain.process(samples);
                        left += l;
                        right += r;
                    }
                }
                out_left[frame] = left * gain;
                out_right[frame] = right * gain;
            }
        }

        self.current_time += block_duration;
    }

    /// Absorb all pending controller commands and buffer commits.
    fn apply_pending_messages(&mut self) {
        while let Some(message) = self.commands.pop() {
            match message {
                EngineMessage::SetParams(params) => self.apply_params(params),
                EngineMessage::Start => {
                    self.playing = true;
                    self.next_spawn_time = self.current_time;
                }
                EngineMessage::Stop => {
                    self.playing = false;
                    self.pool.deactivate_all();
                }
                EngineMessage::SetFrozen { frozen, position } => {
                    self.position.set_frozen(frozen, position);
                }
                EngineMessage::SetDrift {
                    drifting,
                    base,
                    speed,
                    return_tendency,
                } => {
                    self.position.set_drift(drifting, base, speed, return_tendency);
                }
                EngineMessage::ResetPool => self.pool.deactivate_all(),
            }
        }

        while let Some(buffer) = self.pending_buffer.pop() {
            // the replaced buffer is dropped into the collector's retire queue here
            // and reclaimed on the control thread, never freed on the audio thread
            self.buffer = Some(buffer);
            // grains hold read positions into the previous material
            self.pool.deactivate_all();
            // snap the position smoother: ramping across a buffer swap would sweep
            // spawns through unrelated material
            self.smoothed_position.init(self.smoothed_position.target());
        }
    }

    fn apply_params(&mut self, params: GranularParams) {
        let params = params.clamped();
        self.smoothed_pitch.set_target(params.pitch);
        self.smoothed_position.set_target(params.position);
        self.smoothed_grain_size.set_target(params.grain_size);
        self.smoothed_pan.set_target(params.pan);
        self.smoothed_volume.set_target(params.volume);
        if !self.playing {
            // nothing audible to protect: skip the ramps so the first block after
            // a start sees the exact values
            self.smoothed_pitch.init(params.pitch);
            self.smoothed_position.init(params.position);
            self.smoothed_grain_size.init(params.grain_size);
            self.smoothed_pan.init(params.pan);
            self.smoothed_volume.init(params.volume);
        }
        self.params = params;
    }

    /// Spawn all grains whose spawn times fall within this block.
    fn run_scheduler(&mut self, block_duration: f64) {
        // a stopped or bufferless stretch leaves the spawn clock behind;
        // resume from now instead of bursting through the backlog
        if self.next_spawn_time < self.current_time {
            self.next_spawn_time = self.current_time;
        }
        let block_end = self.current_time + block_duration;
        while self.next_spawn_time < block_end {
            self.spawn_grain();
            let density = modulated(
                self.params.density,
                LfoTarget::Density,
                self.params.lfo_targets,
                self.block_lfo,
                self.params.lfo_amount,
            )
            .max(MIN_DENSITY);
            self.next_spawn_time += density as f64;
        }
    }

    /// Spawn a single grain from the current smoothed and modulated parameters.
    fn spawn_grain(&mut self) {
        let Some(buffer) = &self.buffer else {
            return;
        };
        let buffer_len = buffer.frame_count();
        if buffer_len == 0 {
            return;
        }

        let params = &self.params;
        let rng = &mut self.rng;
        let mask = params.lfo_targets;
        let lfo = self.block_lfo;
        let depth = params.lfo_amount;

        // duration
        let grain_size = modulated(
            self.smoothed_grain_size.current(),
            LfoTarget::GrainSize,
            mask,
            lfo,
            depth,
        )
        .max(MIN_GRAIN_SIZE);
        let samples_total = ((grain_size * self.sample_rate as f32).round() as u32).max(1);

        // pitch in cents, with a fresh random detune per grain
        let pitch = modulated(
            self.smoothed_pitch.current(),
            LfoTarget::Pitch,
            mask,
            lfo,
            depth,
        );
        let cents = pitch * 100.0 + uniform(rng, -params.detune, params.detune);
        let mut rate = ((cents / 1200.0) as f64).exp2();

        let reversed = rng.random::<f32>() < params.grain_reversal_chance;

        // FM bends the rate by a deviation sampled at spawn time: the grain's pitch
        // then stays fixed for its lifetime
        let fm_amount = modulated(params.fm_amount, LfoTarget::FmAmount, mask, lfo, depth);
        if fm_amount > 0.0 {
            let fm_freq = modulated(params.fm_freq, LfoTarget::FmFreq, mask, lfo, depth);
            let fm_mod = (self.current_time * fm_freq as f64).sin() * (fm_amount as f64 * 0.01);
            rate = (rate + fm_mod).abs().max(MIN_RATE);
        }

        // start position: base position plus spread jitter, kept inside the region
        // the grain can play through without leaving the buffer
        let base = self
            .position
            .base_position(self.smoothed_position.current());
        let position = modulated(base, LfoTarget::Position, mask, lfo, depth);
        let spread = modulated(params.spread, LfoTarget::Spread, mask, lfo, depth);
        let center = position as f64 * buffer_len as f64;
        let offset = uniform(rng, -1.0, 1.0) as f64 * spread as f64 * buffer_len as f64 * 0.5;
        let region = samples_total as f64 * rate;
        let max_start = (buffer_len as f64 - region).max(0.0);
        let start = (center + offset).clamp(0.0, max_start);
        // reversed grains begin at the far end of their region and read backwards
        let read_pos = if reversed {
            (start + region).min(buffer_len as f64 - 1.0)
        } else {
            start
        };

        // equal-power pan with a random per-grain offset
        let pan_center = modulated(self.smoothed_pan.current(), LfoTarget::Pan, mask, lfo, depth);
        let pan_spread = modulated(params.pan_spread, LfoTarget::PanSpread, mask, lfo, depth);
        let pan = (pan_center + uniform(rng, -1.0, 1.0) * pan_spread).clamp(-1.0, 1.0);
        let (pan_l, pan_r) = panning_factors(pan);

        let attack = modulated(params.attack, LfoTarget::Attack, mask, lfo, depth);
        let release = modulated(params.release, LfoTarget::Release, mask, lfo, depth);
        let exponential_env = params.exponential_env;

        let signed_rate = if reversed { -rate } else { rate };
        self.pool.allocate().activate(
            read_pos,
            signed_rate,
            samples_total,
            attack,
            release,
            exponential_env,
            pan_l,
            pan_r,
        );

        // dropped when the UI isn't draining fast enough; reports the actual initial
        // playhead, which for reversed grains is the far end of the region
        let _ = self.events.push(GrainEvent {
            position: (read_pos / buffer_len as f64) as f32,
            duration: grain_size,
            pan,
        });
    }
}

// -------------------------------------------------------------------------------------------------

/// Run the given function with allocation asserts enabled in debug builds.
#[inline(always)]
fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
    #[cfg(all(debug_assertions, feature = "assert-allocs"))]
    return assert_no_alloc::assert_no_alloc::<T, F>(func);
    #[cfg(not(all(debug_assertions, feature = "assert-allocs")))]
    return func();
}

// -------------------------------------------------------------------------------------------------

/// Draw a uniform random value in `[low, high]`.
///
/// Always consumes exactly one draw from the generator, also for empty ranges, which
/// keeps the draw sequence aligned across runs regardless of parameter values.
#[inline]
fn uniform(rng: &mut SmallRng, low: f32, high: f32) -> f32 {
    low + (high - low) * rng.random::<f32>()
}

// -------------------------------------------------------------------------------------------------
