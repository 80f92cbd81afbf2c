//! Renders a granulated pad texture offline into a wav file.

use graincloud::{GranularEngine, GranularParams, LfoShape, LfoTarget, LfoTargetMask};

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const SAMPLE_RATE: u32 = 48000;
const BLOCK_SIZE: usize = 128;
const RENDER_SECONDS: usize = 20;
const OUTPUT_PATH: &str = "render-grains.wav";

// -------------------------------------------------------------------------------------------------

/// Generate a few seconds of decaying harmonic material to granulate.
fn source_material() -> Vec<f32> {
    let frames = SAMPLE_RATE as usize * 4;
    let mut samples = Vec::with_capacity(frames);
    for i in 0..frames {
        let t = i as f32 / SAMPLE_RATE as f32;
        let decay = (-t * 0.8).exp();
        let mut value = 0.0;
        for (harmonic, level) in [(1.0, 0.5), (2.0, 0.25), (3.0, 0.15), (5.0, 0.1)] {
            value += (t * 110.0 * harmonic * std::f32::consts::TAU).sin() * level;
        }
        samples.push(value * decay * 0.5);
    }
    samples
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (mut engine, mut controller) = GranularEngine::new(SAMPLE_RATE)?;

    controller.set_sample_buffer(source_material(), 1)?;
    controller.update_params(GranularParams {
        grain_size: 0.15,
        density: 0.02,
        spread: 0.4,
        position: 0.2,
        pitch: 0.0,
        detune: 12.0,
        pan_spread: 0.6,
        grain_reversal_chance: 0.2,
        attack: 0.4,
        release: 0.4,
        lfo_rate: 0.2,
        lfo_amount: 0.6,
        lfo_shape: LfoShape::Sine,
        lfo_targets: LfoTargetMask::empty()
            .with(LfoTarget::Position)
            .with(LfoTarget::GrainSize),
        volume: 0.8,
        ..GranularParams::default()
    });
    // wander slowly around the first quarter of the material
    controller.set_drift(true, 0.25, 0.3, 0.5);
    controller.start();

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(OUTPUT_PATH, spec)?;

    let mut left = vec![0.0f32; BLOCK_SIZE];
    let mut right = vec![0.0f32; BLOCK_SIZE];
    let mut spawned = 0;
    for _ in 0..(RENDER_SECONDS * SAMPLE_RATE as usize / BLOCK_SIZE) {
        engine.process(&mut left, &mut right);
        for (l, r) in left.iter().zip(right.iter()) {
            writer.write_sample(*l)?;
            writer.write_sample(*r)?;
        }
        spawned += controller.drain_grain_events().len();
    }
    writer.finalize()?;

    println!("Rendered {spawned} grains into '{OUTPUT_PATH}'");
    Ok(())
}
