#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod buffer;
mod engine;
mod error;
mod event;
mod modulation;

// public, flat re-exports
pub use buffer::SampleBuffer;
pub use engine::{EngineController, GranularEngine, GRAIN_POOL_SIZE};
pub use error::Error;
pub use event::{GrainEvent, GRAIN_EVENT_CAPACITY};
pub use modulation::{modulated, LfoTarget, LfoTargetMask};
pub use parameter::GranularParams;
pub use utils::lfo::LfoShape;

// public mods
pub mod parameter;
pub mod utils;
