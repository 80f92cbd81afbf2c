//! Control messages crossing from the control thread into the audio thread.

use crate::parameter::GranularParams;

// -------------------------------------------------------------------------------------------------

/// Capacity of the bounded command queue between controller and engine.
///
/// When the queue overflows the oldest pending command is dropped: commands are
/// idempotent state updates, so the most recent one wins. Sample buffers travel
/// through their own single-slot mailbox and are never displaced by commands.
pub(crate) const COMMAND_QUEUE_CAPACITY: usize = 64;

// -------------------------------------------------------------------------------------------------

/// Commands applied by the engine at the start of its next process call.
///
/// Each command carries a fully formed value: the audio thread never observes a
/// partially updated parameter record or position state.
pub(crate) enum EngineMessage {
    /// Atomically replace the engine parameter record.
    SetParams(GranularParams),
    /// Begin granulating: the first grain spawns at the current engine time.
    Start,
    /// Stop granulating and deactivate all grains.
    Stop,
    /// Pin the grain read position to the given normalized position, or release it.
    SetFrozen { frozen: bool, position: f32 },
    /// Engage a random position walk around `base`, or release it.
    SetDrift {
        drifting: bool,
        base: f32,
        speed: f32,
        return_tendency: f32,
    },
    /// Deactivate all grains without touching transport state.
    ResetPool,
}
