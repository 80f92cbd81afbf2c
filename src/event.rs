//! Visualization events emitted by the engine for UI consumers.

// -------------------------------------------------------------------------------------------------

/// Capacity of the grain event ring between the audio thread and the UI.
///
/// At the maximum spawn rate of 200 grains per second a consumer draining at a
/// typical ~30ms UI cadence sees at most 7 new events per visit, so 64 slots leave
/// ample headroom. When the ring is full, new events are dropped.
pub const GRAIN_EVENT_CAPACITY: usize = 64;

// -------------------------------------------------------------------------------------------------

/// A snapshot of a freshly spawned grain, for visualization purposes.
///
/// Events are produced on the audio thread and consumed via
/// [`EngineController::drain_grain_events`](crate::EngineController::drain_grain_events).
/// They carry no sample data, just where and how a grain started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainEvent {
    /// Normalized initial read position of the grain in the source buffer, in \[0, 1].
    /// Reversed grains start at the far end of their region and read towards its start.
    pub position: f32,
    /// Grain duration in seconds.
    pub duration: f32,
    /// Final panning position of the grain, in \[-1, 1].
    pub pan: f32,
}
