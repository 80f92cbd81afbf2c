//! Non-realtime control surface of the engine.

use std::sync::Arc;

use basedrop::{Collector, Owned};
use crossbeam_queue::ArrayQueue;

use crate::{buffer::SampleBuffer, error::Error, event::GrainEvent, parameter::GranularParams};

use super::message::EngineMessage;

// -------------------------------------------------------------------------------------------------

/// Control-thread handle to a [`GranularEngine`](crate::GranularEngine).
///
/// All methods are safe to call while the engine is processing on the audio thread:
/// commands and buffers cross over through bounded lock-free queues and are absorbed
/// at the next block boundary. None of the methods block on the audio thread.
///
/// Buffers replaced on the audio thread are not freed there: they are retired into a
/// garbage list that [`collect`](Self::collect) reclaims. Call it now and then from the
/// control thread (committing a new buffer collects implicitly).
pub struct EngineController {
    commands: Arc<ArrayQueue<EngineMessage>>,
    pending_buffer: Arc<ArrayQueue<Owned<SampleBuffer>>>,
    events: Arc<ArrayQueue<GrainEvent>>,
    collector: Collector,
}

impl EngineController {
    pub(crate) fn new(
        commands: Arc<ArrayQueue<EngineMessage>>,
        pending_buffer: Arc<ArrayQueue<Owned<SampleBuffer>>>,
        events: Arc<ArrayQueue<GrainEvent>>,
        collector: Collector,
    ) -> Self {
        Self {
            commands,
            pending_buffer,
            events,
            collector,
        }
    }

    /// Atomically replace the engine's parameter record.
    ///
    /// Values out of range are clamped by the engine. Updates are idempotent: when the
    /// command queue overflows, older pending updates are dropped and the latest wins.
    pub fn update_params(&self, params: GranularParams) {
        self.send(EngineMessage::SetParams(params));
    }

    /// Commit a new sample buffer from interleaved `data` with the given channel layout.
    ///
    /// The engine takes ownership and picks the buffer up at its next block boundary;
    /// the previously committed buffer is reclaimed here once the audio thread has
    /// retired it. Committing an empty buffer is valid and silences the engine.
    ///
    /// Unlike commands, buffers are never dropped on overflow: when a previous commit
    /// is still pending pickup, this fails with [`Error::SendError`] and the caller
    /// should retry after the engine processed a block.
    pub fn set_sample_buffer(&mut self, data: Vec<f32>, channel_count: usize) -> Result<(), Error> {
        let buffer = SampleBuffer::new(data, channel_count)?;
        log::debug!(
            "Committing sample buffer: {} frames, {} source channel(s)",
            buffer.frame_count(),
            channel_count
        );
        let owned = Owned::new(&self.collector.handle(), buffer);
        self.pending_buffer
            .push(owned)
            .map_err(|_buffer| Error::SendError)?;
        self.collect();
        Ok(())
    }

    /// Start granulating.
    pub fn start(&self) {
        self.send(EngineMessage::Start);
    }

    /// Stop granulating and deactivate all grains.
    ///
    /// Stopping is immediate and does not fade: ramp the output gain down first when a
    /// click-free stop is needed.
    pub fn stop(&self) {
        self.send(EngineMessage::Stop);
    }

    /// Pin the grain read position to `position`, or release the pin.
    pub fn set_frozen(&self, frozen: bool, position: f32) {
        self.send(EngineMessage::SetFrozen { frozen, position });
    }

    /// Engage a bounded random walk of the read position around `base`, or release it.
    ///
    /// `speed` and `return_tendency` are both in \[0, 1]: the former scales the walk's
    /// step size, the latter the restoring force towards `base`.
    pub fn set_drift(&self, drifting: bool, base: f32, speed: f32, return_tendency: f32) {
        self.send(EngineMessage::SetDrift {
            drifting,
            base,
            speed,
            return_tendency,
        });
    }

    /// Deactivate all grains without touching transport state.
    pub fn reset_pool(&self) {
        self.send(EngineMessage::ResetPool);
    }

    /// Drain all pending grain visualization events.
    ///
    /// Intended to be polled at UI rate (~30ms): the event ring holds 64 entries and
    /// the engine drops new events when it fills up.
    pub fn drain_grain_events(&mut self) -> Vec<GrainEvent> {
        let mut events = Vec::with_capacity(self.events.len());
        while let Some(event) = self.events.pop() {
            events.push(event);
        }
        events
    }

    /// Reclaim sample buffers the audio thread has retired.
    pub fn collect(&mut self) {
        self.collector.collect();
    }

    fn send(&self, message: EngineMessage) {
        // bounded queue: on overflow the oldest pending command is dropped
        if self.commands.force_push(message).is_some() {
            log::warn!("Engine command queue overflowed: dropped the oldest pending command");
        }
    }
}
