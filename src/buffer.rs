use crate::error::Error;

// -------------------------------------------------------------------------------------------------

/// Source material for the grain engine.
///
/// Grains read the buffer as a single mono channel: multi-channel material is downmixed
/// once at construction time, outside of the audio thread, so the per-grain read path
/// stays a plain indexed slice access. The stereo image of the output is produced by
/// per-grain panning, not by the source layout.
///
/// Once committed to the engine, the buffer is exclusively owned by the audio thread
/// until it gets replaced by the next commit.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Box<[f32]>,
    source_channel_count: usize,
}

impl SampleBuffer {
    /// Create a new buffer from interleaved sample data with the given channel layout.
    ///
    /// Empty data is valid and results in an engine that renders silence.
    pub fn new(data: Vec<f32>, channel_count: usize) -> Result<Self, Error> {
        if channel_count == 0 {
            return Err(Error::InvalidChannelLayout(channel_count));
        }
        let samples = if channel_count == 1 {
            data.into_boxed_slice()
        } else {
            // downmix interleaved frames by averaging channels
            let frame_count = data.len() / channel_count;
            let scale = 1.0 / channel_count as f32;
            let mut mono = Vec::with_capacity(frame_count);
            for frame in data.chunks_exact(channel_count) {
                mono.push(frame.iter().sum::<f32>() * scale);
            }
            mono.into_boxed_slice()
        };
        Ok(Self {
            samples,
            source_channel_count: channel_count,
        })
    }

    /// Number of mono frames in the buffer.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.samples.len()
    }

    /// Is there anything to granulate?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Channel count of the committed source material, before downmixing.
    pub fn source_channel_count(&self) -> usize {
        self.source_channel_count
    }

    /// Read-only access to the mono sample data.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_passthrough() {
        let buffer = SampleBuffer::new(vec![0.1, 0.2, 0.3], 1).unwrap();
        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(buffer.samples(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn stereo_downmix() {
        let buffer = SampleBuffer::new(vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2).unwrap();
        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(buffer.samples(), &[0.5, 0.5, 0.0]);
        assert_eq!(buffer.source_channel_count(), 2);
    }

    #[test]
    fn empty_and_invalid() {
        let buffer = SampleBuffer::new(vec![], 1).unwrap();
        assert!(buffer.is_empty());
        assert!(SampleBuffer::new(vec![0.0; 4], 0).is_err());
    }
}
