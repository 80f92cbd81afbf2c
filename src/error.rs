use std::{error, fmt};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by graincloud.
///
/// Errors can only arise from non-realtime entry points (engine construction and
/// sample buffer commits): the realtime processing path never fails.
#[derive(Debug)]
pub enum Error {
    InvalidSampleRate(u32),
    InvalidChannelLayout(usize),
    SendError,
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSampleRate(rate) => {
                write!(f, "Invalid engine sample rate: {rate}")
            }
            Self::InvalidChannelLayout(channel_count) => {
                write!(f, "Invalid sample buffer channel count: {channel_count}")
            }
            Self::SendError => write!(f, "Failed to send a message into an engine queue"),
        }
    }
}
