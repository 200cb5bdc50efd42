//! Error types shared across the engine.
//!
//! Nothing on the audio path returns an error: out-of-range parameters are
//! clamped, malformed MIDI is skipped, and voice exhaustion is handled by
//! stealing. What remains is queue overflow on the producer side and device
//! failures at backend init.

use std::fmt;

use thiserror::Error;

/// Which of the engine's inbound queues an event was headed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Param,
    Midi,
    Seq,
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueueKind::Param => "param",
            QueueKind::Midi => "midi",
            QueueKind::Seq => "seq",
        };
        f.write_str(name)
    }
}

/// A push found its queue full; the event was dropped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{queue} queue is full ({capacity} events), event dropped")]
pub struct QueueOverflow {
    pub queue: QueueKind,
    pub capacity: usize,
}

/// Failure while opening or starting the audio output device.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("no output device available")]
    NoOutputDevice,

    #[error("failed to enumerate output devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;
