//! Engine status published from the audio thread after every block.

use rtrb::{Consumer, Producer, RingBuffer};

/// Snapshots kept in flight between the audio thread and the monitor.
const STATUS_RING_SIZE: usize = 64;

/// State of the engine at the end of one block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineStatus {
    /// Frames rendered since the engine was created.
    pub frame: u64,
    pub active_voices: usize,
    /// Peak absolute sample value in the block, after the limiter.
    pub peak: f32,
    /// Sequencer events dropped because the pending list was full.
    pub seq_dropped: u64,
}

/// Audio-thread side of the status ring.
pub(crate) struct StatusPublisher {
    tx: Producer<EngineStatus>,
}

impl StatusPublisher {
    /// A full ring means the monitor has fallen behind; the snapshot is
    /// dropped and the next one carries newer state anyway.
    pub(crate) fn publish(&mut self, status: EngineStatus) {
        let _ = self.tx.push(status);
    }
}

/// Control-thread view of the engine's published status.
pub struct StatusMonitor {
    rx: Consumer<EngineStatus>,
    latest: EngineStatus,
}

impl StatusMonitor {
    /// Drain every published snapshot and return the newest, if any arrived.
    pub fn poll(&mut self) -> Option<EngineStatus> {
        let mut newest = None;
        while let Ok(status) = self.rx.pop() {
            newest = Some(status);
        }
        if let Some(status) = newest {
            self.latest = status;
        }
        newest
    }

    /// The newest snapshot seen by `poll`.
    pub fn latest(&self) -> EngineStatus {
        self.latest
    }
}

pub(crate) fn status_channel() -> (StatusPublisher, StatusMonitor) {
    let (tx, rx) = RingBuffer::<EngineStatus>::new(STATUS_RING_SIZE);
    (
        StatusPublisher { tx },
        StatusMonitor {
            rx,
            latest: EngineStatus::default(),
        },
    )
}
