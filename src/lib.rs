pub mod dsp;
pub mod effects; // Fixed master effects chain
pub mod engine; // Block orchestration and the control-thread handle
pub mod error;
pub mod io;
pub mod patch;
pub mod synth; // Voices, allocation, modulation and control messages

pub use engine::{EngineConfig, EngineHandle, EngineStatus, StatusMonitor, SynthEngine};
pub use error::{BackendError, QueueOverflow};
pub use io::midi::{MidiEvent, MidiEventKind, MidiParser, RunningStatusScope};
pub use patch::Patch;
pub use synth::message::{ParamId, ParamMsg, ParamValue, SeqEvent};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub const MAX_VOICES: usize = 8;
pub const MAX_UNISON: usize = 5;
pub const MAX_LFO: usize = 4;
pub const MAX_MOD_SLOTS: usize = 16;
pub const WAVETABLE_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
