// Purpose - external interfaces: event queues, MIDI bytes, audio device

pub mod backend;
pub mod midi;
pub mod queue;
