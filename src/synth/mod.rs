// Purpose: Voice management, polyphony, MIDI handling
// This layer sits above the DSP primitives and manages the voice pool

pub mod allocator;
pub mod arpeggiator;
pub mod message;
pub mod modulation;
pub mod voice;
