//! MIDI byte-stream decoding.

/*
MIDI Running Status
===================

A MIDI stream is a sequence of bytes. Bytes with the top bit set are STATUS
bytes, the rest are DATA bytes (0..=127).

    status  1sss cccc    s = message type, c = channel (0-15)
    data    0ddd dddd

Vocabulary
----------

  running status   The last channel-voice status byte seen. Senders may omit
                   the status byte when it repeats, so `90 3C 64 40 5A`
                   means two Note On messages on channel 0.

  data length      How many data bytes complete a message. It is fixed by the
                   high nibble of the status:

                       0x80 Note Off          2
                       0x90 Note On           2
                       0xA0 Poly Pressure     2
                       0xB0 Control Change    2
                       0xC0 Program Change    1
                       0xD0 Channel Pressure  1
                       0xE0 Pitch Bend        2

  system bytes     0xF0..=0xF7 are system common / SysEx and cancel running
                   status. 0xF8..=0xFF are real-time (clock, start, stop) and
                   may appear anywhere, even between data bytes, without
                   disturbing the message in progress.


Chunk Boundaries
----------------

Platform drivers hand us bytes in packets. A message can straddle two
packets:

    packet 1: 90 3C        packet 2: 64 40 5A

With `RunningStatusScope::Stream` (the default) the parser keeps running
status and any partially received data across calls, so the example above
yields NoteOn(60, 100) and NoteOn(64, 90). `RunningStatusScope::Chunk`
forgets everything at the start of each call, for drivers that guarantee
whole messages per packet and want a corrupt packet isolated from the next.


Resynchronizing
---------------

Data bytes with no running status are dropped. A status byte that arrives
before the previous message completed abandons the partial message and
starts the new one. Both are counted in `ParserStats`.
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::synth::message::EventSink;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEventKind {
    NoteOff,
    NoteOn,
    PolyPressure,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
}

impl MidiEventKind {
    /// Decode a channel-voice status byte. Returns `None` for system bytes.
    pub fn from_status(status: u8) -> Option<Self> {
        match status & 0xF0 {
            0x80 => Some(MidiEventKind::NoteOff),
            0x90 => Some(MidiEventKind::NoteOn),
            0xA0 => Some(MidiEventKind::PolyPressure),
            0xB0 => Some(MidiEventKind::ControlChange),
            0xC0 => Some(MidiEventKind::ProgramChange),
            0xD0 => Some(MidiEventKind::ChannelPressure),
            0xE0 => Some(MidiEventKind::PitchBend),
            _ => None,
        }
    }

    pub fn status_nibble(self) -> u8 {
        match self {
            MidiEventKind::NoteOff => 0x80,
            MidiEventKind::NoteOn => 0x90,
            MidiEventKind::PolyPressure => 0xA0,
            MidiEventKind::ControlChange => 0xB0,
            MidiEventKind::ProgramChange => 0xC0,
            MidiEventKind::ChannelPressure => 0xD0,
            MidiEventKind::PitchBend => 0xE0,
        }
    }

    pub fn data_len(self) -> usize {
        match self {
            MidiEventKind::ProgramChange | MidiEventKind::ChannelPressure => 1,
            _ => 2,
        }
    }
}

/// One decoded channel-voice message.
///
/// Single-data-byte messages (program change, channel pressure) carry their
/// value in `data1` and leave `data2` at zero.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    pub kind: MidiEventKind,
    pub channel: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiEvent {
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            kind: MidiEventKind::NoteOn,
            channel: channel & 0x0F,
            data1: note & 0x7F,
            data2: velocity & 0x7F,
        }
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            kind: MidiEventKind::NoteOff,
            channel: channel & 0x0F,
            data1: note & 0x7F,
            data2: velocity & 0x7F,
        }
    }

    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self {
            kind: MidiEventKind::ControlChange,
            channel: channel & 0x0F,
            data1: controller & 0x7F,
            data2: value & 0x7F,
        }
    }

    /// Build a pitch bend from a 14-bit value (8192 = centre).
    pub fn pitch_bend(channel: u8, value: u16) -> Self {
        let value = value.min(0x3FFF);
        Self {
            kind: MidiEventKind::PitchBend,
            channel: channel & 0x0F,
            data1: (value & 0x7F) as u8,
            data2: (value >> 7) as u8,
        }
    }

    /// Pitch bend position in [-1, 1), zero at centre.
    pub fn bend_amount(&self) -> f32 {
        let raw = ((self.data2 as i32) << 7) | self.data1 as i32;
        (raw - 8192) as f32 / 8192.0
    }
}

/// Whether running status survives from one `feed` call to the next.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunningStatusScope {
    #[default]
    Stream,
    Chunk,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Complete messages emitted.
    pub events: u64,
    /// Data bytes discarded for lack of running status, plus SysEx payload.
    pub skipped_bytes: u64,
    /// Partial messages abandoned by an early status byte or a chunk reset.
    pub interrupted: u64,
}

/// Streaming running-status decoder.
pub struct MidiParser {
    scope: RunningStatusScope,
    running_status: Option<u8>,
    data: [u8; 2],
    received: usize,
    stats: ParserStats,
}

impl MidiParser {
    pub fn new(scope: RunningStatusScope) -> Self {
        Self {
            scope,
            running_status: None,
            data: [0; 2],
            received: 0,
            stats: ParserStats::default(),
        }
    }

    /// Decode `bytes`, handing each completed message to `sink`.
    ///
    /// Returns the number of messages emitted by this call.
    pub fn feed<S: EventSink<MidiEvent> + ?Sized>(&mut self, bytes: &[u8], sink: &mut S) -> usize {
        if self.scope == RunningStatusScope::Chunk {
            self.reset();
        }

        let mut emitted = 0;
        for &byte in bytes {
            if let Some(event) = self.push_byte(byte) {
                sink.dispatch(event);
                emitted += 1;
            }
        }
        emitted
    }

    /// Advance the state machine by one byte.
    pub fn push_byte(&mut self, byte: u8) -> Option<MidiEvent> {
        if byte >= 0xF8 {
            // Real-time messages interleave freely
            return None;
        }

        if byte >= 0xF0 {
            self.abandon_partial();
            self.running_status = None;
            return None;
        }

        if byte & 0x80 != 0 {
            self.abandon_partial();
            self.running_status = Some(byte);
            return None;
        }

        let Some(status) = self.running_status else {
            self.stats.skipped_bytes += 1;
            return None;
        };
        let kind = MidiEventKind::from_status(status)?;

        self.data[self.received] = byte;
        self.received += 1;
        if self.received < kind.data_len() {
            return None;
        }
        self.received = 0;

        let channel = status & 0x0F;
        let data2 = if kind.data_len() == 2 { self.data[1] } else { 0 };
        let kind = match kind {
            MidiEventKind::NoteOn if data2 == 0 => MidiEventKind::NoteOff,
            other => other,
        };

        self.stats.events += 1;
        Some(MidiEvent {
            kind,
            channel,
            data1: self.data[0],
            data2,
        })
    }

    /// Forget running status and any partial message.
    pub fn reset(&mut self) {
        self.abandon_partial();
        self.running_status = None;
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    pub fn scope(&self) -> RunningStatusScope {
        self.scope
    }

    fn abandon_partial(&mut self) {
        if self.received > 0 {
            self.stats.interrupted += 1;
            self.received = 0;
        }
    }
}

impl Default for MidiParser {
    fn default() -> Self {
        Self::new(RunningStatusScope::Stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(parser: &mut MidiParser, bytes: &[u8]) -> Vec<MidiEvent> {
        let mut out = Vec::new();
        parser.feed(bytes, &mut |ev: MidiEvent| out.push(ev));
        out
    }

    #[test]
    fn running_status_across_chunks() {
        let mut parser = MidiParser::default();
        let mut events = parse(&mut parser, &[0x90, 60, 100]);
        events.extend(parse(&mut parser, &[64, 90]));

        assert_eq!(
            events,
            vec![MidiEvent::note_on(0, 60, 100), MidiEvent::note_on(0, 64, 90)]
        );
    }

    #[test]
    fn message_split_mid_data_completes_in_stream_scope() {
        let mut parser = MidiParser::default();
        let mut events = parse(&mut parser, &[0x91, 60]);
        assert!(events.is_empty());
        events.extend(parse(&mut parser, &[100]));
        assert_eq!(events, vec![MidiEvent::note_on(1, 60, 100)]);
    }

    #[test]
    fn chunk_scope_forgets_running_status() {
        let mut parser = MidiParser::new(RunningStatusScope::Chunk);
        let first = parse(&mut parser, &[0x90, 60, 100]);
        let second = parse(&mut parser, &[64, 90]);

        assert_eq!(first.len(), 1);
        assert!(second.is_empty(), "data without status must be dropped");
        assert_eq!(parser.stats().skipped_bytes, 2);
    }

    #[test]
    fn note_on_velocity_zero_is_note_off() {
        let mut parser = MidiParser::default();
        let events = parse(&mut parser, &[0x93, 72, 0]);
        assert_eq!(events, vec![MidiEvent::note_off(3, 72, 0)]);
    }

    #[test]
    fn single_data_byte_messages() {
        let mut parser = MidiParser::default();
        let events = parse(&mut parser, &[0xC2, 5, 7, 0xD0, 99]);

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, MidiEventKind::ProgramChange);
        assert_eq!((events[0].channel, events[0].data1, events[0].data2), (2, 5, 0));
        assert_eq!(events[1].data1, 7, "running status applies to program change");
        assert_eq!(events[2].kind, MidiEventKind::ChannelPressure);
        assert_eq!(events[2].data1, 99);
    }

    #[test]
    fn realtime_bytes_do_not_break_messages() {
        let mut parser = MidiParser::default();
        let events = parse(&mut parser, &[0x90, 0xF8, 60, 0xFE, 100]);
        assert_eq!(events, vec![MidiEvent::note_on(0, 60, 100)]);
    }

    #[test]
    fn sysex_clears_running_status() {
        let mut parser = MidiParser::default();
        let events = parse(&mut parser, &[0x90, 60, 100, 0xF0, 1, 2, 0xF7, 61, 100]);

        assert_eq!(events.len(), 1);
        assert_eq!(parser.stats().skipped_bytes, 4);
    }

    #[test]
    fn early_status_abandons_partial_message() {
        let mut parser = MidiParser::default();
        let events = parse(&mut parser, &[0x90, 60, 0xB0, 1, 64]);

        assert_eq!(events, vec![MidiEvent::control_change(0, 1, 64)]);
        assert_eq!(parser.stats().interrupted, 1);
    }

    #[test]
    fn pitch_bend_centre_and_extremes() {
        assert_eq!(MidiEvent::pitch_bend(0, 8192).bend_amount(), 0.0);
        assert_eq!(MidiEvent::pitch_bend(0, 0).bend_amount(), -1.0);
        assert!(MidiEvent::pitch_bend(0, 0x3FFF).bend_amount() > 0.999);

        let mut parser = MidiParser::default();
        let events = parse(&mut parser, &[0xE0, 0x00, 0x40]);
        assert_eq!(events[0].bend_amount(), 0.0);
    }
}
