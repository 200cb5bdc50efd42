//! Sample-accurate sequencer event scheduling.
//!
//! Sequencer events arrive through the seq queue in any order, stamped with
//! an absolute frame. The scheduler keeps them in a bounded list sorted by
//! frame and hands them back as the engine's frame counter reaches them.
//! A note-on with a length also books its note-off at `frame + length`.
//!
//! Both lists are allocated once at construction and never grow: events that
//! arrive while a list is full are dropped and counted.

use crate::synth::message::SeqEvent;

/// A note trigger fired by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingOff {
    frame: u64,
    note: u8,
}

pub struct Scheduler {
    /// Sorted by frame; equal frames keep arrival order.
    pending: Vec<SeqEvent>,
    note_offs: Vec<PendingOff>,
    capacity: usize,
    dropped: u64,
}

impl Scheduler {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pending: Vec::with_capacity(capacity),
            note_offs: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Queue an event for its frame. Returns false if the list was full.
    pub fn schedule(&mut self, event: SeqEvent) -> bool {
        if self.pending.len() == self.capacity {
            self.dropped += 1;
            return false;
        }
        let at = self.pending.partition_point(|e| e.frame <= event.frame);
        self.pending.insert(at, event);
        true
    }

    /// Earliest frame with something to fire.
    pub fn next_frame(&self) -> Option<u64> {
        let on = self.pending.first().map(|e| e.frame);
        let off = self.note_offs.first().map(|o| o.frame);
        match (on, off) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Take the next trigger due at or before `frame`. At equal frames
    /// note-offs come before note-ons so a retriggered note restarts.
    /// Events whose frame has already passed are due immediately.
    pub fn pop_due(&mut self, frame: u64) -> Option<Trigger> {
        let off_due = self.note_offs.first().filter(|o| o.frame <= frame).copied();
        let on_due = self.pending.first().filter(|e| e.frame <= frame).copied();

        match (off_due, on_due) {
            (Some(off), Some(on)) if off.frame <= on.frame => Some(self.take_off(off)),
            (_, Some(on)) => {
                self.pending.remove(0);
                if on.length_frames > 0 {
                    self.book_off(on.frame.max(frame) + on.length_frames as u64, on.note);
                }
                Some(Trigger::NoteOn {
                    note: on.note,
                    velocity: on.velocity,
                })
            }
            (Some(off), None) => Some(self.take_off(off)),
            (None, None) => None,
        }
    }

    fn take_off(&mut self, off: PendingOff) -> Trigger {
        self.note_offs.remove(0);
        Trigger::NoteOff { note: off.note }
    }

    fn book_off(&mut self, frame: u64, note: u8) {
        if self.note_offs.len() == self.capacity {
            self.dropped += 1;
            return;
        }
        let at = self.note_offs.partition_point(|o| o.frame <= frame);
        self.note_offs.insert(at, PendingOff { frame, note });
    }

    /// Forget every booked note-off. Pending note-ons are kept.
    pub fn clear_note_offs(&mut self) {
        self.note_offs.clear();
    }

    /// Events waiting to fire, not counting booked note-offs.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_note_offs(&self) -> usize {
        self.note_offs.len()
    }

    /// Events and note-offs dropped because a list was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
