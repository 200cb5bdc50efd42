//! Fixed-capacity event queues feeding the audio thread.

/*
Event Queues
============

Three queues carry work into the engine: parameters, MIDI events and
sequencer triggers. Each one is a bounded lock-free array queue shared
between any number of producers and exactly one consumer.

Vocabulary
----------

  producer    Any thread holding a clone of the queue (UI, MIDI driver,
              sequencer). Pushing never blocks and never allocates.

  consumer    The audio thread. It drains the queue once per block.

  overflow    A push that finds the queue full. The NEW event is dropped,
              the push reports failure, and the producer moves on.


Overflow Reporting
------------------

A burst that overruns the queue would otherwise flood the log with one line
per dropped event. Instead a single flag tracks the overflow condition:

    push ──full?──► flag already set? ──yes──► count drop, return Err
                          │
                          no
                          ▼
                    set flag, warn once, count report, return Err

The consumer clears the flag after draining, so the next burst is reported
again. Drops are always counted, reports only once per condition.


Ordering
--------

Events from one producer come out in the order they were pushed. There is
no ordering between producers, and none between different queues.
*/

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;

use crate::error::{QueueKind, QueueOverflow};
use crate::synth::message::EventSink;

pub const DEFAULT_PARAM_CAPACITY: usize = 256;
pub const DEFAULT_MIDI_CAPACITY: usize = 512;
pub const DEFAULT_SEQ_CAPACITY: usize = 256;

/// Point-in-time counters for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub len: usize,
    pub capacity: usize,
    pub dropped: u64,
    pub overflow_reports: u64,
}

struct Shared<T> {
    queue: ArrayQueue<T>,
    kind: QueueKind,
    overflowed: AtomicBool,
    dropped: AtomicU64,
    reports: AtomicU64,
}

/// Bounded multi-producer, single-consumer event queue.
///
/// Cloning is cheap: every clone shares the same storage.
pub struct EventQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for EventQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> EventQueue<T> {
    /// Create a queue holding at most `capacity` events (minimum one).
    pub fn new(kind: QueueKind, capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: ArrayQueue::new(capacity.max(1)),
                kind,
                overflowed: AtomicBool::new(false),
                dropped: AtomicU64::new(0),
                reports: AtomicU64::new(0),
            }),
        }
    }

    /// Enqueue an event without blocking. On a full queue the event is dropped.
    pub fn push(&self, event: T) -> Result<(), QueueOverflow> {
        let shared = &*self.shared;
        if shared.queue.push(event).is_ok() {
            return Ok(());
        }

        shared.dropped.fetch_add(1, Ordering::Relaxed);
        let capacity = shared.queue.capacity();
        if !shared.overflowed.swap(true, Ordering::AcqRel) {
            shared.reports.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                queue = %shared.kind,
                capacity,
                "event queue full, dropping newest events until drained"
            );
        }

        Err(QueueOverflow {
            queue: shared.kind,
            capacity,
        })
    }

    /// Pop a single event. Consumer side only.
    pub fn pop(&self) -> Option<T> {
        self.shared.queue.pop()
    }

    /// Hand every queued event to `sink`, oldest first. Consumer side only.
    ///
    /// At most `capacity` events are taken per call, so producers racing the
    /// drain cannot keep the consumer busy indefinitely. Returns the number of
    /// events delivered.
    pub fn drain<S: EventSink<T> + ?Sized>(&self, sink: &mut S) -> usize {
        let shared = &*self.shared;
        let limit = shared.queue.capacity();
        let mut delivered = 0;

        while delivered < limit {
            match shared.queue.pop() {
                Some(event) => {
                    sink.dispatch(event);
                    delivered += 1;
                }
                None => break,
            }
        }

        if shared.overflowed.load(Ordering::Acquire) && !shared.queue.is_full() {
            shared.overflowed.store(false, Ordering::Release);
        }

        delivered
    }

    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    pub fn kind(&self) -> QueueKind {
        self.shared.kind
    }

    /// Total events dropped on overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Number of overflow diagnostics emitted since creation.
    pub fn overflow_reports(&self) -> u64 {
        self.shared.reports.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            len: self.len(),
            capacity: self.capacity(),
            dropped: self.dropped(),
            overflow_reports: self.overflow_reports(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn round_trip_preserves_order() {
        let queue = EventQueue::new(QueueKind::Param, 16);
        for i in 0..10u32 {
            assert!(queue.push(i).is_ok());
        }

        let mut out = Vec::new();
        let delivered = queue.drain(&mut |ev: u32| out.push(ev));

        assert_eq!(delivered, 10);
        assert_eq!(out, (0..10).collect::<Vec<_>>());
        assert!(queue.is_empty());
    }

    #[test]
    fn overflow_drops_newest_and_reports_once() {
        let queue = EventQueue::new(QueueKind::Midi, 4);
        for i in 0..4u32 {
            queue.push(i).unwrap();
        }

        let err = queue.push(99).unwrap_err();
        assert_eq!(err.queue, QueueKind::Midi);
        assert_eq!(err.capacity, 4);
        assert!(queue.push(100).is_err());

        assert_eq!(queue.dropped(), 2);
        assert_eq!(queue.overflow_reports(), 1, "one diagnostic per condition");

        let mut out = Vec::new();
        queue.drain(&mut |ev: u32| out.push(ev));
        assert_eq!(out, vec![0, 1, 2, 3]);
    }

    #[test]
    fn overflow_is_reported_again_after_drain() {
        let queue = EventQueue::new(QueueKind::Seq, 2);
        for i in 0..3u32 {
            let _ = queue.push(i);
        }
        queue.drain(&mut |_ev: u32| {});

        for i in 0..3u32 {
            let _ = queue.push(i);
        }
        assert_eq!(queue.overflow_reports(), 2);
    }

    #[test]
    fn zero_capacity_is_promoted_to_one() {
        let queue = EventQueue::new(QueueKind::Param, 0);
        assert_eq!(queue.capacity(), 1);
        assert!(queue.push(1u8).is_ok());
        assert!(queue.push(2u8).is_err());
    }

    #[test]
    fn concurrent_producers_keep_per_producer_order() {
        let queue = EventQueue::new(QueueKind::Midi, 4096);
        let handles: Vec<_> = (0..4u32)
            .map(|producer| {
                let q = queue.clone();
                thread::spawn(move || {
                    for seq in 0..500u32 {
                        q.push((producer, seq)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut last = [None::<u32>; 4];
        let total = queue.drain(&mut |(producer, seq): (u32, u32)| {
            let slot = &mut last[producer as usize];
            if let Some(prev) = *slot {
                assert!(seq > prev, "producer {} went backwards", producer);
            }
            *slot = Some(seq);
        });
        assert_eq!(total, 2000);
    }
}
