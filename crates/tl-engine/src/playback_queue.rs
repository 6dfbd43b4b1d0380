//! Fixed-capacity queue of pulse playbacks waiting for their start frame.

use core::cmp::Ordering;
use heapless::binary_heap::{BinaryHeap, Min};
use tl_ir::PulseBuffer;

use crate::context::GainId;

/// A one-shot playback of a pulse buffer.
#[derive(Clone, Debug)]
pub struct Playback {
    pub buffer: PulseBuffer,
    pub gain: GainId,
    /// Output frame of the first sample.
    pub start: u64,
}

/// Heap entry ordered by start frame, then by push order.
#[derive(Clone, Debug)]
struct Entry {
    seq: u64,
    playback: Playback,
}

impl Entry {
    fn key(&self) -> (u64, u64) {
        (self.playback.start, self.seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Playbacks ordered by start frame, without allocating.
///
/// A min-heap keyed on the start frame, so pushes stay cheap when the
/// queue holds a full lookahead window for every voice. Playbacks with
/// the same start frame come out in the order they were pushed.
#[derive(Clone, Debug, Default)]
pub struct PlaybackQueue<const N: usize> {
    heap: BinaryHeap<Entry, Min, N>,
    seq: u64,
}

impl<const N: usize> PlaybackQueue<N> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    /// Insert a playback. Gives it back if the queue is full.
    pub fn push(&mut self, playback: Playback) -> Result<(), Playback> {
        let entry = Entry {
            seq: self.seq,
            playback,
        };
        self.heap.push(entry).map_err(|e| e.playback)?;
        self.seq += 1;
        Ok(())
    }

    /// Start frame of the earliest playback.
    pub fn peek_start(&self) -> Option<u64> {
        self.heap.peek().map(|e| e.playback.start)
    }

    /// Pop the earliest playback if it starts at or before `frame`.
    pub fn pop_due(&mut self, frame: u64) -> Option<Playback> {
        match self.peek_start() {
            Some(start) if start <= frame => self.heap.pop().map(|e| e.playback),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() == N
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tl_ir::PitchClass;

    fn playback(start: u64, gain: usize) -> Playback {
        Playback {
            buffer: tl_ir::synthesize(8000, PitchClass::High),
            gain: GainId(gain),
            start,
        }
    }

    #[test]
    fn pops_in_start_order() {
        let mut q = PlaybackQueue::<8>::new();
        for start in [30, 10, 20] {
            q.push(playback(start, 0)).unwrap();
        }
        assert_eq!(q.peek_start(), Some(10));
        assert!(q.pop_due(9).is_none());
        let starts: std::vec::Vec<u64> =
            std::iter::from_fn(|| q.pop_due(100).map(|p| p.start)).collect();
        assert_eq!(starts, vec![10, 20, 30]);
    }

    #[test]
    fn equal_starts_are_fifo() {
        let mut q = PlaybackQueue::<8>::new();
        q.push(playback(5, 1)).unwrap();
        q.push(playback(5, 2)).unwrap();
        q.push(playback(5, 3)).unwrap();
        let gains: std::vec::Vec<usize> =
            std::iter::from_fn(|| q.pop_due(5).map(|p| p.gain.0)).collect();
        assert_eq!(gains, vec![1, 2, 3]);
    }

    #[test]
    fn full_queue_rejects() {
        let mut q = PlaybackQueue::<2>::new();
        q.push(playback(1, 0)).unwrap();
        q.push(playback(2, 0)).unwrap();
        assert!(q.is_full());
        let rejected = q.push(playback(3, 7)).unwrap_err();
        assert_eq!(rejected.gain, GainId(7));
        assert_eq!(q.len(), 2);
    }
}
