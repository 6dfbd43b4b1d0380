//! Coarse timers for re-arming scheduling passes.
//!
//! Timers run on the host clock (wall time), not on the audio clock. Every
//! pending timer has a revocable [`TimerHandle`], so "at most one pending
//! re-arm per voice" is something tests can check directly.

use slotmap::SlotMap;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

slotmap::new_key_type! {
    /// Revocable handle to a pending timer.
    pub struct TimerHandle;
}

/// Source of host (wall-clock) time for the timer queue.
pub trait HostClock {
    /// Time elapsed since some fixed origin.
    fn now(&self) -> Duration;
}

/// Host clock backed by `Instant`.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Host clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock(Rc<Cell<Duration>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.0.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl HostClock for ManualClock {
    fn now(&self) -> Duration {
        self.0.get()
    }
}

#[derive(Clone, Debug)]
struct Pending<T> {
    deadline: Duration,
    seq: u64,
    task: T,
}

/// One-shot timers keyed by handle. A task re-arms by scheduling a new
/// timer when it fires.
#[derive(Clone, Debug)]
pub struct TimerQueue<T> {
    pending: SlotMap<TimerHandle, Pending<T>>,
    seq: u64,
}

impl<T: Copy> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: SlotMap::with_key(),
            seq: 0,
        }
    }

    /// Arm a timer firing `task` at `deadline`.
    pub fn schedule(&mut self, deadline: Duration, task: T) -> TimerHandle {
        self.seq += 1;
        self.pending.insert(Pending {
            deadline,
            seq: self.seq,
            task,
        })
    }

    /// Revoke a pending timer. Returns false if it already fired or was
    /// cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.pending.remove(handle).is_some()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.contains_key(handle)
    }

    /// Earliest deadline among pending timers.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return the earliest timer due at `now`. Timers with the
    /// same deadline fire in the order they were armed.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerHandle, T)> {
        let (handle, _) = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .min_by_key(|(_, p)| (p.deadline, p.seq))?;
        let fired = self.pending.remove(handle)?;
        Some((handle, fired.task))
    }

    /// Tasks of all pending timers.
    pub fn tasks(&self) -> impl Iterator<Item = T> + '_ {
        self.pending.values().map(|p| p.task)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T: Copy> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn fires_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule(ms(30), 'c');
        q.schedule(ms(10), 'a');
        q.schedule(ms(20), 'b');

        assert_eq!(q.next_deadline(), Some(ms(10)));
        let fired: Vec<char> = std::iter::from_fn(|| q.pop_due(ms(100)).map(|(_, t)| t)).collect();
        assert_eq!(fired, vec!['a', 'b', 'c']);
        assert!(q.is_empty());
    }

    #[test]
    fn nothing_fires_before_deadline() {
        let mut q = TimerQueue::new();
        q.schedule(ms(50), 1);
        assert!(q.pop_due(ms(49)).is_none());
        assert_eq!(q.pop_due(ms(50)).map(|(_, t)| t), Some(1));
    }

    #[test]
    fn equal_deadlines_fire_in_arm_order() {
        let mut q = TimerQueue::new();
        q.schedule(ms(5), 2);
        q.schedule(ms(5), 1);
        q.schedule(ms(5), 3);
        let fired: Vec<i32> = std::iter::from_fn(|| q.pop_due(ms(5)).map(|(_, t)| t)).collect();
        assert_eq!(fired, vec![2, 1, 3]);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut q = TimerQueue::new();
        let h = q.schedule(ms(10), 7);
        assert!(q.is_pending(h));
        assert!(q.cancel(h));
        assert!(!q.is_pending(h));
        assert!(!q.cancel(h));
        assert!(q.pop_due(ms(1000)).is_none());
    }

    #[test]
    fn fired_handle_is_no_longer_pending() {
        let mut q = TimerQueue::new();
        let h = q.schedule(ms(1), ());
        let (fired, ()) = q.pop_due(ms(1)).unwrap();
        assert_eq!(fired, h);
        assert!(!q.is_pending(h));
        assert!(!q.cancel(h));
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let view = clock.clone();
        clock.advance(ms(80));
        assert_eq!(view.now(), ms(80));
        view.set(ms(5));
        assert_eq!(clock.now(), ms(5));
    }
}
