#![forbid(unsafe_code)]

//! Trailing-edge debouncing for bursty event sources.
//!
//! A [`Debouncer`] belongs to exactly one event source (the window's resize
//! stream, its scroll stream). Every [`trigger`](Debouncer::trigger) cancels
//! the timer scheduled by the previous one, so only the last event of a burst
//! produces work, one quiet period after it arrived.
//!
//! # Invariants
//!
//! - **Latest wins**: at most one timer is pending per debouncer.
//! - **Stale fires are inert**: [`fire`](Debouncer::fire) accepts only the id
//!   of the most recent timer, so a superseded timer that the host failed to
//!   cancel still does nothing.
//! - **Single execution**: N triggers inside one window yield exactly one
//!   accepted fire.

use core::time::Duration;

use crate::dom::{Scheduler, TimerId, TimerTask};

/// Cancel-and-reschedule timer owner for one event source.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    task: TimerTask,
    pending: Option<TimerId>,
}

impl Debouncer {
    /// Debounce `task` by `delay`.
    #[must_use]
    pub const fn new(delay: Duration, task: TimerTask) -> Self {
        Self {
            delay,
            task,
            pending: None,
        }
    }

    /// Record an event: cancel any pending timer and start a fresh one.
    pub fn trigger<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) -> TimerId {
        if let Some(previous) = self.pending.take() {
            scheduler.clear_timeout(previous);
        }
        let id = scheduler.set_timeout(self.delay, self.task);
        self.pending = Some(id);
        id
    }

    /// Accept a timer callback. Returns `true` only for the pending timer,
    /// which is then consumed.
    pub fn fire(&mut self, id: TimerId) -> bool {
        if self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Drop any pending timer.
    pub fn cancel<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let Some(previous) = self.pending.take() {
            scheduler.clear_timeout(previous);
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeDocument;

    const DELAY: Duration = Duration::from_millis(250);

    /// Advance `doc` to `until`, returning how many fires the debouncer accepted.
    fn run_until(doc: &mut FakeDocument, debouncer: &mut Debouncer, until: Duration) -> usize {
        let mut accepted = 0;
        while let Some((id, _)) = doc.pop_due_timer(until) {
            if debouncer.fire(id) {
                accepted += 1;
            }
        }
        doc.set_now(until);
        accepted
    }

    #[test]
    fn burst_fires_once_after_last_event() {
        let mut doc = FakeDocument::new();
        let mut debouncer = Debouncer::new(DELAY, TimerTask::ResizeSettled);

        for step in 0..5u64 {
            debouncer.trigger(&mut doc);
            let next = Duration::from_millis((step + 1) * 100);
            assert_eq!(run_until(&mut doc, &mut debouncer, next), 0);
        }
        // Last trigger at 400ms; nothing before 650ms.
        assert_eq!(
            run_until(&mut doc, &mut debouncer, Duration::from_millis(649)),
            0
        );
        assert_eq!(
            run_until(&mut doc, &mut debouncer, Duration::from_millis(650)),
            1
        );
        assert!(!debouncer.is_pending());
        assert_eq!(doc.pending_timers(), 0);
    }

    #[test]
    fn only_one_timer_is_pending() {
        let mut doc = FakeDocument::new();
        let mut debouncer = Debouncer::new(DELAY, TimerTask::ScrollSettled);
        for _ in 0..10 {
            debouncer.trigger(&mut doc);
        }
        assert_eq!(doc.pending_timers(), 1);
    }

    #[test]
    fn stale_fire_is_rejected() {
        let mut doc = FakeDocument::new();
        let mut debouncer = Debouncer::new(DELAY, TimerTask::ResizeSettled);
        let stale = debouncer.trigger(&mut doc);
        let fresh = debouncer.trigger(&mut doc);
        assert!(!debouncer.fire(stale));
        assert!(debouncer.fire(fresh));
        assert!(!debouncer.fire(fresh));
    }

    #[test]
    fn cancel_clears_pending_timer() {
        let mut doc = FakeDocument::new();
        let mut debouncer = Debouncer::new(DELAY, TimerTask::ResizeSettled);
        debouncer.trigger(&mut doc);
        debouncer.cancel(&mut doc);
        assert!(!debouncer.is_pending());
        assert_eq!(run_until(&mut doc, &mut debouncer, Duration::from_secs(5)), 0);
    }

    #[test]
    fn separate_bursts_fire_separately() {
        let mut doc = FakeDocument::new();
        let mut debouncer = Debouncer::new(DELAY, TimerTask::ResizeSettled);
        debouncer.trigger(&mut doc);
        assert_eq!(run_until(&mut doc, &mut debouncer, Duration::from_secs(1)), 1);
        debouncer.trigger(&mut doc);
        assert_eq!(run_until(&mut doc, &mut debouncer, Duration::from_secs(2)), 1);
    }
}
