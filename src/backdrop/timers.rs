//! Host-driven timer queue.
//!
//! Tasks are scheduled against a virtual millisecond clock that only moves
//! when the host calls [`TimerQueue::advance`]. There are no timer handles:
//! once scheduled, a task fires. While a task runs the clock reads its due
//! time, so tasks it schedules are relative to that. Deadlines saturate at
//! `u64::MAX`.

use std::cell::RefCell;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

struct Timer {
    due: u64,
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct TimerState {
    now: u64,
    next_seq: u64,
    pending: Vec<Timer>,
}

/// Shared handle to a timer queue.
#[derive(Clone, Default)]
pub struct TimerQueue(Rc<RefCell<TimerState>>);

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.0.borrow().now
    }

    /// Number of tasks waiting to fire.
    pub fn pending(&self) -> usize {
        self.0.borrow().pending.len()
    }

    /// Run `task` once `delay_ms` have elapsed.
    pub fn schedule(&self, delay_ms: u64, task: impl FnOnce() + 'static) {
        let mut state = self.0.borrow_mut();
        let timer = Timer {
            due: state.now.saturating_add(delay_ms),
            seq: state.next_seq,
            task: Box::new(task),
        };
        state.next_seq += 1;
        state.pending.push(timer);
    }

    /// Move the clock forward by `ms`, firing due tasks in (due, scheduling)
    /// order. Tasks may schedule further tasks; those fire too if they fall
    /// inside the window.
    ///
    /// # Returns
    /// The number of tasks fired.
    pub fn advance(&self, ms: u64) -> usize {
        let deadline = self.now().saturating_add(ms);
        let mut fired = 0;
        while let Some(task) = self.pop_due(deadline) {
            task();
            fired += 1;
        }
        self.0.borrow_mut().now = deadline;
        fired
    }

    fn pop_due(&self, deadline: u64) -> Option<Task> {
        let mut state = self.0.borrow_mut();
        let idx = state
            .pending
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(_, timer)| (timer.due, timer.seq))
            .map(|(idx, _)| idx)?;
        let timer = state.pending.swap_remove(idx);
        state.now = timer.due;
        Some(timer.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_due_order() {
        let timers = TimerQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (delay, label) in [(30, "c"), (10, "a"), (20, "b"), (10, "a2")] {
            let log = Rc::clone(&log);
            timers.schedule(delay, move || log.borrow_mut().push(label));
        }

        assert_eq!(timers.advance(15), 2);
        assert_eq!(*log.borrow(), vec!["a", "a2"]);
        assert_eq!(timers.now(), 15);
        assert_eq!(timers.pending(), 2);

        assert_eq!(timers.advance(100), 2);
        assert_eq!(*log.borrow(), vec!["a", "a2", "b", "c"]);
        assert_eq!(timers.now(), 115);
    }

    #[test]
    fn test_nested_scheduling() {
        let timers = TimerQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let inner_timers = timers.clone();
        let inner_log = Rc::clone(&log);
        timers.schedule(5, move || {
            inner_log.borrow_mut().push("outer");
            let log = Rc::clone(&inner_log);
            inner_timers.schedule(5, move || log.borrow_mut().push("inner"));
        });

        assert_eq!(timers.advance(10), 2);
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_nested_task_is_relative_to_its_parent_due_time() {
        let timers = TimerQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_timers = timers.clone();
        let inner_log = Rc::clone(&log);
        timers.schedule(5, move || {
            inner_log.borrow_mut().push(("outer", inner_timers.now()));
            let log = Rc::clone(&inner_log);
            let clock = inner_timers.clone();
            inner_timers.schedule(5, move || log.borrow_mut().push(("inner", clock.now())));
        });
        let other_log = Rc::clone(&log);
        let other_timers = timers.clone();
        timers.schedule(8, move || other_log.borrow_mut().push(("other", other_timers.now())));

        assert_eq!(timers.advance(20), 3);
        assert_eq!(*log.borrow(), vec![("outer", 5), ("other", 8), ("inner", 10)]);
        assert_eq!(timers.now(), 20);
    }

    #[test]
    fn test_huge_delays_saturate() {
        let timers = TimerQueue::new();
        timers.advance(10);
        timers.schedule(u64::MAX, || {});
        assert_eq!(timers.advance(u64::MAX), 1);
        assert_eq!(timers.now(), u64::MAX);

        timers.schedule(1, || {});
        assert_eq!(timers.advance(1), 1);
        assert_eq!(timers.now(), u64::MAX);
    }

    #[test]
    fn test_advance_zero_fires_immediate_tasks() {
        let timers = TimerQueue::new();
        let hit = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&hit);
        timers.schedule(0, move || *flag.borrow_mut() = true);
        assert_eq!(timers.advance(0), 1);
        assert!(*hit.borrow());
    }
}
