//! Deferred single-shot scheduling.
//!
//! The store's miss aggregation needs exactly one capability: "run this
//! callback on a later tick". [`Scheduler`] captures that as a single
//! operation so hosts with a real frame-presentation primitive can plug
//! their own in. Two implementations ship here:
//!
//! - [`TimerScheduler`]: the default. Deadline-based over a monotonic
//!   clock; the host pumps [`TimerScheduler::poll`] once per frame/tick
//!   and due callbacks run in schedule order. The default delay is one
//!   frame interval ([`FRAME_INTERVAL`], 16 ms).
//! - [`ManualScheduler`]: deterministic test pump; nothing runs until
//!   [`ManualScheduler::run_pending`] is called.
//!
//! # Invariants
//!
//! 1. `schedule_once` never invokes the callback inline; callbacks only
//!    run from a later pump. (The aggregator's
//!    schedule-then-buffer ordering depends on this.)
//! 2. A callback scheduled during a pump runs on a later pump, never
//!    the same drain.
//! 3. Each callback runs at most once.

use std::cell::RefCell;
use std::fmt;
use std::time::Duration;

use web_time::Instant;

/// One frame at ~60 Hz, the default flush delay.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// A deferred callback.
pub type ScheduledCallback = Box<dyn FnOnce()>;

/// Capability to run a callback on a later tick of the host's loop.
///
/// Implementations must defer: `schedule_once` enqueues and returns,
/// and the callback runs from whatever pump the implementation uses,
/// never inline from `schedule_once` itself.
pub trait Scheduler {
    /// Enqueue `callback` to run once, on a later tick.
    fn schedule_once(&self, callback: ScheduledCallback);
}

/// Deadline-based scheduler over a monotonic clock.
///
/// `schedule_once` stamps each callback with `now + delay`; the host
/// calls [`poll`](TimerScheduler::poll) once per tick and everything
/// whose deadline has passed runs, in schedule order.
pub struct TimerScheduler {
    queue: RefCell<Vec<(Instant, ScheduledCallback)>>,
    delay: Duration,
}

impl TimerScheduler {
    /// A scheduler with the default one-frame delay.
    #[must_use]
    pub fn new() -> Self {
        Self::with_delay(FRAME_INTERVAL)
    }

    /// A scheduler with a custom delay. `Duration::ZERO` makes every
    /// callback due on the next poll.
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            queue: RefCell::new(Vec::new()),
            delay,
        }
    }

    /// Run every callback whose deadline has passed. Returns how many
    /// ran. Callbacks scheduled while polling land in the live queue
    /// and wait for a later poll.
    pub fn poll(&self) -> usize {
        let now = Instant::now();
        let due: Vec<ScheduledCallback> = {
            let mut queue = self.queue.borrow_mut();
            let mut due = Vec::new();
            let mut index = 0;
            while index < queue.len() {
                if queue[index].0 <= now {
                    due.push(queue.remove(index).1);
                } else {
                    index += 1;
                }
            }
            due
        };
        let count = due.len();
        for callback in due {
            callback();
        }
        count
    }

    /// Callbacks still waiting on their deadline.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl Scheduler for TimerScheduler {
    fn schedule_once(&self, callback: ScheduledCallback) {
        let deadline = Instant::now() + self.delay;
        self.queue.borrow_mut().push((deadline, callback));
        tracing::trace!(pending = self.queue.borrow().len(), "callback scheduled");
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimerScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerScheduler")
            .field("pending", &self.queue.borrow().len())
            .field("delay", &self.delay)
            .finish()
    }
}

/// Test scheduler: callbacks queue up until explicitly pumped.
pub struct ManualScheduler {
    queue: RefCell<Vec<ScheduledCallback>>,
}

impl ManualScheduler {
    /// An empty manual scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(Vec::new()),
        }
    }

    /// Run everything currently queued, in schedule order. Returns how
    /// many ran. Callbacks scheduled by the callbacks themselves wait
    /// for the next call.
    pub fn run_pending(&self) -> usize {
        let due = std::mem::take(&mut *self.queue.borrow_mut());
        let count = due.len();
        for callback in due {
            callback();
        }
        count
    }

    /// Callbacks waiting to be pumped.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, callback: ScheduledCallback) {
        self.queue.borrow_mut().push(callback);
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.queue.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    // ---- ManualScheduler ----

    #[test]
    fn manual_runs_nothing_until_pumped() {
        let scheduler = ManualScheduler::new();
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        scheduler.schedule_once(Box::new(move || flag.set(true)));

        assert!(!ran.get(), "schedule_once must not invoke inline");
        assert_eq!(scheduler.run_pending(), 1);
        assert!(ran.get());
    }

    #[test]
    fn manual_reschedule_during_pump_waits() {
        let scheduler = Rc::new(ManualScheduler::new());
        let runs = Rc::new(Cell::new(0));
        let inner = {
            let scheduler = Rc::clone(&scheduler);
            let runs = Rc::clone(&runs);
            Box::new(move || {
                runs.set(runs.get() + 1);
                let runs = Rc::clone(&runs);
                scheduler.schedule_once(Box::new(move || runs.set(runs.get() + 1)));
            })
        };
        scheduler.schedule_once(inner);

        assert_eq!(scheduler.run_pending(), 1, "only the first callback runs");
        assert_eq!(runs.get(), 1);
        assert_eq!(scheduler.pending(), 1, "rescheduled callback is queued");
        assert_eq!(scheduler.run_pending(), 1);
        assert_eq!(runs.get(), 2);
    }

    // ---- TimerScheduler ----

    #[test]
    fn timer_zero_delay_is_due_on_next_poll() {
        let scheduler = TimerScheduler::with_delay(Duration::ZERO);
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        scheduler.schedule_once(Box::new(move || flag.set(true)));

        assert_eq!(scheduler.poll(), 1);
        assert!(ran.get());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn timer_holds_callback_until_deadline() {
        let scheduler = TimerScheduler::with_delay(Duration::from_secs(3600));
        scheduler.schedule_once(Box::new(|| panic!("must not run")));

        assert_eq!(scheduler.poll(), 0, "deadline far in the future");
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn timer_runs_due_callbacks_in_schedule_order() {
        let scheduler = TimerScheduler::with_delay(Duration::ZERO);
        let order: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        for tag in [1u8, 2, 3] {
            let order = Rc::clone(&order);
            scheduler.schedule_once(Box::new(move || order.borrow_mut().push(tag)));
        }

        assert_eq!(scheduler.poll(), 3);
        assert_eq!(&*order.borrow(), &[1, 2, 3]);
    }
}
