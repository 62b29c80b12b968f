//! Blocking primitives for actor threads.
//!
//! [`PullGate`] parks an actor thread until a pull it requested has been
//! satisfied. [`RunControl`] carries the run-wide stop and pause flags.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

#[derive(Debug, Default)]
struct GateState {
    permit: bool,
    interrupted: bool,
}

/// Single-permit wake-up for one actor thread.
///
/// A `notify` before the matching `wait` is kept, so a wake-up is never
/// lost. `interrupt` releases every current and future wait.
#[derive(Debug, Default)]
pub struct PullGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl PullGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        let mut state = self.state.lock();
        state.permit = true;
        self.cond.notify_all();
    }

    pub fn interrupt(&self) {
        let mut state = self.state.lock();
        state.interrupted = true;
        self.cond.notify_all();
    }

    pub fn is_interrupted(&self) -> bool {
        self.state.lock().interrupted
    }

    /// Block until notified. Returns `false` if interrupted instead.
    pub fn wait(&self) -> bool {
        let mut state = self.state.lock();
        while !state.permit && !state.interrupted {
            self.cond.wait(&mut state);
        }
        if state.interrupted {
            return false;
        }
        state.permit = false;
        true
    }

    /// Sleep for `period` unless interrupted first. Returns `false` if
    /// interrupted. Notifications do not cut the sleep short.
    pub fn sleep(&self, period: Duration) -> bool {
        let deadline = Instant::now().checked_add(period);
        let mut state = self.state.lock();
        while !state.interrupted {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
                None => self.cond.wait(&mut state),
            }
        }
        !state.interrupted
    }
}

/// The gates of every active actor in a run.
#[derive(Debug, Default)]
pub struct GateSet {
    gates: Mutex<Vec<Arc<PullGate>>>,
}

impl GateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) -> Arc<PullGate> {
        let gate = Arc::new(PullGate::new());
        self.gates.lock().push(Arc::clone(&gate));
        gate
    }

    pub fn interrupt_all(&self) {
        let gates = self.gates.lock();
        trace!(count = gates.len(), "Interrupt actor threads");
        gates.iter().for_each(|gate| gate.interrupt());
    }

    pub fn clear(&self) {
        self.gates.lock().clear();
    }
}

/// Stop and pause flags shared by the director and its actor threads.
#[derive(Debug, Default)]
pub struct RunControl {
    stop_requested: AtomicBool,
    iterating: AtomicBool,
    paused: Mutex<bool>,
    resumed: Condvar,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.stop_requested.store(false, Ordering::Release);
        self.iterating.store(false, Ordering::Release);
        *self.paused.lock() = false;
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        let _paused = self.paused.lock();
        self.resumed.notify_all();
    }

    /// Record that the first iteration has begun.
    pub fn mark_iterating(&self) {
        self.iterating.store(true, Ordering::Release);
    }

    pub fn is_iterating(&self) -> bool {
        self.iterating.load(Ordering::Acquire)
    }

    /// Stop requests made before iterating are ignored.
    pub fn request_stop_if_iterating(&self) -> bool {
        if self.is_iterating() {
            self.request_stop();
            true
        } else {
            false
        }
    }

    pub fn pause(&self) {
        *self.paused.lock() = true;
    }

    pub fn resume(&self) {
        *self.paused.lock() = false;
        self.resumed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Block while paused. Returns early when a stop is requested.
    pub fn wait_while_paused(&self) {
        let mut paused = self.paused.lock();
        while *paused && !self.is_stop_requested() {
            self.resumed.wait(&mut paused);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn should_keep_notification_sent_before_wait() {
        let gate = PullGate::new();
        gate.notify();
        assert!(gate.wait());
    }

    #[test]
    fn should_release_waiter_on_interrupt() {
        let gate = Arc::new(PullGate::new());
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait())
        };
        gate.interrupt();
        assert_eq!(waiter.join().ok(), Some(false));
        assert!(gate.is_interrupted());
    }

    #[test]
    fn should_sleep_full_period_unless_interrupted() {
        let gate = PullGate::new();
        let started = Instant::now();
        assert!(gate.sleep(Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));

        gate.interrupt();
        assert!(!gate.sleep(Duration::from_secs(60)));
    }

    #[test]
    fn should_ignore_stop_before_iterating() {
        let run = RunControl::new();
        assert!(!run.request_stop_if_iterating());
        assert!(!run.is_stop_requested());
        run.mark_iterating();
        assert!(run.request_stop_if_iterating());
        assert!(run.is_stop_requested());
    }

    #[test]
    fn should_release_paused_thread_on_resume() {
        let run = Arc::new(RunControl::new());
        run.pause();
        let waiter = {
            let run = Arc::clone(&run);
            thread::spawn(move || run.wait_while_paused())
        };
        thread::sleep(Duration::from_millis(10));
        assert!(run.is_paused());
        run.resume();
        assert!(waiter.join().is_ok());
    }

    #[test]
    fn should_interrupt_every_open_gate() {
        let gates = GateSet::new();
        let a = gates.open();
        let b = gates.open();
        gates.interrupt_all();
        assert!(a.is_interrupted() && b.is_interrupted());
    }
}
