//! The director contract.
//!
//! A director owns the scheduling state for one [`Model`]. The execution
//! [`crate::Manager`] calls it from a single thread; requests arriving from
//! other threads go through its [`StopControl`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Result;
use crate::model::Model;

/// Scheduling discipline for a model.
pub trait Director: Send {
    /// Clear per-run state and preinitialize the actors.
    fn preinitialize(&mut self, model: &mut Model) -> Result<()>;

    /// Install receivers, initialize the actors and start any helpers.
    fn initialize(&mut self, model: &mut Model) -> Result<()>;

    /// Whether an iteration should run now.
    fn prefire(&mut self, model: &Model) -> Result<bool>;

    fn fire(&mut self, model: &Model) -> Result<()>;

    /// Whether further iterations are wanted.
    fn postfire(&mut self, model: &Model) -> Result<bool>;

    /// Release helpers and wrap up the actors.
    fn wrapup(&mut self, model: &Model) -> Result<()>;

    /// Handle for requests made while the director is busy.
    fn stop_control(&self) -> Arc<dyn StopControl>;
}

/// Out-of-band execution requests, safe to call from any thread.
pub trait StopControl: Send + Sync {
    /// Stop after the current iteration.
    fn stop(&self);

    /// End the current firing as soon as possible.
    fn stop_fire(&self);

    /// Abandon execution. The model may be left inconsistent.
    fn terminate(&self);
}

/// Plain request flags, for directors that poll between steps.
#[derive(Debug, Default)]
pub struct StopFlags {
    stop: AtomicBool,
    stop_fire: AtomicBool,
    terminate: AtomicBool,
}

impl StopFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire) || self.is_terminated()
    }

    pub fn is_stop_fire_requested(&self) -> bool {
        self.stop_fire.load(Ordering::Acquire) || self.is_terminated()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminate.load(Ordering::Acquire)
    }

    /// Forget a pending `stop_fire` once the firing it targeted is over.
    pub fn clear_stop_fire(&self) {
        self.stop_fire.store(false, Ordering::Release);
    }

    pub fn reset(&self) {
        self.stop.store(false, Ordering::Release);
        self.stop_fire.store(false, Ordering::Release);
        self.terminate.store(false, Ordering::Release);
    }
}

impl StopControl for StopFlags {
    fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    fn stop_fire(&self) {
        self.stop_fire.store(true, Ordering::Release);
    }

    fn terminate(&self) {
        self.terminate.store(true, Ordering::Release);
    }
}
