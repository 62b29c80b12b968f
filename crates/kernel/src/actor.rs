//! The actor lifecycle contract.
//!
//! Directors drive actors only through this trait:
//! `preinitialize -> initialize -> {prefire, fire, postfire}* -> wrapup`,
//! plus the out-of-band `stop`, `stop_fire` and `terminate` requests.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::control::Continuation;
use crate::port::PortSpec;
use crate::wiring::PortIo;

/// Position of an actor in its model, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(usize);

impl ActorId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A schedulable unit.
///
/// Every method except [`Actor::ports`] and [`Actor::fire`] has a neutral
/// default. Failures are returned, never thrown across threads; threaded
/// directors hand them to the model's [`crate::ErrorSink`].
pub trait Actor: Send {
    /// Ports of this actor. Read once when the actor joins a model.
    fn ports(&self) -> Vec<PortSpec>;

    fn preinitialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn initialize(&mut self, _io: &PortIo<'_>) -> Result<()> {
        Ok(())
    }

    /// Whether the actor is ready to fire.
    fn prefire(&mut self, _io: &PortIo<'_>) -> Result<bool> {
        Ok(true)
    }

    fn fire(&mut self, io: &PortIo<'_>) -> Result<()>;

    /// Whether the actor wants further iterations.
    fn postfire(&mut self, _io: &PortIo<'_>) -> Result<bool> {
        Ok(true)
    }

    fn wrapup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Request that execution stop after the current iteration.
    fn stop(&mut self) {}

    /// Request that the current firing return as soon as possible.
    fn stop_fire(&mut self) {}

    /// Abandon execution immediately.
    fn terminate(&mut self) {}

    fn continuation(&self) -> Option<&dyn Continuation> {
        None
    }

    fn continuation_mut(&mut self) -> Option<&mut dyn Continuation> {
        None
    }
}

/// Shared handle to an actor. Threaded directors lock it per lifecycle call.
pub type ActorCell = Arc<Mutex<Box<dyn Actor>>>;

pub(crate) fn cell(actor: Box<dyn Actor>) -> ActorCell {
    Arc::new(Mutex::new(actor))
}
