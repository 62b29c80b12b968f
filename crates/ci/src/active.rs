//! Threads that drive active actors.
//!
//! Each active actor gets one thread for the duration of a run. The thread
//! iterates the actor on its own; when the actor is not ready it either
//! yields (push sources) or asks the director to pull its providers and
//! parks on its [`PullGate`] until data arrives.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dirigent_core::Error;
use dirigent_kernel::{ActorCell, ActorId, ActorWiring, ErrorSink, PortIo, Result};
use tracing::{debug, error, trace};

use crate::gate::{PullGate, RunControl};
use crate::role::Role;
use crate::signal::DirectorLink;

/// Everything an actor thread needs, moved into the thread at spawn.
pub(crate) struct ActorThread {
    pub id: ActorId,
    pub name: String,
    pub cell: ActorCell,
    pub wiring: Arc<ActorWiring>,
    pub role: Role,
    pub period: Duration,
    pub run: Arc<RunControl>,
    pub gate: Arc<PullGate>,
    pub link: DirectorLink,
    pub sink: ErrorSink,
}

/// Handle on the thread driving one active actor.
#[derive(Debug)]
pub struct ActiveActorManager {
    actor: ActorId,
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl ActiveActorManager {
    pub(crate) fn spawn(worker: ActorThread) -> Result<Self> {
        let actor = worker.id;
        let name = worker.name.clone();
        let handle = thread::Builder::new()
            .name(format!("ci-{name}"))
            .spawn(move || worker.run())
            .map_err(|e| Error::thread_spawn_failed(&name, e.to_string()))?;
        debug!(actor = %name, "Actor thread started");
        Ok(Self {
            actor,
            name,
            handle: Some(handle),
        })
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the thread to finish. Returns `false` if it panicked.
    pub fn join(mut self) -> bool {
        match self.handle.take().map(JoinHandle::join) {
            Some(Err(_)) => {
                error!(actor = %self.name, "Actor thread panicked");
                false
            }
            Some(Ok(())) | None => true,
        }
    }
}

/// Tells the director the thread is gone, however it ends.
struct ExitGuard {
    id: ActorId,
    name: String,
    link: DirectorLink,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        debug!(actor = %self.name, "Actor thread exiting");
        self.link.manager_exited(self.id);
    }
}

impl ActorThread {
    fn run(self) {
        let _guard = ExitGuard {
            id: self.id,
            name: self.name.clone(),
            link: self.link.clone(),
        };
        loop {
            if self.run.is_stop_requested() || self.gate.is_interrupted() {
                break;
            }
            self.run.wait_while_paused();
            if self.run.is_stop_requested() {
                break;
            }
            match self.iterate() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    self.sink.report(&self.name, e);
                    break;
                }
            }
        }
    }

    /// One pass of the actor loop. `Ok(false)` ends the thread.
    fn iterate(&self) -> Result<bool> {
        let io = PortIo::new(&self.wiring);
        let ready = self.cell.lock().prefire(&io)?;

        if ready {
            let more = {
                let mut actor = self.cell.lock();
                actor.fire(&io)?;
                actor.postfire(&io)?
            };
            if !more {
                debug!(actor = %self.name, "Postfire returned false");
                return Ok(false);
            }
            if !self.period.is_zero() {
                return Ok(self.gate.sleep(self.period));
            }
            return Ok(true);
        }

        if self.role == Role::PushSource {
            thread::yield_now();
            return Ok(true);
        }

        trace!(actor = %self.name, "Not ready, requesting pull");
        self.link.request_async_pull(self.id);
        Ok(self.gate.wait())
    }
}
