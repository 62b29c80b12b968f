//! Messages from receivers and actor threads to the director.
//!
//! All scheduling queues are owned by the director thread. Other parties
//! never touch them; they send a [`Signal`] and the director folds it into
//! its queues at the next scheduling point.

use dirigent_kernel::ActorId;
use tokio::sync::mpsc;
use tracing::trace;

/// A scheduling event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// An active actor pushed data to this actor.
    AsyncPushed(ActorId),
    /// This active actor wants its providers fired.
    AsyncPullRequested(ActorId),
    /// An actor on the director thread pushed data to this actor.
    SyncPushed(ActorId),
    /// Data arrived on a pull input of this actor.
    PullInput(ActorId),
    /// The thread driving this actor has exited.
    ManagerExited(ActorId),
    /// Re-check stop flags.
    Wake,
}

/// Sending half of the director's signal channel.
#[derive(Debug, Clone)]
pub struct DirectorLink {
    tx: mpsc::UnboundedSender<Signal>,
}

impl DirectorLink {
    /// A link and the receiving end the director keeps.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Signal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, signal: Signal) {
        // The director is gone once the run is torn down; late signals are moot.
        if self.tx.send(signal).is_err() {
            trace!(?signal, "Director gone, signal dropped");
        }
    }

    pub fn async_pushed(&self, actor: ActorId) {
        self.send(Signal::AsyncPushed(actor));
    }

    pub fn request_async_pull(&self, actor: ActorId) {
        self.send(Signal::AsyncPullRequested(actor));
    }

    pub fn sync_pushed(&self, actor: ActorId) {
        self.send(Signal::SyncPushed(actor));
    }

    pub fn pull_input(&self, actor: ActorId) {
        self.send(Signal::PullInput(actor));
    }

    pub fn manager_exited(&self, actor: ActorId) {
        self.send(Signal::ManagerExited(actor));
    }

    pub fn wake(&self) {
        self.send(Signal::Wake);
    }
}
