//! FIFO receiver that tells the scheduler about every delivery.

use std::fmt;
use std::sync::Arc;

use dirigent_kernel::{ActorId, Mailbox, Receiver, ReceiverSite, Result, Token};
use tracing::trace;

use crate::gate::PullGate;
use crate::role::Role;
use crate::signal::DirectorLink;

/// What a delivery into a receiver triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverMode {
    /// Push port fed by an active actor: queue the reader for the director.
    AsyncPush,
    /// Push port fed from the director thread: schedule the reader directly.
    SyncPush,
    /// Pull port read by an active actor: wake the reader's thread.
    AsyncPull,
    /// Pull port read by an inactive actor: fire the reader if it was pulled.
    SyncPull,
}

impl ReceiverMode {
    /// Choose the mode for a channel from the roles at both ends.
    pub fn classify(site: &ReceiverSite<'_>, reader: Role, source: Role) -> Self {
        match (site.reader_port.is_push(), source.is_active(), reader.is_active()) {
            (true, true, _) => Self::AsyncPush,
            (true, false, _) => Self::SyncPush,
            (false, _, true) => Self::AsyncPull,
            (false, _, false) => Self::SyncPull,
        }
    }
}

/// Unbounded FIFO buffer for one input channel.
pub struct CiReceiver {
    label: String,
    reader: ActorId,
    mode: ReceiverMode,
    queue: Mailbox,
    link: DirectorLink,
    gate: Option<Arc<PullGate>>,
}

impl CiReceiver {
    /// `gate` is the reader's pull gate, present when the reader is active.
    pub fn new(
        site: &ReceiverSite<'_>,
        mode: ReceiverMode,
        link: DirectorLink,
        gate: Option<Arc<PullGate>>,
    ) -> Self {
        Self {
            label: site.label(),
            reader: site.reader,
            mode,
            queue: Mailbox::new(),
            link,
            gate,
        }
    }

    pub fn mode(&self) -> ReceiverMode {
        self.mode
    }

    fn notify(&self) {
        trace!(site = %self.label, mode = ?self.mode, "Token delivered");
        match self.mode {
            ReceiverMode::AsyncPush => self.link.async_pushed(self.reader),
            ReceiverMode::SyncPush => self.link.sync_pushed(self.reader),
            ReceiverMode::AsyncPull => {
                if let Some(gate) = &self.gate {
                    gate.notify();
                }
            }
            ReceiverMode::SyncPull => self.link.pull_input(self.reader),
        }
    }
}

impl fmt::Debug for CiReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CiReceiver")
            .field("site", &self.label)
            .field("mode", &self.mode)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl Receiver for CiReceiver {
    fn put(&self, token: Option<Token>) -> Result<()> {
        let Some(token) = token else {
            return Ok(());
        };
        self.queue.put(Some(token))?;
        self.notify();
        Ok(())
    }

    fn put_array(&self, tokens: Vec<Token>) -> Result<()> {
        if tokens.is_empty() {
            return Ok(());
        }
        self.queue.put_array(tokens)?;
        self.notify();
        Ok(())
    }

    fn get(&self) -> Option<Token> {
        self.queue.get()
    }

    fn has_tokens(&self, count: usize) -> bool {
        self.queue.has_tokens(count)
    }
}
