//! Fixed-point receivers.
//!
//! Within one iteration a receiver starts unknown and settles exactly once,
//! to absent or to a single present token. Reading does not consume. The
//! director resets every receiver to unknown between iterations.

use std::fmt;

use dirigent_core::Error;
use dirigent_kernel::{Receiver, ReceiverSite, Result, Token};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
enum Settled {
    Unknown,
    Absent,
    Present(Token),
}

/// Tri-state receiver: unknown, absent or present.
pub struct FixedPointReceiver {
    label: String,
    state: Mutex<Settled>,
}

impl FixedPointReceiver {
    pub fn new(site: &ReceiverSite<'_>) -> Self {
        Self::labelled(site.label())
    }

    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: Mutex::new(Settled::Unknown),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// True once settled to absent.
    pub fn is_absent(&self) -> bool {
        matches!(*self.state.lock(), Settled::Absent)
    }
}

impl Receiver for FixedPointReceiver {
    fn put(&self, token: Option<Token>) -> Result<()> {
        let mut state = self.state.lock();
        let next = match (&*state, token) {
            (Settled::Unknown, None) | (Settled::Absent, None) => Settled::Absent,
            (Settled::Unknown, Some(token)) => Settled::Present(token),
            (Settled::Present(held), Some(token)) if *held == token => return Ok(()),
            (Settled::Present(held), Some(token)) => {
                return Err(Error::receiver_conflict(
                    &self.label,
                    format!("already holds {held}, cannot change to {token}"),
                ));
            }
            (Settled::Present(held), None) => {
                return Err(Error::receiver_conflict(
                    &self.label,
                    format!("already holds {held}, cannot become absent"),
                ));
            }
            (Settled::Absent, Some(token)) => {
                return Err(Error::receiver_conflict(
                    &self.label,
                    format!("already absent, cannot receive {token}"),
                ));
            }
        };
        *state = next;
        Ok(())
    }

    fn get(&self) -> Option<Token> {
        match &*self.state.lock() {
            Settled::Present(token) => Some(token.clone()),
            Settled::Unknown | Settled::Absent => None,
        }
    }

    fn has_tokens(&self, count: usize) -> bool {
        match count {
            0 => true,
            1 => matches!(*self.state.lock(), Settled::Present(_)),
            _ => false,
        }
    }

    fn has_room_for(&self, count: usize) -> bool {
        count <= 1
    }

    fn is_known(&self) -> bool {
        !matches!(*self.state.lock(), Settled::Unknown)
    }

    fn reset(&self) {
        *self.state.lock() = Settled::Unknown;
    }
}

impl fmt::Debug for FixedPointReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedPointReceiver")
            .field("label", &self.label)
            .field("state", &*self.state.lock())
            .finish()
    }
}
