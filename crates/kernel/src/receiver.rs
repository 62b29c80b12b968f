//! Per-connection token buffers.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;

use crate::Result;
use crate::port::Token;

/// A buffer attached to one channel of an input port.
///
/// Receivers are shared between the producing and the consuming side of a
/// connection, and in threaded directors between threads, so every method
/// takes `&self`.
pub trait Receiver: Send + Sync + fmt::Debug {
    /// Deliver a token. `None` states that no token is present this round.
    fn put(&self, token: Option<Token>) -> Result<()>;

    /// Deliver several tokens at once.
    fn put_array(&self, tokens: Vec<Token>) -> Result<()> {
        tokens
            .into_iter()
            .try_for_each(|token| self.put(Some(token)))
    }

    /// Take the next token, if any.
    fn get(&self) -> Option<Token>;

    fn has_token(&self) -> bool {
        self.has_tokens(1)
    }

    /// True when at least `count` tokens can be taken.
    fn has_tokens(&self, count: usize) -> bool;

    fn has_room(&self) -> bool {
        true
    }

    fn has_room_for(&self, _count: usize) -> bool {
        true
    }

    /// Whether the content of this receiver is settled.
    fn is_known(&self) -> bool {
        true
    }

    /// Return to the state the owning director starts an iteration with.
    fn reset(&self) {}
}

/// Unbounded FIFO token queue.
#[derive(Default)]
pub struct Mailbox {
    tokens: Mutex<VecDeque<Token>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox").field("len", &self.len()).finish()
    }
}

impl Receiver for Mailbox {
    fn put(&self, token: Option<Token>) -> Result<()> {
        if let Some(token) = token {
            self.tokens.lock().push_back(token);
        }
        Ok(())
    }

    fn put_array(&self, tokens: Vec<Token>) -> Result<()> {
        self.tokens.lock().extend(tokens);
        Ok(())
    }

    fn get(&self) -> Option<Token> {
        self.tokens.lock().pop_front()
    }

    fn has_tokens(&self, count: usize) -> bool {
        self.tokens.lock().len() >= count
    }

    /// Drop anything left over from a previous run.
    fn reset(&self) {
        self.tokens.lock().clear();
    }
}
