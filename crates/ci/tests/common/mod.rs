//! Actors shared by the push/pull director tests.

#![allow(dead_code, clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dirigent_kernel::{Actor, Error, PortIo, PortSpec, Result, Token};
use parking_lot::Mutex;

pub type Seen = Arc<Mutex<Vec<Token>>>;

pub fn seen() -> Seen {
    Arc::new(Mutex::new(Vec::new()))
}

/// Free-running source with a push output. Stops after `limit` firings,
/// fails on firing `fail_at` when set.
pub struct PushSource {
    pub limit: Option<usize>,
    pub fail_at: Option<usize>,
    pub fired: usize,
}

impl PushSource {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            fail_at: None,
            fired: 0,
        }
    }

    pub fn endless() -> Self {
        Self {
            limit: None,
            fail_at: None,
            fired: 0,
        }
    }
}

impl Actor for PushSource {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output("out").push()]
    }

    fn fire(&mut self, io: &PortIo<'_>) -> Result<()> {
        self.fired += 1;
        if self.fail_at == Some(self.fired) {
            return Err(Error::illegal_action(io.actor_name(), "source failed"));
        }
        io.send("out", Token::from(self.fired))
    }

    fn postfire(&mut self, _io: &PortIo<'_>) -> Result<bool> {
        Ok(self.limit.is_none_or(|limit| self.fired < limit))
    }
}

/// Records tokens arriving on a push input.
pub struct Printer {
    pub seen: Seen,
}

impl Actor for Printer {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("in").push()]
    }

    fn prefire(&mut self, io: &PortIo<'_>) -> Result<bool> {
        Ok(io.has_token("in"))
    }

    fn fire(&mut self, io: &PortIo<'_>) -> Result<()> {
        self.seen.lock().push(io.get("in")?);
        Ok(())
    }
}

/// Produces 1, 2, 3, ... on a pull output whenever fired.
pub struct Ramp {
    pub next: u64,
    pub fired: Arc<AtomicUsize>,
}

impl Ramp {
    pub fn new(fired: Arc<AtomicUsize>) -> Self {
        Self { next: 1, fired }
    }
}

impl Actor for Ramp {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output("out")]
    }

    fn fire(&mut self, io: &PortIo<'_>) -> Result<()> {
        self.fired.fetch_add(1, Ordering::SeqCst);
        let value = self.next;
        self.next += 1;
        io.send("out", Token::from(value))
    }
}

/// Pull input, pull output; forwards one token per firing.
pub struct Relay;

impl Actor for Relay {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("in"), PortSpec::output("out")]
    }

    fn prefire(&mut self, io: &PortIo<'_>) -> Result<bool> {
        Ok(io.has_token("in"))
    }

    fn fire(&mut self, io: &PortIo<'_>) -> Result<()> {
        let token = io.get("in")?;
        io.send("out", token)
    }
}

/// Active consumer on a pull input; stops after `limit` tokens.
pub struct PullSink {
    pub limit: usize,
    pub seen: Seen,
}

impl Actor for PullSink {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("in")]
    }

    fn prefire(&mut self, io: &PortIo<'_>) -> Result<bool> {
        Ok(io.has_token("in"))
    }

    fn fire(&mut self, io: &PortIo<'_>) -> Result<()> {
        self.seen.lock().push(io.get("in")?);
        Ok(())
    }

    fn postfire(&mut self, _io: &PortIo<'_>) -> Result<bool> {
        Ok(self.seen.lock().len() < self.limit)
    }
}
