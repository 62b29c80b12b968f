//! Atomic continuation actors.
//!
//! An [`AtomicContinuationActor`] wraps a [`ContinuationBody`] and declares
//! its entry and exit locations as control ports, so the control-flow graph
//! can be drawn with ordinary connections:
//!
//! - `init` and `resume` inputs enter with [`ControlEntryToken::Init`] and
//!   [`ControlEntryToken::Resume`];
//! - an `enter_<name>` input per entry location;
//! - an `exit_<name>` output per exit location.

use dirigent_core::Error;
use dirigent_kernel::{
    Actor, Continuation, ControlEntryToken, ControlExitToken, EntryLocation, ExitLocation, PortIo,
    PortSpec, Result,
};
use tracing::trace;

pub const INIT_PORT: &str = "init";
pub const RESUME_PORT: &str = "resume";
const ENTER_PREFIX: &str = "enter_";
const EXIT_PREFIX: &str = "exit_";

/// Name of the input port that enters at `location`.
pub fn entry_port(location: &EntryLocation) -> String {
    format!("{ENTER_PREFIX}{location}")
}

/// Name of the output port that signals `location`.
pub fn exit_port(location: &ExitLocation) -> String {
    format!("{EXIT_PREFIX}{location}")
}

/// What a continuation does when control enters it.
pub trait ContinuationBody: Send {
    fn enter(&mut self, entry: &ControlEntryToken, io: &PortIo<'_>) -> Result<ControlExitToken>;

    /// Commit state at the end of an iteration the continuation took part in.
    fn postfire(&mut self, _io: &PortIo<'_>) -> Result<bool> {
        Ok(true)
    }
}

/// Adapts a closure to [`ContinuationBody`].
pub struct FnBody<F>(F);

impl<F> ContinuationBody for FnBody<F>
where
    F: FnMut(&ControlEntryToken, &PortIo<'_>) -> Result<ControlExitToken> + Send,
{
    fn enter(&mut self, entry: &ControlEntryToken, io: &PortIo<'_>) -> Result<ControlExitToken> {
        (self.0)(entry, io)
    }
}

/// An actor that is driven by control tokens rather than by firing.
pub struct AtomicContinuationActor<B> {
    body: B,
    entries: Vec<EntryLocation>,
    exits: Vec<ExitLocation>,
    data_ports: Vec<PortSpec>,
    last_entry: Option<ControlEntryToken>,
}

impl<F> AtomicContinuationActor<FnBody<F>>
where
    F: FnMut(&ControlEntryToken, &PortIo<'_>) -> Result<ControlExitToken> + Send,
{
    pub fn from_fn(body: F) -> Self {
        Self::new(FnBody(body))
    }
}

impl<B: ContinuationBody> AtomicContinuationActor<B> {
    pub fn new(body: B) -> Self {
        Self {
            body,
            entries: Vec::new(),
            exits: Vec::new(),
            data_ports: Vec::new(),
            last_entry: None,
        }
    }

    #[must_use]
    pub fn with_entry(mut self, name: impl Into<String>) -> Self {
        let location = EntryLocation::new(name);
        if !self.entries.contains(&location) {
            self.entries.push(location);
        }
        self
    }

    #[must_use]
    pub fn with_exit(mut self, name: impl Into<String>) -> Self {
        let location = ExitLocation::new(name);
        if !self.exits.contains(&location) {
            self.exits.push(location);
        }
        self
    }

    /// Add a data port alongside the control ports.
    #[must_use]
    pub fn with_port(mut self, port: PortSpec) -> Self {
        self.data_ports.push(port);
        self
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    /// The entry used the last time control entered.
    pub fn last_entry(&self) -> Option<&ControlEntryToken> {
        self.last_entry.as_ref()
    }

    fn enter(&mut self, entry: &ControlEntryToken, io: &PortIo<'_>) -> Result<ControlExitToken> {
        let exit = self.body.enter(entry, io)?;
        if let Some(location) = exit.location() {
            if !self.exits.contains(location) {
                return Err(Error::illegal_action(
                    io.actor_name(),
                    format!("exit location '{location}' is not declared"),
                ));
            }
        }
        trace!(actor = %io.actor_name(), %entry, %exit, "Continuation entered");
        self.last_entry = Some(entry.clone());
        Ok(exit)
    }
}

impl<B: ContinuationBody> Continuation for AtomicContinuationActor<B> {
    fn entry_locations(&self) -> Vec<EntryLocation> {
        self.entries.clone()
    }

    fn exit_locations(&self) -> Vec<ExitLocation> {
        self.exits.clone()
    }

    fn control_init(&mut self, io: &PortIo<'_>) -> Result<ControlExitToken> {
        self.enter(&ControlEntryToken::Init, io)
    }

    fn control_resume(&mut self, io: &PortIo<'_>) -> Result<ControlExitToken> {
        self.enter(&ControlEntryToken::Resume, io)
    }

    fn control_enter_at(&mut self, location: &EntryLocation, io: &PortIo<'_>) -> Result<ControlExitToken> {
        if !self.entries.contains(location) {
            return Err(Error::unknown_entry_location(location.name()));
        }
        self.enter(&ControlEntryToken::enter(location.clone()), io)
    }

    fn exit_location_for_port(&self, port: &str) -> Option<ExitLocation> {
        port.strip_prefix(EXIT_PREFIX)
            .map(ExitLocation::new)
            .filter(|location| self.exits.contains(location))
    }

    fn entry_token_for_port(&self, port: &str) -> Option<ControlEntryToken> {
        match port {
            INIT_PORT => Some(ControlEntryToken::Init),
            RESUME_PORT => Some(ControlEntryToken::Resume),
            other => other
                .strip_prefix(ENTER_PREFIX)
                .map(EntryLocation::new)
                .filter(|location| self.entries.contains(location))
                .map(ControlEntryToken::Enter),
        }
    }
}

impl<B: ContinuationBody> Actor for AtomicContinuationActor<B> {
    fn ports(&self) -> Vec<PortSpec> {
        let control_in = [PortSpec::input(INIT_PORT).multiport(), PortSpec::input(RESUME_PORT).multiport()];
        let entries = self
            .entries
            .iter()
            .map(|location| PortSpec::input(entry_port(location)).multiport());
        let exits = self.exits.iter().map(|location| PortSpec::output(exit_port(location)));
        control_in
            .into_iter()
            .chain(entries)
            .chain(exits)
            .chain(self.data_ports.iter().cloned())
            .collect()
    }

    /// Continuations run only when control enters them.
    fn fire(&mut self, io: &PortIo<'_>) -> Result<()> {
        trace!(actor = %io.actor_name(), "Continuation fired without control, ignored");
        Ok(())
    }

    fn postfire(&mut self, io: &PortIo<'_>) -> Result<bool> {
        self.body.postfire(io)
    }

    fn continuation(&self) -> Option<&dyn Continuation> {
        Some(self)
    }

    fn continuation_mut(&mut self) -> Option<&mut dyn Continuation> {
        Some(self)
    }
}
