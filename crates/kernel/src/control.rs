//! Control signals exchanged with continuations.
//!
//! A continuation is entered with a [`ControlEntryToken`] and answers with a
//! [`ControlExitToken`]. Locations compare and hash by name only, so the same
//! location name declared by two continuations is the same bare location.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::wiring::PortIo;

/// A named point at which a continuation can be entered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryLocation(String);

impl EntryLocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named point through which a continuation hands control on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExitLocation(String);

impl ExitLocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExitLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a continuation is entered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControlEntryToken {
    /// Start from the beginning.
    Init,
    /// Continue from where the last suspension left off.
    Resume,
    /// Enter at a named location.
    Enter(EntryLocation),
}

impl ControlEntryToken {
    pub fn init() -> Self {
        Self::Init
    }

    pub fn resume() -> Self {
        Self::Resume
    }

    pub fn enter(location: EntryLocation) -> Self {
        Self::Enter(location)
    }

    /// Parse the textual form used in mapping tables: `init`, `resume`, or
    /// the name of an entry location.
    pub fn parse(text: &str) -> Self {
        match text {
            "init" => Self::Init,
            "resume" => Self::Resume,
            other => Self::Enter(EntryLocation::new(other)),
        }
    }

    pub fn is_init(&self) -> bool {
        matches!(self, Self::Init)
    }

    pub fn is_resume(&self) -> bool {
        matches!(self, Self::Resume)
    }

    pub fn location(&self) -> Option<&EntryLocation> {
        match self {
            Self::Enter(location) => Some(location),
            Self::Init | Self::Resume => None,
        }
    }
}

impl fmt::Display for ControlEntryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Resume => write!(f, "resume"),
            Self::Enter(location) => write!(f, "enter({location})"),
        }
    }
}

/// How a continuation hands control back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControlExitToken {
    /// Finished; the next run starts from the beginning.
    Terminate,
    /// Paused; the next run resumes here.
    Suspend,
    /// Leave through a named location.
    Exit(ExitLocation),
}

impl ControlExitToken {
    pub fn terminate() -> Self {
        Self::Terminate
    }

    pub fn suspend() -> Self {
        Self::Suspend
    }

    pub fn exit(location: ExitLocation) -> Self {
        Self::Exit(location)
    }

    pub fn is_terminate(&self) -> bool {
        matches!(self, Self::Terminate)
    }

    pub fn is_suspend(&self) -> bool {
        matches!(self, Self::Suspend)
    }

    pub fn location(&self) -> Option<&ExitLocation> {
        match self {
            Self::Exit(location) => Some(location),
            Self::Terminate | Self::Suspend => None,
        }
    }
}

impl fmt::Display for ControlExitToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminate => write!(f, "terminate"),
            Self::Suspend => write!(f, "suspend"),
            Self::Exit(location) => write!(f, "exit({location})"),
        }
    }
}

/// The capability of being entered at named control points.
pub trait Continuation {
    fn entry_locations(&self) -> Vec<EntryLocation>;

    fn exit_locations(&self) -> Vec<ExitLocation>;

    fn control_init(&mut self, io: &PortIo<'_>) -> Result<ControlExitToken>;

    fn control_resume(&mut self, io: &PortIo<'_>) -> Result<ControlExitToken>;

    fn control_enter_at(
        &mut self,
        location: &EntryLocation,
        io: &PortIo<'_>,
    ) -> Result<ControlExitToken>;

    /// Dispatch on the entry token.
    fn control_enter(
        &mut self,
        entry: &ControlEntryToken,
        io: &PortIo<'_>,
    ) -> Result<ControlExitToken> {
        match entry {
            ControlEntryToken::Init => self.control_init(io),
            ControlEntryToken::Resume => self.control_resume(io),
            ControlEntryToken::Enter(location) => self.control_enter_at(location, io),
        }
    }

    /// The exit location signalled through an output port, if that port is
    /// an exit port.
    fn exit_location_for_port(&self, _port: &str) -> Option<ExitLocation> {
        None
    }

    /// The entry taken when control arrives through an input port, if that
    /// port is an entry port.
    fn entry_token_for_port(&self, _port: &str) -> Option<ControlEntryToken> {
        None
    }
}
