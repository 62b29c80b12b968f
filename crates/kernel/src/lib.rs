//! Execution substrate shared by the dirigent directors.
//!
//! Actors declare ports and implement the lifecycle in [`Actor`]; a
//! [`Model`] holds actors and connections; a [`Director`] decides firing
//! order; a [`Manager`] runs the whole thing. Continuations and their
//! control tokens live in [`control`].

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod actor;
pub mod control;
pub mod director;
pub mod manager;
pub mod model;
pub mod port;
pub mod receiver;
pub mod sink;
pub mod wiring;

pub use actor::{Actor, ActorCell, ActorId};
pub use control::{
    Continuation, ControlEntryToken, ControlExitToken, EntryLocation, ExitLocation,
};
pub use director::{Director, StopControl, StopFlags};
pub use dirigent_core::{Error, Result};
pub use manager::{Manager, ManagerConfig, ManagerHandle, Phase};
pub use model::{Connection, Model, PortRef, ReceiverSite};
pub use port::{Direction, PUSH_ATTRIBUTE, PortSpec, Token};
pub use receiver::{Mailbox, Receiver};
pub use sink::{ErrorSink, ReportedError};
pub use wiring::{ActorWiring, PortIo};
