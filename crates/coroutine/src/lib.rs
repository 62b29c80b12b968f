//! Continuation control-flow director for dirigent models.
//!
//! Continuations are entered with control tokens and answer with the exit
//! they take. The [`CoroutineDirector`] follows exits through a control-flow
//! graph built from mapping tables or from connections between the control
//! ports of [`AtomicContinuationActor`]s.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod atomic;
pub mod config;
pub mod director;
pub mod graph;
pub mod mapping;
pub mod receiver;

pub use atomic::{AtomicContinuationActor, ContinuationBody, FnBody, INIT_PORT, RESUME_PORT, entry_port, exit_port};
pub use config::{CoroutineConfig, GraphSource, OffTheMap};
pub use director::{CoroutineDirector, WalkOutcome};
pub use dirigent_kernel::{Continuation, ControlEntryToken, ControlExitToken, EntryLocation, ExitLocation};
pub use graph::{ContinuationId, ControlGraph, InternalEntryLocation, InternalExitLocation};
pub use receiver::FixedPointReceiver;
