//! Prelude module - common imports for building and running models
//!
//! Import this module to get all common types and traits:
//! ```rust
//! use dirigent::prelude::*;
//! ```

// Re-export functional utilities
pub use dirigent_core::{GenericResultExt, ResultExt};

// Re-export error types
pub use dirigent_core::{Error, Result};

// Re-export the kernel
pub use dirigent_kernel::{
    Actor, ActorId, Continuation, ControlEntryToken, ControlExitToken, Director, EntryLocation, ExitLocation,
    Manager, ManagerConfig, ManagerHandle, Model, Phase, PortIo, PortSpec, Receiver, StopControl, Token,
};

// Re-export the directors
pub use dirigent_ci::{CiConfig, CiDirector, Role};
pub use dirigent_coroutine::{
    AtomicContinuationActor, ContinuationBody, CoroutineConfig, CoroutineDirector, GraphSource, OffTheMap,
};
