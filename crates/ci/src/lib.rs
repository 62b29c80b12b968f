//! Push/pull director for dirigent models.
//!
//! Ports carry a `push` attribute. Actors that can run on their own (push
//! sources, pull sinks, pull-in/push-out agents) get a dedicated thread;
//! every other actor is fired by the [`CiDirector`] when data is pushed to
//! it or when an active actor pulls through it.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod active;
pub mod config;
pub mod director;
pub mod gate;
pub mod receiver;
pub mod role;
pub mod signal;

pub use active::ActiveActorManager;
pub use config::CiConfig;
pub use director::{CiDirector, PERIOD_ATTRIBUTE};
pub use gate::{GateSet, PullGate, RunControl};
pub use receiver::{CiReceiver, ReceiverMode};
pub use role::{PortProfile, Role};
pub use signal::{DirectorLink, Signal};
