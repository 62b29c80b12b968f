#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # dirigent
//!
//! Actor execution coordination. Two directors share one kernel:
//!
//! - [`ci`]: active actors run on their own threads, the rest fire when
//!   data is pushed to them or pulled through them;
//! - [`coroutine`]: continuations are entered with control tokens and hand
//!   control on through a control-flow graph.
//!
//! This library re-exports the workspace crates for convenience.

pub use dirigent_core;

pub use dirigent_ci as ci;
pub use dirigent_coroutine as coroutine;
pub use dirigent_kernel as kernel;

pub mod prelude;

pub use dirigent_core::{Error, Result};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber: `RUST_LOG` filtering (default
/// `info`) and formatted output.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing() -> std::result::Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

/// Like [`init_tracing`], but a no-op when a subscriber is already set.
pub fn try_init_tracing() {
    if init_tracing().is_err() {
        tracing::trace!("Tracing subscriber already installed");
    }
}
