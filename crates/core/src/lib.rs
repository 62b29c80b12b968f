//! Core types, errors, and utilities shared by the dirigent crates.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod error;
pub mod result;

pub use error::Error;
pub use result::{GenericResultExt, Result, ResultExt};
