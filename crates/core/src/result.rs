//! Result type definition and extension traits for Railway-Oriented Programming.
//!
//! Provides functional combinators for Result types, enabling clean error handling
//! without unwrap/expect/panic.

use crate::error::Error;

/// The standard Result type for dirigent operations.
///
/// All fallible operations return this type.
/// Use the `?` operator, `match`, or combinator methods to handle results.
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait providing safe combinators for Results.
///
/// Used on best-effort paths (shutdown notifications, optional attributes)
/// where a failure is logged and execution continues.
pub trait ResultExt<T> {
    /// Get the value or a default, logging the error if present.
    fn or_default_logged(self, default: T) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    fn or_default_logged(self, default: T) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Operation failed, using default: {}", e);
                default
            }
        }
    }
}

/// Generic extension trait for any Result type.
///
/// Provides a tap-style combinator for side effects.
pub trait GenericResultExt<E> {
    /// Perform a side effect on Err value without consuming the Result.
    fn tap_err<F: FnOnce(&E)>(self, f: F) -> Self;
}

impl<T, E> GenericResultExt<E> for std::result::Result<T, E> {
    fn tap_err<F: FnOnce(&E)>(self, f: F) -> Self {
        if let Err(ref e) = self {
            f(e);
        }
        self
    }
}
