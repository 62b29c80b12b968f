//! Core error types for dirigent operations using Railway-Oriented Programming.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for dirigent operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // Actor errors
    #[error("actor '{actor}': {reason}")]
    IllegalAction { actor: String, reason: String },

    #[error("no token available on '{actor}.{port}' channel {channel}")]
    NoToken {
        actor: String,
        port: String,
        channel: usize,
    },

    #[error("actor '{actor}' has no port named '{port}'")]
    UnknownPort { actor: String, port: String },

    #[error("receiver conflict on '{site}': {reason}")]
    ReceiverConflict { site: String, reason: String },

    // Model structure errors
    #[error("no actor named '{name}' in the model")]
    UnknownActor { name: String },

    #[error("name '{name}' is already used in the model")]
    DuplicateName { name: String },

    #[error("invalid connection: {reason}")]
    InvalidConnection { reason: String },

    #[error("unsupported configuration: {reason}")]
    UnsupportedConfiguration { reason: String },

    // Scheduling errors
    #[error("there is no initial continuation")]
    NoInitialContinuation,

    #[error("actor '{name}' is not a continuation")]
    NotAContinuation { name: String },

    #[error("exit '{exit}' of continuation '{continuation}' leads off the control-flow map")]
    OffTheMap { continuation: String, exit: String },

    #[error("more than {limit} control transfers in one iteration")]
    TransferLimitExceeded { limit: usize },

    #[error("unknown entry location '{location}'")]
    UnknownEntryLocation { location: String },

    #[error("failed to start manager thread for actor '{actor}': {reason}")]
    ThreadSpawnFailed { actor: String, reason: String },

    // Configuration errors
    #[error("failed to read file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    #[error("TOML parse error: {reason}")]
    TomlParseFailed { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create an illegal action error raised by (or on behalf of) an actor.
    pub fn illegal_action(actor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IllegalAction {
            actor: actor.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing token error.
    pub fn no_token(actor: impl Into<String>, port: impl Into<String>, channel: usize) -> Self {
        Self::NoToken {
            actor: actor.into(),
            port: port.into(),
            channel,
        }
    }

    /// Create an unknown port error.
    pub fn unknown_port(actor: impl Into<String>, port: impl Into<String>) -> Self {
        Self::UnknownPort {
            actor: actor.into(),
            port: port.into(),
        }
    }

    /// Create a receiver conflict error.
    pub fn receiver_conflict(site: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReceiverConflict {
            site: site.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown actor error.
    pub fn unknown_actor(name: impl Into<String>) -> Self {
        Self::UnknownActor { name: name.into() }
    }

    /// Create a duplicate name error.
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Create an invalid connection error.
    pub fn invalid_connection(reason: impl Into<String>) -> Self {
        Self::InvalidConnection {
            reason: reason.into(),
        }
    }

    /// Create an unsupported configuration error.
    pub fn unsupported_configuration(reason: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration {
            reason: reason.into(),
        }
    }

    /// Create a not-a-continuation error.
    pub fn not_a_continuation(name: impl Into<String>) -> Self {
        Self::NotAContinuation { name: name.into() }
    }

    /// Create an off-the-map error.
    pub fn off_the_map(continuation: impl Into<String>, exit: impl Into<String>) -> Self {
        Self::OffTheMap {
            continuation: continuation.into(),
            exit: exit.into(),
        }
    }

    /// Create an unknown entry location error.
    pub fn unknown_entry_location(location: impl Into<String>) -> Self {
        Self::UnknownEntryLocation {
            location: location.into(),
        }
    }

    /// Create a thread spawn error.
    pub fn thread_spawn_failed(actor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ThreadSpawnFailed {
            actor: actor.into(),
            reason: reason.into(),
        }
    }

    /// Create a file read error.
    pub fn file_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a TOML parse error.
    pub fn toml_parse_failed(reason: impl Into<String>) -> Self {
        Self::TomlParseFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_name_actor_in_illegal_action() {
        let err = Error::illegal_action("ramp", "output overflow");
        assert!(matches!(err, Error::IllegalAction { .. }));
        assert_eq!(err.to_string(), "actor 'ramp': output overflow");
    }

    #[test]
    fn should_name_site_in_no_token() {
        let err = Error::no_token("sink", "input", 2);
        assert!(err.to_string().contains("sink.input"));
        assert!(err.to_string().contains("channel 2"));
    }

    #[test]
    fn should_name_continuation_and_exit_when_off_the_map() {
        let err = Error::off_the_map("Counter", "overflow");
        assert!(err.to_string().contains("Counter"));
        assert!(err.to_string().contains("overflow"));
    }
}
