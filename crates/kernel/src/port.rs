//! Port declarations.
//!
//! A port is declared by its actor through [`crate::Actor::ports`] and is
//! never mutated by a director. Side attributes such as `push` are plain
//! tokens keyed by name.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The value carried between actors.
pub type Token = serde_json::Value;

/// Name of the boolean side attribute selecting push interaction.
pub const PUSH_ATTRIBUTE: &str = "push";

/// Direction of a port relative to its actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Declaration of a single port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    name: String,
    direction: Direction,
    #[serde(default)]
    multiport: bool,
    #[serde(default)]
    attributes: BTreeMap<String, Token>,
}

impl PortSpec {
    /// Declare an input port.
    pub fn input(name: impl Into<String>) -> Self {
        Self::new(name, Direction::Input)
    }

    /// Declare an output port.
    pub fn output(name: impl Into<String>) -> Self {
        Self::new(name, Direction::Output)
    }

    fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
            multiport: false,
            attributes: BTreeMap::new(),
        }
    }

    /// Allow more than one connection into this port.
    #[must_use]
    pub fn multiport(mut self) -> Self {
        self.multiport = true;
        self
    }

    /// Mark the port as a push port.
    #[must_use]
    pub fn push(self) -> Self {
        self.with_attribute(PUSH_ATTRIBUTE, Token::Bool(true))
    }

    /// Attach a named side attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Token) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == Direction::Output
    }

    pub fn is_multiport(&self) -> bool {
        self.multiport
    }

    pub fn attribute(&self, key: &str) -> Option<&Token> {
        self.attributes.get(key)
    }

    /// A port is push only when its `push` attribute is boolean `true`.
    /// Any other value, or no attribute at all, means pull.
    pub fn is_push(&self) -> bool {
        matches!(self.attributes.get(PUSH_ATTRIBUTE), Some(Token::Bool(true)))
    }
}
