//! Push/pull director configuration.

use std::path::Path;
use std::time::Duration;

use dirigent_core::Error;
use dirigent_kernel::Result;
use serde::{Deserialize, Serialize};

/// Longest accepted default period between iterations of an active actor.
const MAX_INTERVAL_MS: u64 = 86_400_000;

/// Configuration for [`crate::CiDirector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiConfig {
    /// Default pause, in milliseconds, between iterations of an active
    /// actor that has no `period` attribute of its own. Zero means none.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// A top-level director waits for actor threads when idle; a nested one
    /// returns control to its container instead.
    #[serde(default = "default_top_level")]
    pub top_level: bool,
}

fn default_interval_ms() -> u64 {
    0
}

fn default_top_level() -> bool {
    true
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            top_level: default_top_level(),
        }
    }
}

impl CiConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = dirigent_core::config::parse_toml(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = dirigent_core::config::load_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_ms > MAX_INTERVAL_MS {
            return Err(Error::invalid_config(format!(
                "interval_ms must be at most {MAX_INTERVAL_MS}, got {}",
                self.interval_ms
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
