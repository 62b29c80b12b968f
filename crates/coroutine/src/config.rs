//! Continuation director configuration.

use std::path::Path;

use dirigent_core::Error;
use dirigent_kernel::{EntryLocation, ExitLocation, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where the next map comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphSource {
    /// The next table when it has rows, connections otherwise.
    #[default]
    Auto,
    Parameters,
    Connections,
}

/// What an exit with no route does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffTheMap {
    /// End the iteration; the director then asks for no further iterations.
    #[default]
    EndIteration,
    /// Fail the firing with an off-the-map error.
    Fault,
}

/// Configuration for [`crate::CoroutineDirector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoroutineConfig {
    /// Continuation control starts in. The first continuation when unset.
    #[serde(default)]
    pub init_continuation_name: Option<String>,

    /// `[model entry, continuation, entry]` rows.
    #[serde(default)]
    pub entry_mapping: Vec<Value>,

    /// `[continuation, exit, continuation, entry]` rows.
    #[serde(default)]
    pub next_mapping: Vec<Value>,

    /// `[continuation, exit, model exit]` rows.
    #[serde(default)]
    pub exit_mapping: Vec<Value>,

    /// Entry locations the director itself offers when used as a continuation.
    #[serde(default)]
    pub entry_locations: Vec<EntryLocation>,

    /// Exit locations the director itself offers when used as a continuation.
    #[serde(default)]
    pub exit_locations: Vec<ExitLocation>,

    #[serde(default)]
    pub graph_source: GraphSource,

    #[serde(default)]
    pub off_the_map: OffTheMap,

    /// Upper bound on continuations entered by one firing.
    #[serde(default = "default_max_transfers")]
    pub max_transfers: usize,
}

fn default_max_transfers() -> usize {
    10_000
}

impl Default for CoroutineConfig {
    fn default() -> Self {
        Self {
            init_continuation_name: None,
            entry_mapping: Vec::new(),
            next_mapping: Vec::new(),
            exit_mapping: Vec::new(),
            entry_locations: Vec::new(),
            exit_locations: Vec::new(),
            graph_source: GraphSource::default(),
            off_the_map: OffTheMap::default(),
            max_transfers: default_max_transfers(),
        }
    }
}

impl CoroutineConfig {
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
        if self.max_transfers == 0 {
            return Err(Error::invalid_config("max_transfers must be at least 1"));
        }
        if self
            .init_continuation_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(Error::invalid_config("init_continuation_name must not be blank"));
        }
        Ok(())
    }

    /// Whether the next map is read from `next_mapping`.
    pub fn uses_next_table(&self) -> bool {
        match self.graph_source {
            GraphSource::Auto => !self.next_mapping.is_empty(),
            GraphSource::Parameters => true,
            GraphSource::Connections => false,
        }
    }

    #[must_use]
    pub fn with_init_continuation(mut self, name: impl Into<String>) -> Self {
        self.init_continuation_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_next(mut self, from: &str, exit: &str, to: &str, entry: &str) -> Self {
        self.next_mapping.push(Value::from(vec![from, exit, to, entry]));
        self
    }

    #[must_use]
    pub fn with_entry(mut self, model_entry: &str, to: &str, entry: &str) -> Self {
        self.entry_locations.push(EntryLocation::new(model_entry));
        self.entry_mapping.push(Value::from(vec![model_entry, to, entry]));
        self
    }

    #[must_use]
    pub fn with_exit(mut self, from: &str, exit: &str, model_exit: &str) -> Self {
        self.exit_locations.push(ExitLocation::new(model_exit));
        self.exit_mapping.push(Value::from(vec![from, exit, model_exit]));
        self
    }

    #[must_use]
    pub fn with_off_the_map(mut self, policy: OffTheMap) -> Self {
        self.off_the_map = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn should_default_to_auto_graph_and_tolerant_exits() {
        let config = CoroutineConfig::default();
        assert_eq!(config.graph_source, GraphSource::Auto);
        assert_eq!(config.off_the_map, OffTheMap::EndIteration);
        assert_eq!(config.max_transfers, 10_000);
        assert!(!config.uses_next_table());
        assert!(config.with_next("a", "done", "b", "init").uses_next_table());
    }

    #[test]
    fn should_parse_mapping_tables_from_toml() {
        let text = r#"
            init_continuation_name = "a"
            off_the_map = "fault"
            next_mapping = [["a", "done", "b", "init"], ["broken"], 7]
            entry_locations = ["start"]
        "#;
        let config = CoroutineConfig::from_toml(text);
        assert!(config.is_ok(), "{config:?}");
        let Ok(config) = config else { return };
        assert_eq!(config.init_continuation_name.as_deref(), Some("a"));
        assert_eq!(config.off_the_map, OffTheMap::Fault);
        assert_eq!(config.next_mapping.len(), 3);
        assert_eq!(config.entry_locations, vec![EntryLocation::new("start")]);
    }

    #[test]
    fn should_reject_zero_transfer_limit() {
        let config = CoroutineConfig {
            max_transfers: 0,
            ..CoroutineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn should_load_from_file() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "graph_source = \"connections\"\nmax_transfers = 5")?;
        let config = CoroutineConfig::load(file.path())?;
        assert_eq!(config.graph_source, GraphSource::Connections);
        assert_eq!(config.max_transfers, 5);
        Ok(())
    }
}
