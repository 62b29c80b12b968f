//! TOML loading shared by the director and manager configurations.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Parse a configuration value from TOML text.
pub fn parse_toml<T: DeserializeOwned>(text: &str) -> Result<T> {
    toml::from_str(text).map_err(|e| Error::toml_parse_failed(e.to_string()))
}

/// Read and parse a TOML configuration file.
pub fn load_toml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::file_read_failed(path, e.to_string()))?;
    parse_toml(&text)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Settings {
        name: String,
        #[serde(default)]
        limit: u32,
    }

    #[test]
    fn should_parse_valid_toml() {
        let parsed: Result<Settings> = parse_toml("name = \"ramp\"\nlimit = 3\n");
        assert!(matches!(parsed, Ok(Settings { ref name, limit: 3 }) if name == "ramp"));
    }

    #[test]
    fn should_report_parse_failure() {
        let parsed: Result<Settings> = parse_toml("name = ");
        assert!(matches!(parsed, Err(Error::TomlParseFailed { .. })));
    }

    #[test]
    fn should_report_missing_file() {
        let parsed: Result<Settings> = load_toml("/definitely/not/here.toml");
        assert!(matches!(parsed, Err(Error::FileReadFailed { .. })));
    }
}
