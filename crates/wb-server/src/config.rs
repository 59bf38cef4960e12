//! Server configuration file

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use wb_rules::EngineConfig;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Contents of `wb-rules.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,

    /// Timer clock resolution in milliseconds
    pub tick_ms: u64,

    pub engine: EngineConfig,

    /// Alias name to `device/cell`
    pub aliases: BTreeMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            tick_ms: 100,
            engine: EngineConfig::default(),
            aliases: BTreeMap::new(),
        }
    }
}

impl ServerConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        // An empty document deserializes as null
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let config = ServerConfig::load(&dir.path().join("absent.yaml")).unwrap();

        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.engine.shell, "/bin/sh");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "log_level: debug\n\
             engine:\n  notify:\n    sendmail_command: /usr/bin/msmtp\n\
             aliases:\n  temp: wb-msw/Temperature\n  lamp: wb-gpio/Relay_1"
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.tick_ms, 100);
        assert_eq!(config.engine.shell, "/bin/sh");
        assert_eq!(config.engine.notify.sendmail_command, "/usr/bin/msmtp");
        assert_eq!(config.aliases.len(), 2);
        assert_eq!(config.aliases["lamp"], "wb-gpio/Relay_1");
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let file = NamedTempFile::new().unwrap();

        assert_eq!(
            ServerConfig::load(file.path()).unwrap(),
            ServerConfig::default()
        );
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "aliases: [not, a, map]").unwrap();

        let err = ServerConfig::load(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::ParseYaml { .. }));
    }
}
