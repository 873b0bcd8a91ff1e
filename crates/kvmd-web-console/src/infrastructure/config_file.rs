//! TOML loading for [`ConsoleConfig`].
//!
//! Every field of the file is optional; missing fields take their defaults.
//! A missing file is an error here: the caller only asks for a file the
//! user named explicitly.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::domain::config::InvalidConfig;
use crate::domain::ConsoleConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed, but a value is out of range.
    #[error(transparent)]
    Invalid(#[from] InvalidConfig),
}

/// Parses configuration from TOML text and validates it.
pub fn parse_config(text: &str) -> Result<ConsoleConfig, ConfigError> {
    let config: ConsoleConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Reads and validates the configuration file at `path`.
///
/// # Errors
///
/// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`]
/// for malformed TOML, [`ConfigError::Invalid`] for out-of-range values.
pub fn load_config(path: &Path) -> Result<ConsoleConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("loaded config from {}", path.display());
    parse_config(&text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default_config() {
        // Arrange / Act
        let config = parse_config("").unwrap();

        // Assert
        assert_eq!(config, ConsoleConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_only_named_fields() {
        let config = parse_config(
            r#"
daemon_url = "https://pikvm.local"
user = "admin"
move_interval_ms = 50
"#,
        )
        .unwrap();
        assert_eq!(config.daemon_url, "https://pikvm.local");
        assert_eq!(config.user.as_deref(), Some("admin"));
        assert_eq!(config.move_interval_ms, 50);
        assert_eq!(config.upload_chunk_size, 65536);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let result = parse_config("[[[ not valid toml");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_small_chunk_is_rejected() {
        let result = parse_config("upload_chunk_size = 512");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid(InvalidConfig::ChunkTooSmall(512)))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/console.toml");
        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_config_from_temp_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!("kvmd_console_{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "touch_capture = true\nhttp_timeout_secs = 5\n").unwrap();

        // Act
        let config = load_config(&path).unwrap();

        // Assert
        assert!(config.touch_capture);
        assert_eq!(config.http_timeout_secs, 5);
        let _ = std::fs::remove_file(&path);
    }
}
