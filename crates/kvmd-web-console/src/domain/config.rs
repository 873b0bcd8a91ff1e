//! Console configuration types.
//!
//! [`ConsoleConfig`] is the single source of truth for runtime settings.  It
//! is populated from an optional TOML file (see
//! `infrastructure::config_file`) and then overridden by CLI flags in
//! `main.rs`.  Every field has a default, so an empty file, or no file at
//! all, is a valid configuration:
//!
//! ```toml
//! daemon_url = "https://pikvm.local"
//! user = "admin"
//! passwd = "admin"
//! move_interval_ms = 100
//! upload_chunk_size = 65536
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest accepted upload chunk, matching the daemon's own lower bound.
pub const MIN_UPLOAD_CHUNK_SIZE: usize = 1024;

/// A configuration value that cannot be used.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidConfig {
    #[error("upload_chunk_size must be at least {MIN_UPLOAD_CHUNK_SIZE} bytes, got {0}")]
    ChunkTooSmall(usize),
    #[error("move_interval_ms must be greater than zero")]
    ZeroMoveInterval,
}

/// All runtime configuration for the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the daemon; API paths (`kvmd/msd`, `kvmd/ws`) are
    /// resolved relative to it.
    pub daemon_url: String,
    /// Sent as `X-KVMD-User` when set.
    pub user: Option<String>,
    /// Sent as `X-KVMD-Passwd` together with `user`.
    pub passwd: Option<String>,
    /// Pointer move transmission period.
    pub move_interval_ms: u64,
    /// Timeout for status/connect/reset requests.  Uploads have none.
    pub http_timeout_secs: u64,
    /// Size of the chunks an image is streamed in; one progress event per chunk.
    pub upload_chunk_size: usize,
    /// Treat the pointer as always captured, as on touch devices.
    pub touch_capture: bool,
    /// Fallback `tracing` level when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ConsoleConfig {
    /// | Field              | Default            |
    /// |--------------------|--------------------|
    /// | daemon_url         | `http://127.0.0.1` |
    /// | move_interval_ms   | 100                |
    /// | http_timeout_secs  | 30                 |
    /// | upload_chunk_size  | 65536              |
    /// | touch_capture      | false              |
    /// | log_level          | `info`             |
    fn default() -> Self {
        Self {
            daemon_url: "http://127.0.0.1".to_string(),
            user: None,
            passwd: None,
            move_interval_ms: 100,
            http_timeout_secs: 30,
            upload_chunk_size: 65536,
            touch_capture: false,
            log_level: "info".to_string(),
        }
    }
}

/// Daemon login sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub passwd: String,
}

impl ConsoleConfig {
    pub fn move_interval(&self) -> Duration {
        Duration::from_millis(self.move_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Credentials when a user is configured; a missing password is empty.
    pub fn credentials(&self) -> Option<Credentials> {
        self.user.as_ref().map(|user| Credentials {
            user: user.clone(),
            passwd: self.passwd.clone().unwrap_or_default(),
        })
    }

    /// Checks values serde cannot constrain.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`] for a chunk size below
    /// [`MIN_UPLOAD_CHUNK_SIZE`] or a zero move interval (which would make the
    /// pointer timer spin).
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.upload_chunk_size < MIN_UPLOAD_CHUNK_SIZE {
            return Err(InvalidConfig::ChunkTooSmall(self.upload_chunk_size));
        }
        if self.move_interval_ms == 0 {
            return Err(InvalidConfig::ZeroMoveInterval);
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
