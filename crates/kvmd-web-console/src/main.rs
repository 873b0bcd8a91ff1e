//! kvmd-console: a headless client for the KVMD daemon.
//!
//! Drives the same MSD and pointer controllers a web page would, with a
//! logging presenter in place of the DOM.
//!
//! # Usage
//!
//! ```text
//! kvmd-console [OPTIONS] <COMMAND>
//!
//! Commands:
//!   watch                  Follow the control channel and log state changes
//!   upload <FILE>          Upload an image to the Mass Storage Device
//!   connect <kvm|server>   Attach the Mass Storage Device to KVM or Server
//!   reset                  Reset the Mass Storage Device
//!
//! Options:
//!   -c, --config <FILE>    TOML configuration file
//!       --url <URL>        Daemon base URL
//!       --user <USER>      Login sent as X-KVMD-User
//!       --passwd <PASSWD>  Password sent as X-KVMD-Passwd
//!       --touch            Treat the pointer as always captured
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable              | Flag        |
//! |-----------------------|-------------|
//! | `KVMD_CONSOLE_CONFIG` | `--config`  |
//! | `KVMD_URL`            | `--url`     |
//! | `KVMD_USER`           | `--user`    |
//! | `KVMD_PASSWD`         | `--passwd`  |
//!
//! Flags win over the configuration file; `RUST_LOG` wins over `log_level`.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kvmd_web_console::domain::ConsoleConfig;
use kvmd_web_console::infrastructure::{
    image_file_from_path, load_config, ConsoleShell, TracingPresenter,
};
use kvmd_web_core::{MsdCommand, Target};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Headless client for the KVMD Mass Storage Device and pointer APIs.
#[derive(Debug, Parser)]
#[command(name = "kvmd-console", version)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "KVMD_CONSOLE_CONFIG")]
    config: Option<PathBuf>,

    /// Daemon base URL, e.g. `https://pikvm.local`.
    #[arg(long, env = "KVMD_URL")]
    url: Option<String>,

    #[arg(long, env = "KVMD_USER")]
    user: Option<String>,

    #[arg(long, env = "KVMD_PASSWD", hide_env_values = true)]
    passwd: Option<String>,

    /// Treat the pointer as always captured, as on touch devices.
    #[arg(long)]
    touch: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Follow the control channel and log every state change until Ctrl+C.
    Watch,
    /// Upload an image to the Mass Storage Device.
    Upload {
        file: PathBuf,
        /// Image name on the device; defaults to the file name.
        #[arg(long)]
        name: Option<String>,
    },
    /// Attach the Mass Storage Device to `kvm` or `server`.
    Connect { target: Target },
    /// Reset the Mass Storage Device.
    Reset,
}

impl Cli {
    /// Loads the configuration file (if any) and applies flag overrides.
    fn resolve_config(&self) -> anyhow::Result<ConsoleConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("cannot load config from {}", path.display()))?,
            None => ConsoleConfig::default(),
        };
        if let Some(url) = &self.url {
            config.daemon_url = url.clone();
        }
        if let Some(user) = &self.user {
            config.user = Some(user.clone());
        }
        if let Some(passwd) = &self.passwd {
            config.passwd = Some(passwd.clone());
        }
        if self.touch {
            config.touch_capture = true;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("kvmd-console starting, daemon={}", config.daemon_url);

    let presenter = Arc::new(TracingPresenter::new());
    let mut shell = ConsoleShell::new(config, presenter.clone(), presenter)
        .context("invalid daemon settings")?;

    match cli.command {
        Command::Watch => {
            let running = Arc::new(AtomicBool::new(true));
            let running_clone = Arc::clone(&running);
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("received Ctrl+C, stopping");
                        running_clone.store(false, Ordering::Relaxed);
                    }
                    Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
                }
            });
            shell.watch(running).await.context("control channel failed")?;
        }
        Command::Upload { file, name } => {
            let image = image_file_from_path(&file, name)?;
            shell
                .upload(image)
                .await
                .with_context(|| format!("upload of {} failed", file.display()))?;
            info!("upload complete");
        }
        Command::Connect { target } => {
            shell
                .command(MsdCommand::Connect(target))
                .await
                .with_context(|| format!("cannot connect the MSD to {target}"))?;
            info!("MSD connected to {target}");
        }
        Command::Reset => {
            shell.command(MsdCommand::Reset).await.context("MSD reset failed")?;
            info!("MSD reset");
        }
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_watch_uses_default_config() {
        // Arrange
        let cli = Cli::parse_from(["kvmd-console", "watch"]);

        // Act
        let config = cli.resolve_config().unwrap();

        // Assert
        assert_eq!(config, ConsoleConfig::default());
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::parse_from([
            "kvmd-console",
            "--url",
            "https://kvm.example",
            "--user",
            "admin",
            "--passwd",
            "secret",
            "--touch",
            "reset",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.daemon_url, "https://kvm.example");
        assert_eq!(config.user.as_deref(), Some("admin"));
        assert_eq!(config.passwd.as_deref(), Some("secret"));
        assert!(config.touch_capture);
    }

    #[test]
    fn test_cli_connect_parses_target() {
        let cli = Cli::parse_from(["kvmd-console", "connect", "server"]);
        assert!(matches!(cli.command, Command::Connect { target: Target::Server }));
    }

    #[test]
    fn test_cli_connect_rejects_unknown_target() {
        let result = Cli::try_parse_from(["kvmd-console", "connect", "usb"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_upload_name_override() {
        let cli = Cli::parse_from(["kvmd-console", "upload", "/tmp/a.iso", "--name", "b.iso"]);
        match cli.command {
            Command::Upload { file, name } => {
                assert_eq!(file, PathBuf::from("/tmp/a.iso"));
                assert_eq!(name.as_deref(), Some("b.iso"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_missing_config_file_is_error() {
        let cli = Cli::parse_from(["kvmd-console", "--config", "/nonexistent/console.toml", "watch"]);
        assert!(cli.resolve_config().is_err());
    }
}
