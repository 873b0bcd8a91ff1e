//! Infrastructure layer: everything that touches the network, the file
//! system or the terminal.
//!
//! # Sub-modules
//!
//! - **`daemon_http`** – `reqwest` client for the MSD HTTP endpoints and the
//!   spawned-task [`MsdTransport`](crate::application::MsdTransport).
//! - **`ws_channel`**  – the control WebSocket: inbound daemon events,
//!   outbound HID events.
//! - **`presenter`**   – a UI binding that renders views as log lines.
//! - **`config_file`** – TOML loading for [`ConsoleConfig`](crate::domain::ConsoleConfig).
//! - **`shell`**       – the event loop that owns both controllers.

pub mod config_file;
pub mod daemon_http;
pub mod presenter;
pub mod shell;
pub mod ws_channel;

pub use config_file::{load_config, ConfigError};
pub use daemon_http::{DaemonClient, DaemonError, DaemonReply, HttpMsdTransport};
pub use presenter::TracingPresenter;
pub use shell::{image_file_from_path, ConsoleShell, ShellError};
pub use ws_channel::{connect_control_channel, ControlLink, WsChannel};
