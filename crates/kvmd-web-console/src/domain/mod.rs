//! Domain layer for kvmd-web-console.
//!
//! Only the runtime configuration lives here; the MSD and pointer domain
//! types come from `kvmd-web-core`.

pub mod config;

pub use config::{ConsoleConfig, Credentials, InvalidConfig};
