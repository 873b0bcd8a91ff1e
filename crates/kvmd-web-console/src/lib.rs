//! kvmd-web-console library crate.
//!
//! Controllers for the two peripherals a KVMD web page drives, the Mass
//! Storage Device panel and the pointer forwarder, plus the plumbing that
//! connects them to a real daemon.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! UI binding (browser page, terminal, tests)
//!         ↕  MsdUi / PointerUi
//! [kvmd-web-console]
//!   ├── domain/           ConsoleConfig
//!   ├── application/      MassStorageController, PointerController,
//!   │                     and the traits they talk through
//!   └── infrastructure/
//!         ├── daemon_http/  reqwest client for /kvmd/msd/*
//!         ├── ws_channel/   control WebSocket (tokio-tungstenite)
//!         ├── presenter/    tracing-backed MsdUi / PointerUi
//!         ├── config_file/  TOML loading
//!         └── shell/        the single event loop owning both controllers
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `kvmd-web-core` only; the network
//!   is reached through the `MsdTransport` and `InputChannel` traits.
//! - `infrastructure` depends on everything else plus `tokio`, `reqwest` and
//!   `tokio-tungstenite`.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: the two controllers.
pub mod application;

/// Infrastructure layer: HTTP, WebSocket, logging presenter, event loop.
pub mod infrastructure;
