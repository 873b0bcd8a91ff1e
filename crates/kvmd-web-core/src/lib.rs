//! # kvmd-web-core
//!
//! Shared domain library for the KVMD web console: the pure state and
//! rendering logic behind the Mass Storage Device (MSD) panel and the
//! pointer forwarder, plus the JSON messages exchanged with the daemon.
//!
//! This crate has zero dependencies on sockets, HTTP clients, async runtimes
//! or UI toolkits.  Everything here is a plain function of its inputs, which
//! is what lets the controllers in `kvmd-web-console` be tested without a
//! browser or a running appliance.
//!
//! # Modules
//!
//! - **`msd`** – The daemon's MSD status snapshot, the derived render model
//!   ([`MsdView`]) and human-readable size formatting.
//!
//! - **`pointer`** – Viewport geometry, the coordinate rescale to the signed
//!   16-bit range, the move/wheel coalescing tracker and the link indicator.
//!
//! - **`protocol`** – Outbound HID events and inbound daemon events as they
//!   appear on the control WebSocket.

pub mod led;
pub mod msd;
pub mod pointer;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `kvmd_web_core::MsdView` instead of `kvmd_web_core::msd::view::MsdView`.
pub use led::Led;
pub use msd::size::{format_size, FormattedSize};
pub use msd::status::{ImageFile, MsdImage, MsdInfo, MsdStatus, Target};
pub use msd::view::{
    render, LocalMsdState, MsdButtons, MsdCommand, MsdMode, MsdView, PendingFileView,
    ProgressView, UploadProgress,
};
pub use pointer::geometry::{rescale, Position, Rect, Viewport};
pub use pointer::indicator::PointerIndicator;
pub use pointer::tracker::{button_from_dom, PointerTracker};
pub use protocol::messages::{DaemonEvent, HidEvent, HidState, MouseButtonName};
