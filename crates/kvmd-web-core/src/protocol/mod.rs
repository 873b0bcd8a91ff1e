//! JSON messages exchanged with the daemon.
//!
//! - `messages` – HID events sent over the control channel, daemon events
//!   received on it, and the `{ok, result}` envelope of HTTP responses.

pub mod messages;
