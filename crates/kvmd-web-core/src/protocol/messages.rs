//! Wire messages for the daemon's control WebSocket and HTTP API.
//!
//! # Outbound (client → daemon)
//!
//! Every HID event is a JSON object discriminated by `event_type`:
//!
//! ```json
//! {"event_type":"mouse_button","button":"left","state":true}
//! {"event_type":"mouse_move","to":{"x":-32768,"y":120}}
//! {"event_type":"mouse_wheel","delta":{"x":0,"y":-5}}
//! ```
//!
//! # Inbound (daemon → client)
//!
//! The daemon pushes state changes as `{"event_type": ..., "event": {...}}`.
//! Only `msd_state` and `hid_state` are understood here; anything else is
//! surfaced as [`DaemonEvent::Other`] so the caller can log and skip it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::msd::status::MsdStatus;

// ── Outbound HID events ───────────────────────────────────────────────────────

/// Mouse button names understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButtonName {
    Left,
    Right,
}

/// Absolute pointer position in the signed 16-bit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point16 {
    pub x: i16,
    pub y: i16,
}

/// Wheel step; `x` is always 0 because horizontal scrolling is not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelDelta {
    pub x: i8,
    pub y: i8,
}

/// A HID event sent to the daemon over the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum HidEvent {
    MouseButton { button: MouseButtonName, state: bool },
    MouseMove { to: Point16 },
    MouseWheel { delta: WheelDelta },
}

impl HidEvent {
    /// Serializes the event to the JSON text frame sent on the channel.
    pub fn to_json(&self) -> String {
        // Infallible for this enum.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ── Inbound daemon events ─────────────────────────────────────────────────────

/// Health of the remote HID device, carried by `hid_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidState {
    pub ok: bool,
}

/// Errors from decoding daemon messages.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed daemon event: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A state change pushed by the daemon.
#[derive(Debug, Clone, PartialEq)]
pub enum DaemonEvent {
    MsdState(MsdStatus),
    HidState(HidState),
    /// Any other event type, by name.
    Other(String),
}

#[derive(Deserialize)]
struct RawEvent {
    event_type: String,
    #[serde(default)]
    event: serde_json::Value,
}

impl DaemonEvent {
    /// Parses one text frame from the control channel.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Malformed`] if the frame is not a JSON object
    /// with an `event_type`, or if a known event carries a body of the wrong
    /// shape.
    pub fn parse(text: &str) -> Result<Self, EventError> {
        let raw: RawEvent = serde_json::from_str(text)?;
        let event = match raw.event_type.as_str() {
            "msd_state" => DaemonEvent::MsdState(serde_json::from_value(raw.event)?),
            "hid_state" => DaemonEvent::HidState(serde_json::from_value(raw.event)?),
            _ => DaemonEvent::Other(raw.event_type),
        };
        Ok(event)
    }
}

/// The `{ok, result}` envelope wrapping JSON responses of the HTTP API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub ok: bool,
    pub result: T,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msd::status::Target;
    use serde_json::json;

    #[test]
    fn test_mouse_button_json_shape() {
        let event = HidEvent::MouseButton { button: MouseButtonName::Right, state: true };
        let value: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(value, json!({"event_type": "mouse_button", "button": "right", "state": true}));
    }

    #[test]
    fn test_mouse_move_json_shape() {
        let event = HidEvent::MouseMove { to: Point16 { x: -32768, y: 32767 } };
        let value: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(value, json!({"event_type": "mouse_move", "to": {"x": -32768, "y": 32767}}));
    }

    #[test]
    fn test_mouse_wheel_json_shape() {
        let event = HidEvent::MouseWheel { delta: WheelDelta { x: 0, y: -5 } };
        let value: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(value, json!({"event_type": "mouse_wheel", "delta": {"x": 0, "y": -5}}));
    }

    #[test]
    fn test_parse_msd_state_event() {
        let text = r#"{"event_type":"msd_state","event":{"connected_to":"kvm","busy":false,"in_operate":true,"info":{"size":1000,"image":null}}}"#;
        match DaemonEvent::parse(text).unwrap() {
            DaemonEvent::MsdState(status) => {
                assert_eq!(status.connected_to, Target::Kvm);
                assert_eq!(status.info.size, 1000);
            }
            other => panic!("expected MsdState, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_hid_state_ignores_extra_fields() {
        let text = r#"{"event_type":"hid_state","event":{"ok":false,"features":7}}"#;
        assert_eq!(
            DaemonEvent::parse(text).unwrap(),
            DaemonEvent::HidState(HidState { ok: false })
        );
    }

    #[test]
    fn test_parse_unknown_event_is_other() {
        let text = r#"{"event_type":"atx_state","event":{"leds":{"power":true}}}"#;
        assert_eq!(DaemonEvent::parse(text).unwrap(), DaemonEvent::Other("atx_state".into()));
    }

    #[test]
    fn test_parse_known_event_with_bad_body_is_error() {
        let text = r#"{"event_type":"hid_state","event":{"ok":"yes"}}"#;
        assert!(DaemonEvent::parse(text).is_err());
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(DaemonEvent::parse("not json").is_err());
    }

    #[test]
    fn test_envelope_unwraps_status() {
        let text = r#"{"ok":true,"result":{"connected_to":"server","busy":false,"in_operate":true,"info":{"size":5}}}"#;
        let envelope: ApiEnvelope<MsdStatus> = serde_json::from_str(text).unwrap();
        assert!(envelope.ok);
        assert_eq!(envelope.result.connected_to, Target::Server);
    }
}
