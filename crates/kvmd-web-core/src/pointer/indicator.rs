//! The mouse indicator.
//!
//! A pure function of three facts: is there a control channel, is the remote
//! HID device healthy, and is the pointer captured (hovering the region, or
//! always on touch clients).

use crate::led::Led;

/// Colour and tooltip of the mouse LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerIndicator {
    pub led: Led,
    pub title: &'static str,
}

impl PointerIndicator {
    pub fn compute(channel: bool, device_ok: bool, captured: bool) -> Self {
        let (led, title) = match (channel, device_ok, captured) {
            (false, _, false) => (Led::Gray, "Mouse free"),
            (false, _, true) => (Led::Gray, "Mouse free, offline"),
            (true, true, true) => (Led::Green, "Mouse tracked"),
            (true, true, false) => (Led::Gray, "Mouse free"),
            (true, false, true) => (Led::Yellow, "Mouse tracked, HID offline"),
            (true, false, false) => (Led::Yellow, "Mouse free, HID offline"),
        };
        Self { led, title }
    }
}
