//! PointerController: forwards pointer input from the capture region.
//!
//! Moves are not sent as they happen.  The controller only records the
//! latest position; a fixed-period timer calls [`PointerController::tick`],
//! which transmits at most one `mouse_move` and only when the position
//! changed.  Buttons and touches force a move first so the daemon has the
//! current coordinates before the click lands.
//!
//! The mouse indicator is re-rendered whenever the channel, the device
//! health or the hover state changes.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace, warn};

use kvmd_web_core::{
    button_from_dom, HidEvent, HidState, MouseButtonName, PointerIndicator, PointerTracker, Rect,
};

/// Errors from sending on the control channel.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("control channel is closed")]
    Closed,
}

/// The control channel HID events are sent on.
#[cfg_attr(test, mockall::automock)]
pub trait InputChannel: Send + Sync {
    fn send(&self, event: &HidEvent) -> Result<(), ChannelError>;
}

/// What the UI layer should do with the native event it just reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    /// Suppress the default action (scrolling, context menu, text selection).
    PreventDefault,
}

/// Everything the pointer UI displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerView {
    /// The capture region accepts input (a channel exists).
    pub capture_active: bool,
    pub indicator: PointerIndicator,
}

/// The UI binding for the pointer indicator and capture region.
pub trait PointerUi: Send + Sync {
    fn render(&self, view: &PointerView);
}

/// The pointer forwarding controller.
pub struct PointerController {
    ui: Arc<dyn PointerUi>,
    channel: Option<Arc<dyn InputChannel>>,
    device_ok: bool,
    hovered: bool,
    touch_capture: bool,
    tracker: PointerTracker,
}

impl PointerController {
    /// Creates a controller.  `touch_capture` makes the region count as
    /// captured regardless of hover, for touch-only clients.
    pub fn new(ui: Arc<dyn PointerUi>, touch_capture: bool) -> Self {
        Self {
            ui,
            channel: None,
            device_ok: true,
            hovered: false,
            touch_capture,
            tracker: PointerTracker::new(),
        }
    }

    pub fn tracker(&self) -> &PointerTracker {
        &self.tracker
    }

    fn captured(&self) -> bool {
        self.hovered || self.touch_capture
    }

    pub fn view(&self) -> PointerView {
        PointerView {
            capture_active: self.channel.is_some(),
            indicator: PointerIndicator::compute(self.channel.is_some(), self.device_ok, self.captured()),
        }
    }

    fn render(&self) {
        self.ui.render(&self.view());
    }

    pub fn set_socket(&mut self, channel: Option<Arc<dyn InputChannel>>) {
        debug!(present = channel.is_some(), "pointer channel changed");
        self.channel = channel;
        self.render();
    }

    pub fn set_state(&mut self, state: HidState) {
        self.device_ok = state.ok;
        self.render();
    }

    /// Pointer entered (`true`) or left (`false`) the capture region.
    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
        self.render();
    }

    /// Mouse button pressed or released inside the region.
    ///
    /// `code` is the DOM `MouseEvent.button`; `0` is left and `2` is right.
    pub fn mouse_button(&mut self, code: i16, pressed: bool) -> EventResponse {
        match button_from_dom(code) {
            Some(button) => self.send_button(button, pressed),
            None => trace!(code, "ignoring unmapped mouse button"),
        }
        EventResponse::PreventDefault
    }

    pub fn context_menu(&self) -> EventResponse {
        EventResponse::PreventDefault
    }

    /// Records the position; nothing is sent until the next tick.
    pub fn mouse_move(&mut self, client_x: f64, client_y: f64, region: Rect) {
        self.tracker.observe(region.local_position(client_x, client_y), region.viewport());
    }

    /// Records the first touch point and sends it immediately.
    pub fn touch_start(&mut self, client_x: f64, client_y: f64, region: Rect) {
        self.mouse_move(client_x, client_y, region);
        self.send_move();
    }

    /// Timer step: sends the position if it changed since the last send.
    pub fn tick(&mut self) {
        self.send_move();
    }

    /// Brings the daemon up to date with the position, then sends the button.
    pub fn send_button(&mut self, button: MouseButtonName, pressed: bool) {
        self.send_move();
        self.send(&HidEvent::MouseButton { button, state: pressed });
    }

    /// Wheel inside the region; only the vertical delta is forwarded.
    pub fn wheel(&mut self, _delta_x: f64, delta_y: f64) -> EventResponse {
        if let Some(step) = self.tracker.accumulate_wheel(delta_y) {
            self.send(&step);
        }
        EventResponse::PreventDefault
    }

    fn send_move(&mut self) {
        // The position counts as sent even without a channel.
        if let Some(event) = self.tracker.take_move() {
            self.send(&event);
        }
    }

    fn send(&self, event: &HidEvent) {
        let Some(channel) = &self.channel else {
            return;
        };
        if let Err(e) = channel.send(event) {
            warn!("dropping {event:?}: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
