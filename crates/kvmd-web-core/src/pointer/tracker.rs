//! Move coalescing and wheel accumulation.
//!
//! The tracker never talks to the network.  It records what the UI reports
//! and hands back the [`HidEvent`] that should go out, if any; the caller
//! decides whether a channel exists to carry it.

use tracing::trace;

use super::geometry::{rescale, Position, Viewport};
use crate::protocol::messages::{HidEvent, MouseButtonName, Point16, WheelDelta};

/// Accumulated vertical delta at which one wheel step is emitted.
pub const WHEEL_THRESHOLD: f64 = 100.0;

/// Magnitude of the emitted wheel step.
pub const WHEEL_STEP: i8 = 5;

/// Maps a DOM `MouseEvent.button` code to a daemon button.
///
/// `0` is the left button and `2` the right one.  Everything else (including
/// the middle button, `1`) is not forwarded.
pub fn button_from_dom(code: i16) -> Option<MouseButtonName> {
    match code {
        0 => Some(MouseButtonName::Left),
        2 => Some(MouseButtonName::Right),
        _ => None,
    }
}

/// Pointer position and wheel bookkeeping for one capture region.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    current: Position,
    last_sent: Position,
    viewport: Viewport,
    wheel_y: f64,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest position and the region size it was measured in.
    pub fn observe(&mut self, position: Position, viewport: Viewport) {
        self.current = position;
        self.viewport = viewport;
    }

    pub fn current(&self) -> Position {
        self.current
    }

    pub fn last_sent(&self) -> Position {
        self.last_sent
    }

    /// Returns the `mouse_move` to transmit, or `None` if the position has
    /// not changed since the last call that returned `Some`.
    ///
    /// The position counts as sent as soon as this returns, whether or not
    /// the caller actually has a channel to send it on.
    pub fn take_move(&mut self) -> Option<HidEvent> {
        if self.current == self.last_sent {
            return None;
        }
        let to = Point16 {
            x: rescale(self.current.x, self.viewport.width),
            y: rescale(self.current.y, self.viewport.height),
        };
        trace!(x = self.current.x, y = self.current.y, ?to, "pointer moved");
        self.last_sent = self.current;
        Some(HidEvent::MouseMove { to })
    }

    /// Adds a vertical wheel delta and returns a `mouse_wheel` once the
    /// accumulated magnitude reaches [`WHEEL_THRESHOLD`].
    ///
    /// The step is inverted relative to the accumulation: scrolling down
    /// (positive `deltaY`) emits `-5`.  The accumulator is cleared after the
    /// step has been computed.
    pub fn accumulate_wheel(&mut self, delta_y: f64) -> Option<HidEvent> {
        self.wheel_y += delta_y;
        if self.wheel_y.abs() < WHEEL_THRESHOLD {
            return None;
        }
        let y = if self.wheel_y > 0.0 { -WHEEL_STEP } else { WHEEL_STEP };
        self.wheel_y = 0.0;
        Some(HidEvent::MouseWheel { delta: WheelDelta { x: 0, y } })
    }

    /// Unsent vertical wheel delta.
    pub fn wheel_accumulator(&self) -> f64 {
        self.wheel_y
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
