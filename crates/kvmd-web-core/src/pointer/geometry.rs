//! Capture-region geometry.
//!
//! The UI layer reports pointer positions in page ("client") coordinates
//! together with the capture region's bounding box.  Positions are kept in
//! viewport-local integer pixels and only converted to the daemon's signed
//! 16-bit absolute range at transmission time.

/// Lowest value of the daemon's absolute coordinate range.
pub const ABS_MIN: i16 = i16::MIN;
/// Highest value of the daemon's absolute coordinate range.
pub const ABS_MAX: i16 = i16::MAX;

/// Viewport-local pixel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Size of the capture region in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Bounding box of the capture region in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Converts a page-coordinate point into integer viewport-local pixels.
    pub fn local_position(&self, client_x: f64, client_y: f64) -> Position {
        Position {
            x: round_half_up(client_x - self.left) as i32,
            y: round_half_up(client_y - self.top) as i32,
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport { width: self.width, height: self.height }
    }
}

/// Rounds halves towards positive infinity, the way browsers round pixels.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Linearly maps `value` from `[0, extent]` onto `[-32768, 32767]`.
///
/// Values outside the region clamp to the range bounds.  A degenerate
/// (zero or negative) extent maps everything to the lower bound.
///
/// # Example
///
/// ```rust
/// use kvmd_web_core::rescale;
///
/// assert_eq!(rescale(0, 1920.0), -32768);
/// assert_eq!(rescale(1920, 1920.0), 32767);
/// ```
pub fn rescale(value: i32, extent: f64) -> i16 {
    if extent <= 0.0 || !extent.is_finite() {
        return ABS_MIN;
    }
    let span = f64::from(ABS_MAX) - f64::from(ABS_MIN);
    let scaled = round_half_up(f64::from(value) / extent * span + f64::from(ABS_MIN));
    scaled.clamp(f64::from(ABS_MIN), f64::from(ABS_MAX)) as i16
}

// ── Tests ─────────────────────────────────────────────────────────────────────
