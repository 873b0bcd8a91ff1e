//! Indicator colours shared by the MSD and pointer indicators.

/// Indicator colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Led {
    Gray,
    Green,
    Yellow,
    /// Fast blinking, used while an image is being written.
    FastBlink,
}

impl Led {
    /// CSS-style class name, handy for presenters that log or style by name.
    pub fn class_name(self) -> &'static str {
        match self {
            Led::Gray => "led-gray",
            Led::Green => "led-green",
            Led::Yellow => "led-yellow",
            Led::FastBlink => "led-msd-writing",
        }
    }
}
