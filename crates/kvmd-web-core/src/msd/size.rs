//! Human-readable size labels.
//!
//! Sizes are shown with base-1024 units and two decimals: `1536` becomes
//! `"1.50 kB"`.  A size of zero is the odd one out and renders as the bare
//! literal `0`, without a unit.

use std::fmt;

/// Units indexed by the power of 1024.
const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];

/// A formatted size, as shown in the storage, image and pending-file labels.
///
/// `Zero` is kept as its own variant rather than `Sized { value: 0.0, .. }`
/// so that callers (and tests) can tell the unit-less zero apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormattedSize {
    /// The size was zero; displays as `0`.
    Zero,
    /// A non-zero size scaled into `unit`.
    Sized {
        /// `size / 1024^index`.
        value: f64,
        /// One of `B`, `kB`, `MB`, `GB`, `TB`.
        unit: &'static str,
    },
}

impl fmt::Display for FormattedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormattedSize::Zero => f.write_str("0"),
            FormattedSize::Sized { value, unit } => write!(f, "{value:.2} {unit}"),
        }
    }
}

/// Formats `size` bytes using base-1024 units.
///
/// The unit index is `floor(log_1024(size))`, computed on integers so that
/// exact powers of 1024 never land one unit too low.  Sizes beyond the
/// terabyte range stay in `TB`.
///
/// # Example
///
/// ```rust
/// use kvmd_web_core::format_size;
///
/// assert_eq!(format_size(1536).to_string(), "1.50 kB");
/// assert_eq!(format_size(0).to_string(), "0");
/// ```
pub fn format_size(size: u64) -> FormattedSize {
    if size == 0 {
        return FormattedSize::Zero;
    }

    let mut index = 0usize;
    let mut divisor = 1u64;
    while index + 1 < UNITS.len() && size / divisor >= 1024 {
        divisor *= 1024;
        index += 1;
    }

    FormattedSize::Sized {
        value: size as f64 / divisor as f64,
        unit: UNITS[index],
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
