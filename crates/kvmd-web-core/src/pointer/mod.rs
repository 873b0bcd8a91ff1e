//! Pointer forwarding domain logic.
//!
//! - `geometry`  – viewport-local coordinates and the rescale to `i16`.
//! - `tracker`   – move coalescing and wheel accumulation.
//! - `indicator` – the mouse LED as a function of link state.

pub mod geometry;
pub mod indicator;
pub mod tracker;
