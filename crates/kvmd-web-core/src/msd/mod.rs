//! Mass Storage Device domain types.
//!
//! - `status` – the snapshot pushed by the daemon and the locally selected file.
//! - `view`   – the pure `render` function turning status + local state into
//!   everything the MSD panel displays.
//! - `size`   – base-1024 size formatting used by every size label.

pub mod size;
pub mod status;
pub mod view;
