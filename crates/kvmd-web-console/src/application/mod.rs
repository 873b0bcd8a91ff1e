//! Application layer: the MSD and pointer controllers.
//!
//! Both controllers follow the same pipeline: an input (a user gesture, a
//! pushed daemon snapshot, a transport callback) mutates a little state and
//! then synchronously re-renders through a UI trait.  Neither controller
//! performs I/O itself: network work goes through [`MsdTransport`] and
//! [`InputChannel`], whose results come back in as ordinary inputs.
//!
//! # Sub-modules
//!
//! - **`msd_controller`**     – image selection, upload lifecycle,
//!   connect/reset commands.
//! - **`pointer_controller`** – move coalescing, buttons, wheel, indicator.
//! - **`mock`**               – recording test doubles for the traits above.

pub mod mock;
pub mod msd_controller;
pub mod pointer_controller;

pub use msd_controller::{
    EventOutcome, MassStorageController, MsdError, MsdEvent, MsdTransport, MsdUi, UploadHandle,
    UploadId,
};
pub use pointer_controller::{
    ChannelError, EventResponse, InputChannel, PointerController, PointerUi, PointerView,
};
