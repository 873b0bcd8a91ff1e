//! MSD status snapshot as pushed by the daemon, and the locally selected image.
//!
//! The snapshot is the JSON body of the daemon's `msd_state` event:
//!
//! ```json
//! {
//!   "connected_to": "kvm",
//!   "busy": false,
//!   "in_operate": true,
//!   "info": { "size": 7948206080, "image": { "name": "arch.iso", "size": 652214272, "complete": true } }
//! }
//! ```
//!
//! `info.image` only carries meaning while `in_operate` is `true`; the render
//! model ignores it otherwise.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The machine the MSD is currently attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Attached to the controlled computer.
    Kvm,
    /// Attached to the KVM host itself, for image management.
    Server,
}

impl Target {
    /// The value used on the wire (`?to=kvm`, `"connected_to": "server"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Kvm => "kvm",
            Target::Server => "server",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kvm" => Ok(Target::Kvm),
            "server" => Ok(Target::Server),
            other => Err(format!("unknown MSD target '{other}' (expected 'kvm' or 'server')")),
        }
    }
}

/// Full MSD status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsdStatus {
    pub connected_to: Target,
    /// An image write is in progress (possibly started by another client).
    pub busy: bool,
    /// The device is operational; when `false` nothing can be done with it.
    pub in_operate: bool,
    pub info: MsdInfo,
}

/// Storage capacity and the image currently on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsdInfo {
    /// Capacity of the backing storage in bytes.
    pub size: u64,
    #[serde(default)]
    pub image: Option<MsdImage>,
}

/// Metadata about the image stored on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsdImage {
    pub name: String,
    pub size: u64,
    /// `false` when a previous write was interrupted.
    pub complete: bool,
}

impl MsdStatus {
    /// The image, but only when the device is operational.
    pub fn operational_image(&self) -> Option<&MsdImage> {
        if self.in_operate {
            self.info.image.as_ref()
        } else {
            None
        }
    }
}

/// A local file the user picked as the next image to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Name sent as `image_name` and shown in the pending-file panel.
    pub name: String,
    /// Size in bytes, checked against the storage capacity before accepting.
    pub size: u64,
    /// Where the bytes are read from when the upload starts.
    pub path: PathBuf,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
