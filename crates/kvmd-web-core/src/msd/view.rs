//! The MSD render model.
//!
//! [`render`] is a pure function from the last pushed [`MsdStatus`] and the
//! client's own upload bookkeeping ([`LocalMsdState`]) to an [`MsdView`]:
//! every label, banner, indicator and button state the MSD panel shows.
//!
//! The panel's behaviour is a small state machine (no status / idle /
//! uploading / switching), but it is never stored.  It is re-derived on each
//! render as an [`MsdMode`], so the button rules below are the only place
//! the boolean combinations live.

use super::size::format_size;
use crate::led::Led;
use super::status::{ImageFile, MsdStatus, Target};

/// Label shown in the progress bar while nothing is being uploaded.
pub const PROGRESS_WAITING: &str = "Waiting for upload...";

/// Label shown in the progress bar after the user aborted an upload.
pub const PROGRESS_ABORTED: &str = "Aborted";

/// Shown in the image name/size labels when there is no image to describe.
pub const NONE_LABEL: &str = "None";

/// Shown in the storage size label when the device is not operational.
pub const UNAVAILABLE_LABEL: &str = "Unavailable";

// ── Local state ───────────────────────────────────────────────────────────────

/// A network command issued by this client and not yet answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsdCommand {
    /// `POST /kvmd/msd/connect?to=<target>`
    Connect(Target),
    /// `POST /kvmd/msd/reset`
    Reset,
}

/// Upload progress as last reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadProgress {
    /// No progress event has arrived yet.
    #[default]
    Waiting,
    /// Percentage transferred, `0..=100`.
    Active(u8),
    /// The user aborted the last upload.
    Aborted,
}

impl UploadProgress {
    /// Computes `round(loaded * 100 / total)`.
    ///
    /// Returns `None` when the total is unknown or zero; such events leave
    /// the progress bar untouched.
    pub fn from_bytes(loaded: u64, total: Option<u64>) -> Option<Self> {
        let total = total.filter(|t| *t > 0)?;
        let percent = (loaded as f64 * 100.0 / total as f64).round().min(100.0);
        Some(UploadProgress::Active(percent as u8))
    }
}

/// Everything the render needs from the controller besides the status.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalMsdState<'a> {
    /// The image picked by the user, if any.
    pub selected: Option<&'a ImageFile>,
    /// This client holds an upload handle.
    pub upload_in_flight: bool,
    /// A connect/reset request sent by this client awaiting its response.
    pub pending: Option<MsdCommand>,
    pub progress: UploadProgress,
}

// ── View ──────────────────────────────────────────────────────────────────────

/// The panel's derived mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsdMode {
    /// No status has been pushed (or the link went away).
    NoState,
    /// Nothing is happening.
    Idle,
    /// An image write is in progress, by this client or another one.
    Uploading,
    /// A connect or reset request is awaiting its response.
    Switching,
}

impl MsdMode {
    fn derive(status: Option<&MsdStatus>, local: &LocalMsdState<'_>) -> Self {
        match status {
            None => MsdMode::NoState,
            Some(s) if s.busy || local.upload_in_flight => MsdMode::Uploading,
            Some(_) if local.pending.is_some() => MsdMode::Switching,
            Some(_) => MsdMode::Idle,
        }
    }
}

/// Disabled flags for every MSD button; `true` means disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsdButtons {
    pub switch_to_kvm: bool,
    pub switch_to_server: bool,
    pub select_new_image: bool,
    pub upload: bool,
    pub abort_upload: bool,
    pub reset: bool,
}

impl MsdButtons {
    /// Every button disabled.
    pub const ALL_DISABLED: MsdButtons = MsdButtons {
        switch_to_kvm: true,
        switch_to_server: true,
        select_new_image: true,
        upload: true,
        abort_upload: true,
        reset: true,
    };

    /// `true` when no button can be pressed.
    pub fn all_disabled(&self) -> bool {
        *self == Self::ALL_DISABLED
    }
}

/// The pending-file panel contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFileView {
    pub name: String,
    pub size: String,
}

/// The progress bar contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub label: String,
    /// Bar width in percent.
    pub percent: u8,
}

impl ProgressView {
    fn waiting() -> Self {
        Self { label: PROGRESS_WAITING.to_string(), percent: 0 }
    }
}

/// Everything the MSD panel displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsdView {
    pub mode: MsdMode,
    pub led: Led,
    pub led_title: String,
    pub status_text: String,
    /// "Someone else is uploading an image" banner.
    pub other_user_uploading: bool,
    /// "The current image is broken" banner.
    pub image_broken: bool,
    pub image_name: String,
    pub image_size: String,
    pub storage_size: String,
    pub buttons: MsdButtons,
    /// `None` hides the pending-file panel.
    pub pending_file: Option<PendingFileView>,
    pub progress: ProgressView,
}

/// Renders the MSD panel.
///
/// # Example
///
/// ```rust
/// use kvmd_web_core::{render, LocalMsdState, MsdMode};
///
/// let view = render(None, &LocalMsdState::default());
/// assert_eq!(view.mode, MsdMode::NoState);
/// assert!(view.buttons.all_disabled());
/// ```
pub fn render(status: Option<&MsdStatus>, local: &LocalMsdState<'_>) -> MsdView {
    let mode = MsdMode::derive(status, local);

    let Some(status) = status else {
        return MsdView {
            mode,
            led: Led::Gray,
            led_title: String::new(),
            status_text: String::new(),
            other_user_uploading: false,
            image_broken: false,
            image_name: String::new(),
            image_size: String::new(),
            storage_size: String::new(),
            buttons: MsdButtons::ALL_DISABLED,
            pending_file: None,
            progress: ProgressView::waiting(),
        };
    };

    let uploading = local.upload_in_flight;
    let (led, led_title, status_text, other_user_uploading) = if status.connected_to == Target::Server {
        (Led::Green, "MSD connected to Server", "Connected to Server", false)
    } else if status.busy {
        (Led::FastBlink, "Uploading new image", "Uploading new image", !uploading)
    } else if status.in_operate {
        (Led::Gray, "MSD connected to KVM", "Connected to KVM", false)
    } else {
        (Led::Gray, "MSD unavailable", UNAVAILABLE_LABEL, false)
    };

    let image = status.operational_image();
    let image_broken = image.map_or(false, |i| !i.complete) && !status.busy;
    let (image_name, image_size) = match image {
        Some(i) => (i.name.clone(), format_size(i.size).to_string()),
        None => (NONE_LABEL.to_string(), NONE_LABEL.to_string()),
    };
    let storage_size = if status.in_operate {
        format_size(status.info.size).to_string()
    } else {
        UNAVAILABLE_LABEL.to_string()
    };

    let off = !status.in_operate;
    let on_kvm = status.connected_to == Target::Kvm;
    let buttons = MsdButtons {
        switch_to_kvm: off
            || on_kvm
            || status.busy
            || local.pending == Some(MsdCommand::Connect(Target::Kvm)),
        switch_to_server: off
            || !on_kvm
            || status.busy
            || local.pending == Some(MsdCommand::Connect(Target::Server)),
        select_new_image: off || !on_kvm || status.busy || uploading,
        upload: off || !on_kvm || status.busy || local.selected.is_none() || uploading,
        abort_upload: off || !uploading,
        reset: off || uploading || local.pending == Some(MsdCommand::Reset),
    };

    let pending_file = local.selected.map(|file| PendingFileView {
        name: file.name.clone(),
        size: format_size(file.size).to_string(),
    });

    let progress = match local.progress {
        UploadProgress::Active(percent) if uploading => ProgressView {
            label: format!("{percent}%"),
            percent,
        },
        UploadProgress::Aborted => ProgressView {
            label: PROGRESS_ABORTED.to_string(),
            percent: 0,
        },
        _ => ProgressView::waiting(),
    };

    MsdView {
        mode,
        led,
        led_title: led_title.to_string(),
        status_text: status_text.to_string(),
        other_user_uploading,
        image_broken,
        image_name,
        image_size,
        storage_size,
        buttons,
        pending_file,
        progress,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
