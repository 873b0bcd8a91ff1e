//! MassStorageController: the MSD panel's state and its network commands.
//!
//! The controller keeps the last status snapshot pushed by the daemon plus
//! the client's own bookkeeping (selected file, upload handle, pending
//! command, progress) and re-renders the whole panel after every change.
//!
//! # Asynchronous results
//!
//! Network operations are started through [`MsdTransport`] and return
//! immediately.  Their outcome arrives later as an [`MsdEvent`] that the
//! event loop feeds back into [`MassStorageController::handle_event`], so
//! all state mutation happens on one task and no locking is needed.
//!
//! # Upload exclusivity
//!
//! At most one upload exists per controller.  Each upload is tagged with an
//! [`UploadId`]; aborting forgets the id *before* cancelling the transfer, so
//! progress or completion events that were already queued for it are
//! recognised as stale and dropped instead of causing a spurious render.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use kvmd_web_core::{
    format_size, render, ImageFile, LocalMsdState, MsdCommand, MsdStatus, MsdView, Target,
    UploadProgress,
};

/// HTTP status the daemon answers successful requests with.
const HTTP_OK: u16 = 200;

// ── Identifiers and handles ───────────────────────────────────────────────────

/// Identifies one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UploadId(Uuid);

impl UploadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The in-flight transfer of one upload.
///
/// Dropping the handle does not cancel the transfer; only
/// [`MassStorageController::abort_upload`] does.
pub struct UploadHandle {
    id: UploadId,
    cancel: Box<dyn FnOnce() + Send>,
}

impl UploadHandle {
    /// A handle whose transfer is stopped by calling `cancel`.
    pub fn new(id: UploadId, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { id, cancel: Box::new(cancel) }
    }

    pub fn id(&self) -> UploadId {
        self.id
    }

    fn cancel(self) {
        (self.cancel)();
    }
}

impl fmt::Debug for UploadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadHandle").field("id", &self.id).finish_non_exhaustive()
    }
}

// ── Ports ─────────────────────────────────────────────────────────────────────

/// Results of network operations, delivered back to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsdEvent {
    /// Bytes of an upload have been handed to the network.
    UploadProgress {
        id: UploadId,
        loaded: u64,
        /// `None` when the transport cannot tell the total length.
        total: Option<u64>,
    },
    /// An upload ended.  `status` is the HTTP status, or 0 when the request
    /// never got a response; `body` is the response text or error message.
    UploadFinished { id: UploadId, status: u16, body: String },
    /// A connect or reset request ended.
    CommandFinished { command: MsdCommand, status: u16, body: String },
}

/// The UI binding for the MSD panel.
pub trait MsdUi: Send + Sync {
    /// Applies a complete view of the panel.
    fn render(&self, view: &MsdView);

    /// Shows a user-facing error notification.
    fn notify_error(&self, message: &str);
}

/// Starts network operations against the daemon's MSD endpoints.
///
/// Implementations must not block: they start the work and report its
/// outcome later as [`MsdEvent`]s.
pub trait MsdTransport: Send + Sync {
    /// Starts a multipart upload of `file` to `/kvmd/msd/write`.
    fn start_upload(&self, id: UploadId, file: &ImageFile) -> UploadHandle;

    /// Sends a connect or reset request.
    fn send_command(&self, command: MsdCommand);
}

// ── Errors and outcomes ───────────────────────────────────────────────────────

/// Why an MSD operation was refused locally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MsdError {
    #[error("mass storage device status is unavailable")]
    Unavailable,
    #[error("image of {size} bytes does not fit in {max} bytes of storage")]
    ImageTooBig { size: u64, max: u64 },
    #[error("no image file selected")]
    NoImageSelected,
    #[error("an upload is already in progress")]
    UploadInProgress,
}

/// What [`MassStorageController::handle_event`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event belonged to an upload that is no longer tracked.
    Ignored,
    /// Upload progress was recorded.
    Progress,
    UploadFinished { ok: bool },
    CommandFinished { command: MsdCommand, ok: bool },
}

// ── Controller ────────────────────────────────────────────────────────────────

/// The MSD panel controller.
pub struct MassStorageController {
    ui: Arc<dyn MsdUi>,
    transport: Arc<dyn MsdTransport>,
    status: Option<MsdStatus>,
    image_file: Option<ImageFile>,
    upload: Option<UploadHandle>,
    pending: Option<MsdCommand>,
    progress: UploadProgress,
}

impl MassStorageController {
    pub fn new(ui: Arc<dyn MsdUi>, transport: Arc<dyn MsdTransport>) -> Self {
        Self {
            ui,
            transport,
            status: None,
            image_file: None,
            upload: None,
            pending: None,
            progress: UploadProgress::Waiting,
        }
    }

    pub fn status(&self) -> Option<&MsdStatus> {
        self.status.as_ref()
    }

    pub fn selected_image(&self) -> Option<&ImageFile> {
        self.image_file.as_ref()
    }

    pub fn upload_id(&self) -> Option<UploadId> {
        self.upload.as_ref().map(UploadHandle::id)
    }

    pub fn is_uploading(&self) -> bool {
        self.upload.is_some()
    }

    pub fn pending_command(&self) -> Option<MsdCommand> {
        self.pending
    }

    /// The panel as it would be rendered now.
    pub fn view(&self) -> MsdView {
        let local = LocalMsdState {
            selected: self.image_file.as_ref(),
            upload_in_flight: self.upload.is_some(),
            pending: self.pending,
            progress: self.progress,
        };
        render(self.status.as_ref(), &local)
    }

    fn render(&self) {
        let view = self.view();
        debug!(mode = ?view.mode, "rendering MSD panel");
        self.ui.render(&view);
    }

    /// Stores a new snapshot (or clears it when the link is gone) and
    /// re-renders.
    pub fn set_state(&mut self, status: Option<MsdStatus>) {
        self.status = status;
        self.render();
    }

    /// Accepts `file` as the next image unless it exceeds the storage size.
    ///
    /// # Errors
    ///
    /// - [`MsdError::Unavailable`] when no status has been pushed yet.
    /// - [`MsdError::ImageTooBig`] when the file does not fit; the user is
    ///   notified once and the previous selection is discarded.
    pub fn select_new_image_file(&mut self, file: ImageFile) -> Result<(), MsdError> {
        let Some(status) = &self.status else {
            warn!(name = %file.name, "image selected before MSD status is known");
            return Err(MsdError::Unavailable);
        };

        let max = status.info.size;
        if file.size > max {
            self.ui.notify_error(&format!(
                "New image is too big for your Mass Storage Device. Maximum: {}",
                format_size(max)
            ));
            self.image_file = None;
            self.render();
            return Err(MsdError::ImageTooBig { size: file.size, max });
        }

        info!(name = %file.name, size = file.size, "new image selected");
        self.image_file = Some(file);
        self.render();
        Ok(())
    }

    /// Starts uploading the selected image.
    ///
    /// # Errors
    ///
    /// [`MsdError::NoImageSelected`] or [`MsdError::UploadInProgress`].
    pub fn start_upload(&mut self) -> Result<UploadId, MsdError> {
        if self.upload.is_some() {
            return Err(MsdError::UploadInProgress);
        }
        let file = self.image_file.as_ref().ok_or(MsdError::NoImageSelected)?;

        let id = UploadId::new();
        info!(%id, name = %file.name, size = file.size, "starting image upload");
        self.upload = Some(self.transport.start_upload(id, file));
        self.progress = UploadProgress::Waiting;
        self.render();
        Ok(id)
    }

    /// Cancels the upload in flight, if any.
    pub fn abort_upload(&mut self) {
        // Forget the id first so events already queued for it are dropped.
        let Some(handle) = self.upload.take() else {
            debug!("abort requested with no upload in flight");
            return;
        };
        info!(id = %handle.id(), "aborting image upload");
        handle.cancel();
        // "Aborted" is shown by this render only.
        self.progress = UploadProgress::Aborted;
        self.render();
        self.progress = UploadProgress::Waiting;
    }

    /// Asks the daemon to attach the MSD to `target`.
    pub fn switch_target(&mut self, target: Target) {
        self.issue(MsdCommand::Connect(target));
    }

    /// Asks the daemon to reset the MSD.
    pub fn reset(&mut self) {
        self.issue(MsdCommand::Reset);
    }

    fn issue(&mut self, command: MsdCommand) {
        info!(?command, "sending MSD command");
        self.pending = Some(command);
        self.render();
        self.transport.send_command(command);
    }

    /// Applies the result of a network operation and re-renders.
    pub fn handle_event(&mut self, event: MsdEvent) -> EventOutcome {
        match event {
            MsdEvent::UploadProgress { id, loaded, total } => {
                if self.upload_id() != Some(id) {
                    debug!(%id, "dropping progress of a detached upload");
                    return EventOutcome::Ignored;
                }
                if let Some(progress) = UploadProgress::from_bytes(loaded, total) {
                    self.progress = progress;
                    self.render();
                }
                EventOutcome::Progress
            }
            MsdEvent::UploadFinished { id, status, body } => {
                if self.upload_id() != Some(id) {
                    debug!(%id, "dropping completion of a detached upload");
                    return EventOutcome::Ignored;
                }
                let ok = status == HTTP_OK;
                if ok {
                    info!(%id, "image upload finished");
                } else {
                    self.ui.notify_error(&format!(
                        "Can't upload image to the Mass Storage Device: {body}"
                    ));
                }
                self.image_file = None;
                self.upload = None;
                self.progress = UploadProgress::Waiting;
                self.render();
                EventOutcome::UploadFinished { ok }
            }
            MsdEvent::CommandFinished { command, status, body } => {
                let ok = status == HTTP_OK;
                if !ok {
                    let message = match command {
                        MsdCommand::Connect(target) => format!(
                            "Can't switch the Mass Storage Device to {target}: {body}"
                        ),
                        MsdCommand::Reset => format!("Mass Storage Device reset failed: {body}"),
                    };
                    self.ui.notify_error(&message);
                }
                if self.pending == Some(command) {
                    self.pending = None;
                }
                self.render();
                EventOutcome::CommandFinished { command, ok }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::mock::{MockMsdTransport, RecordingMsdUi};
    use kvmd_web_core::{MsdInfo, MsdMode};
    use std::path::PathBuf;

    fn kvm_status(size: u64) -> MsdStatus {
        MsdStatus {
            connected_to: Target::Kvm,
            busy: false,
            in_operate: true,
            info: MsdInfo { size, image: None },
        }
    }

    fn image(size: u64) -> ImageFile {
        ImageFile { name: "disk.img".into(), size, path: PathBuf::from("disk.img") }
    }

    fn controller() -> (MassStorageController, Arc<RecordingMsdUi>, Arc<MockMsdTransport>) {
        let ui = Arc::new(RecordingMsdUi::new());
        let transport = Arc::new(MockMsdTransport::new());
        let ctl = MassStorageController::new(ui.clone(), transport.clone());
        (ctl, ui, transport)
    }

    #[test]
    fn test_set_state_renders() {
        // Arrange
        let (mut ctl, ui, _) = controller();

        // Act
        ctl.set_state(Some(kvm_status(1000)));

        // Assert
        let view = ui.last_view().expect("a render must happen");
        assert_eq!(view.mode, MsdMode::Idle);
        assert_eq!(view.storage_size, "1000.00 B");
    }

    #[test]
    fn test_set_state_none_clears_display() {
        let (mut ctl, ui, _) = controller();
        ctl.set_state(Some(kvm_status(1000)));
        ctl.set_state(None);
        let view = ui.last_view().unwrap();
        assert_eq!(view.mode, MsdMode::NoState);
        assert!(view.buttons.all_disabled());
    }

    #[test]
    fn test_oversized_file_is_rejected_with_one_notification() {
        // Arrange
        let (mut ctl, ui, _) = controller();
        ctl.set_state(Some(kvm_status(1024)));

        // Act
        let result = ctl.select_new_image_file(image(1025));

        // Assert
        assert_eq!(result, Err(MsdError::ImageTooBig { size: 1025, max: 1024 }));
        assert!(ctl.selected_image().is_none());
        assert_eq!(
            ui.errors(),
            vec!["New image is too big for your Mass Storage Device. Maximum: 1.00 kB".to_string()]
        );
    }

    #[test]
    fn test_file_exactly_storage_size_is_accepted() {
        let (mut ctl, ui, _) = controller();
        ctl.set_state(Some(kvm_status(1024)));
        assert_eq!(ctl.select_new_image_file(image(1024)), Ok(()));
        assert!(!ui.last_view().unwrap().buttons.upload);
        assert!(ui.errors().is_empty());
    }

    #[test]
    fn test_select_without_status_is_unavailable() {
        let (mut ctl, ui, _) = controller();
        assert_eq!(ctl.select_new_image_file(image(1)), Err(MsdError::Unavailable));
        assert!(ui.errors().is_empty());
    }

    #[test]
    fn test_start_upload_without_file_fails() {
        let (mut ctl, _, transport) = controller();
        ctl.set_state(Some(kvm_status(1024)));
        assert_eq!(ctl.start_upload(), Err(MsdError::NoImageSelected));
        assert!(transport.uploads().is_empty());
    }

    #[test]
    fn test_start_upload_locks_conflicting_controls() {
        // Arrange
        let (mut ctl, ui, transport) = controller();
        ctl.set_state(Some(kvm_status(4096)));
        ctl.select_new_image_file(image(100)).unwrap();

        // Act
        let id = ctl.start_upload().unwrap();

        // Assert
        assert_eq!(transport.uploads(), vec![(id, "disk.img".to_string())]);
        let buttons = ui.last_view().unwrap().buttons;
        assert!(buttons.select_new_image);
        assert!(buttons.upload);
        assert!(!buttons.abort_upload);
        assert!(buttons.reset);
    }

    #[test]
    fn test_second_upload_is_refused() {
        let (mut ctl, _, transport) = controller();
        ctl.set_state(Some(kvm_status(4096)));
        ctl.select_new_image_file(image(100)).unwrap();
        ctl.start_upload().unwrap();
        assert_eq!(ctl.start_upload(), Err(MsdError::UploadInProgress));
        assert_eq!(transport.uploads().len(), 1);
    }

    #[test]
    fn test_progress_updates_label() {
        let (mut ctl, ui, _) = controller();
        ctl.set_state(Some(kvm_status(4096)));
        ctl.select_new_image_file(image(200)).unwrap();
        let id = ctl.start_upload().unwrap();

        let outcome = ctl.handle_event(MsdEvent::UploadProgress { id, loaded: 50, total: Some(200) });

        assert_eq!(outcome, EventOutcome::Progress);
        let progress = ui.last_view().unwrap().progress;
        assert_eq!(progress.label, "25%");
        assert_eq!(progress.percent, 25);
    }

    #[test]
    fn test_progress_without_total_does_not_render() {
        let (mut ctl, ui, _) = controller();
        ctl.set_state(Some(kvm_status(4096)));
        ctl.select_new_image_file(image(200)).unwrap();
        let id = ctl.start_upload().unwrap();
        let renders = ui.render_count();

        ctl.handle_event(MsdEvent::UploadProgress { id, loaded: 50, total: None });

        assert_eq!(ui.render_count(), renders);
    }

    #[test]
    fn test_successful_completion_clears_selection() {
        let (mut ctl, ui, _) = controller();
        ctl.set_state(Some(kvm_status(4096)));
        ctl.select_new_image_file(image(200)).unwrap();
        let id = ctl.start_upload().unwrap();

        let outcome = ctl.handle_event(MsdEvent::UploadFinished { id, status: 200, body: String::new() });

        assert_eq!(outcome, EventOutcome::UploadFinished { ok: true });
        assert!(!ctl.is_uploading());
        assert!(ctl.selected_image().is_none());
        assert!(ui.errors().is_empty());
        let view = ui.last_view().unwrap();
        assert!(view.pending_file.is_none());
        assert_eq!(view.progress.label, "Waiting for upload...");
    }

    #[test]
    fn test_failed_completion_shows_body_and_clears_selection() {
        let (mut ctl, ui, _) = controller();
        ctl.set_state(Some(kvm_status(4096)));
        ctl.select_new_image_file(image(200)).unwrap();
        let id = ctl.start_upload().unwrap();

        let outcome = ctl.handle_event(MsdEvent::UploadFinished {
            id,
            status: 500,
            body: "disk full".into(),
        });

        assert_eq!(outcome, EventOutcome::UploadFinished { ok: false });
        assert_eq!(ui.errors(), vec!["Can't upload image to the Mass Storage Device: disk full"]);
        assert!(ctl.selected_image().is_none());
        assert!(!ctl.is_uploading());
    }

    #[test]
    fn test_abort_cancels_transfer_and_ignores_late_events() {
        // Arrange
        let (mut ctl, ui, transport) = controller();
        ctl.set_state(Some(kvm_status(4096)));
        ctl.select_new_image_file(image(200)).unwrap();
        let id = ctl.start_upload().unwrap();

        // Act
        ctl.abort_upload();
        let renders = ui.render_count();
        let late = ctl.handle_event(MsdEvent::UploadFinished { id, status: 0, body: "aborted".into() });

        // Assert
        assert_eq!(transport.cancelled(), vec![id]);
        assert_eq!(late, EventOutcome::Ignored);
        assert_eq!(ui.render_count(), renders, "stale completion must not render");
        assert!(ui.errors().is_empty());
        let view = ui.last_view().unwrap();
        assert_eq!(view.progress.label, "Aborted");
        assert_eq!(view.progress.percent, 0);
        assert!(view.buttons.abort_upload);
        assert!(ctl.selected_image().is_some(), "the file stays selected for a retry");
    }

    #[test]
    fn test_aborted_label_resets_on_next_push() {
        let (mut ctl, ui, _) = controller();
        ctl.set_state(Some(kvm_status(4096)));
        ctl.select_new_image_file(image(200)).unwrap();
        ctl.start_upload().unwrap();
        ctl.abort_upload();

        ctl.set_state(Some(kvm_status(4096)));

        assert_eq!(ui.last_view().unwrap().progress.label, "Waiting for upload...");
    }

    #[test]
    fn test_aborted_label_resets_on_any_later_render() {
        // Arrange
        let (mut ctl, ui, _) = controller();
        ctl.set_state(Some(kvm_status(4096)));
        ctl.select_new_image_file(image(200)).unwrap();
        ctl.start_upload().unwrap();
        ctl.abort_upload();
        assert_eq!(ui.last_view().unwrap().progress.label, "Aborted");

        // Act
        ctl.reset();
        let after_reset = ui.last_view().unwrap().progress;
        ctl.select_new_image_file(image(300)).unwrap();

        // Assert
        assert_eq!(after_reset.label, "Waiting for upload...");
        let view = ui.last_view().unwrap();
        assert_eq!(view.progress.label, "Waiting for upload...");
        assert_eq!(view.progress.percent, 0);
    }

    #[test]
    fn test_upload_handle_debug_shows_id() {
        let id = UploadId::new();
        let handle = UploadHandle::new(id, || {});
        assert!(format!("{handle:?}").contains(&id.to_string()));
    }

    #[test]
    fn test_switch_target_disables_destination_until_response() {
        // Arrange
        let (mut ctl, ui, transport) = controller();
        let mut status = kvm_status(4096);
        status.connected_to = Target::Server;
        ctl.set_state(Some(status));
        assert!(!ui.last_view().unwrap().buttons.switch_to_kvm);

        // Act
        ctl.switch_target(Target::Kvm);

        // Assert: optimistic disable, request sent
        assert!(ui.last_view().unwrap().buttons.switch_to_kvm);
        assert_eq!(transport.commands(), vec![MsdCommand::Connect(Target::Kvm)]);

        // Response arrives
        let outcome = ctl.handle_event(MsdEvent::CommandFinished {
            command: MsdCommand::Connect(Target::Kvm),
            status: 200,
            body: String::new(),
        });
        assert_eq!(
            outcome,
            EventOutcome::CommandFinished { command: MsdCommand::Connect(Target::Kvm), ok: true }
        );
        assert!(ctl.pending_command().is_none());
        assert!(!ui.last_view().unwrap().buttons.switch_to_kvm);
    }

    #[test]
    fn test_failed_switch_notifies_and_rerenders() {
        let (mut ctl, ui, _) = controller();
        ctl.set_state(Some(kvm_status(4096)));
        ctl.switch_target(Target::Server);
        let renders = ui.render_count();

        ctl.handle_event(MsdEvent::CommandFinished {
            command: MsdCommand::Connect(Target::Server),
            status: 409,
            body: "busy".into(),
        });

        assert_eq!(ui.errors(), vec!["Can't switch the Mass Storage Device to server: busy"]);
        assert_eq!(ui.render_count(), renders + 1);
        assert!(!ui.last_view().unwrap().buttons.switch_to_server);
    }

    #[test]
    fn test_reset_failure_notifies() {
        let (mut ctl, ui, transport) = controller();
        ctl.set_state(Some(kvm_status(4096)));
        ctl.reset();
        assert!(ui.last_view().unwrap().buttons.reset);
        assert_eq!(transport.commands(), vec![MsdCommand::Reset]);

        ctl.handle_event(MsdEvent::CommandFinished {
            command: MsdCommand::Reset,
            status: 500,
            body: "gpio error".into(),
        });

        assert_eq!(ui.errors(), vec!["Mass Storage Device reset failed: gpio error"]);
        assert!(!ui.last_view().unwrap().buttons.reset);
    }
}
