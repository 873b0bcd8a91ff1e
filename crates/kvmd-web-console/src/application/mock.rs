//! Recording test doubles for the application-layer traits.
//!
//! These let tests (unit and integration) drive the controllers without a
//! browser, a daemon or an async runtime, then inspect what was rendered,
//! notified or sent.

use std::sync::{Arc, Mutex};

use kvmd_web_core::{HidEvent, ImageFile, MsdCommand, MsdView};

use super::msd_controller::{MsdTransport, MsdUi, UploadHandle, UploadId};
use super::pointer_controller::{ChannelError, InputChannel, PointerUi, PointerView};

/// Records every MSD render and error notification.
#[derive(Default)]
pub struct RecordingMsdUi {
    views: Mutex<Vec<MsdView>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingMsdUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_view(&self) -> Option<MsdView> {
        self.views.lock().expect("lock poisoned").last().cloned()
    }

    pub fn render_count(&self) -> usize {
        self.views.lock().expect("lock poisoned").len()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("lock poisoned").clone()
    }
}

impl MsdUi for RecordingMsdUi {
    fn render(&self, view: &MsdView) {
        self.views.lock().expect("lock poisoned").push(view.clone());
    }

    fn notify_error(&self, message: &str) {
        self.errors.lock().expect("lock poisoned").push(message.to_string());
    }
}

/// Records started uploads, sent commands and cancellations.
#[derive(Default)]
pub struct MockMsdTransport {
    uploads: Mutex<Vec<(UploadId, String)>>,
    commands: Mutex<Vec<MsdCommand>>,
    cancelled: Arc<Mutex<Vec<UploadId>>>,
}

impl MockMsdTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(id, image name)` of every upload started.
    pub fn uploads(&self) -> Vec<(UploadId, String)> {
        self.uploads.lock().expect("lock poisoned").clone()
    }

    pub fn commands(&self) -> Vec<MsdCommand> {
        self.commands.lock().expect("lock poisoned").clone()
    }

    /// Ids whose handles were cancelled, in order.
    pub fn cancelled(&self) -> Vec<UploadId> {
        self.cancelled.lock().expect("lock poisoned").clone()
    }
}

impl MsdTransport for MockMsdTransport {
    fn start_upload(&self, id: UploadId, file: &ImageFile) -> UploadHandle {
        self.uploads.lock().expect("lock poisoned").push((id, file.name.clone()));
        let cancelled = Arc::clone(&self.cancelled);
        UploadHandle::new(id, move || cancelled.lock().expect("lock poisoned").push(id))
    }

    fn send_command(&self, command: MsdCommand) {
        self.commands.lock().expect("lock poisoned").push(command);
    }
}

/// Records every pointer render.
#[derive(Default)]
pub struct RecordingPointerUi {
    views: Mutex<Vec<PointerView>>,
}

impl RecordingPointerUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_view(&self) -> Option<PointerView> {
        self.views.lock().expect("lock poisoned").last().copied()
    }

    pub fn render_count(&self) -> usize {
        self.views.lock().expect("lock poisoned").len()
    }
}

impl PointerUi for RecordingPointerUi {
    fn render(&self, view: &PointerView) {
        self.views.lock().expect("lock poisoned").push(*view);
    }
}

/// A control channel that keeps everything sent on it.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<HidEvent>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<HidEvent> {
        self.sent.lock().expect("lock poisoned").clone()
    }

    /// Only the `mouse_move` events, in order.
    pub fn moves(&self) -> Vec<HidEvent> {
        self.sent()
            .into_iter()
            .filter(|e| matches!(e, HidEvent::MouseMove { .. }))
            .collect()
    }
}

impl InputChannel for RecordingChannel {
    fn send(&self, event: &HidEvent) -> Result<(), ChannelError> {
        self.sent.lock().expect("lock poisoned").push(*event);
        Ok(())
    }
}
