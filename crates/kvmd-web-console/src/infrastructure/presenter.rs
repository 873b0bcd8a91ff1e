//! A UI binding for terminals: views become log lines.
//!
//! Controllers re-render after every input, most of which change nothing
//! visible.  The presenter remembers the last view of each panel and only
//! logs when it differs, so the log reads as a list of state transitions.

use std::sync::Mutex;

use tracing::{error, info};

use kvmd_web_core::MsdView;

use crate::application::{MsdUi, PointerUi, PointerView};

/// Logs MSD and pointer views through `tracing`.
#[derive(Debug, Default)]
pub struct TracingPresenter {
    msd: Mutex<Option<MsdView>>,
    pointer: Mutex<Option<PointerView>>,
}

impl TracingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `view` in `slot`; `true` if it differs from what was there.
    fn changed<T: PartialEq + Clone>(slot: &Mutex<Option<T>>, view: &T) -> bool {
        let mut last = slot.lock().unwrap_or_else(|e| e.into_inner());
        if last.as_ref() == Some(view) {
            return false;
        }
        *last = Some(view.clone());
        true
    }
}

impl MsdUi for TracingPresenter {
    fn render(&self, view: &MsdView) {
        if !Self::changed(&self.msd, view) {
            return;
        }
        info!(
            mode = ?view.mode,
            led = view.led.class_name(),
            status = %view.status_text,
            image = %view.image_name,
            image_size = %view.image_size,
            storage = %view.storage_size,
            progress = %view.progress.label,
            "msd"
        );
        if view.other_user_uploading {
            info!("msd: someone else is uploading an image");
        }
        if view.image_broken {
            info!("msd: the current image is broken");
        }
        if let Some(pending) = &view.pending_file {
            info!(name = %pending.name, size = %pending.size, "msd: image selected");
        }
    }

    fn notify_error(&self, message: &str) {
        error!("{message}");
    }
}

impl PointerUi for TracingPresenter {
    fn render(&self, view: &PointerView) {
        if Self::changed(&self.pointer, view) {
            info!(
                capture = view.capture_active,
                led = view.indicator.led.class_name(),
                "{}",
                view.indicator.title
            );
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
