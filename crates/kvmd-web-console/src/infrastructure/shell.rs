//! The console event loop.
//!
//! [`ConsoleShell`] owns both controllers and is the only place they are
//! touched, so controller state needs no locking.  Everything else feeds
//! into it as events:
//!
//! ```text
//!  kvmd/ws frames ──► DaemonEvent ──┐
//!  transport tasks ─► MsdEvent ─────┼──► ConsoleShell ──► MsdUi / PointerUi
//!  interval timer ──► tick ─────────┘          │
//!                                              └──► WsChannel (HID events)
//! ```

use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::MissedTickBehavior;
use tracing::{info, trace, warn};

use kvmd_web_core::{DaemonEvent, ImageFile, MsdCommand, MsdStatus, Target};

use crate::application::{
    EventOutcome, MassStorageController, MsdError, MsdEvent, MsdUi, PointerController, PointerUi,
};
use crate::domain::ConsoleConfig;
use crate::infrastructure::daemon_http::{DaemonClient, DaemonError, HttpMsdTransport};
use crate::infrastructure::ws_channel::{connect_control_channel, ControlLink};

/// Why a console command did not complete.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Daemon(#[from] DaemonError),

    #[error(transparent)]
    Msd(#[from] MsdError),

    #[error("{0} is not available in the current MSD state")]
    Disabled(&'static str),

    #[error("{what} failed with status {status}: {body}")]
    Rejected { what: &'static str, status: u16, body: String },

    #[error("upload aborted")]
    Aborted,

    #[error("transport stopped before reporting a result")]
    Disconnected,
}

/// Builds an [`ImageFile`] for `path`, named `name` or the file name.
pub fn image_file_from_path(path: &Path, name: Option<String>) -> Result<ImageFile, DaemonError> {
    let metadata = std::fs::metadata(path).map_err(|source| DaemonError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    });
    Ok(ImageFile { name, size: metadata.len(), path: path.to_path_buf() })
}

/// Owns the controllers and drives them from the daemon.
pub struct ConsoleShell {
    config: ConsoleConfig,
    client: Arc<DaemonClient>,
    msd: MassStorageController,
    pointer: PointerController,
    msd_events: UnboundedReceiver<MsdEvent>,
}

impl ConsoleShell {
    /// # Errors
    ///
    /// Propagates [`DaemonClient::new`] failures (bad URL or credentials).
    pub fn new(
        config: ConsoleConfig,
        msd_ui: Arc<dyn MsdUi>,
        pointer_ui: Arc<dyn PointerUi>,
    ) -> Result<Self, DaemonError> {
        let client = Arc::new(DaemonClient::new(&config)?);
        let (events_tx, msd_events) = mpsc::unbounded_channel();
        let transport = Arc::new(HttpMsdTransport::new(Arc::clone(&client), events_tx));
        let msd = MassStorageController::new(msd_ui, transport);
        let pointer = PointerController::new(pointer_ui, config.touch_capture);
        Ok(Self { config, client, msd, pointer, msd_events })
    }

    pub fn msd(&self) -> &MassStorageController {
        &self.msd
    }

    pub fn pointer(&self) -> &PointerController {
        &self.pointer
    }

    pub fn pointer_mut(&mut self) -> &mut PointerController {
        &mut self.pointer
    }

    /// Seeds the MSD controller from `GET kvmd/msd`.
    pub async fn refresh_msd(&mut self) -> Result<&MsdStatus, ShellError> {
        let status = self.client.msd_status().await?;
        self.msd.set_state(Some(status));
        self.msd.status().ok_or(ShellError::Disconnected)
    }

    /// Follows the control channel until it closes or `running` is cleared.
    ///
    /// `msd_state` and `hid_state` events are fed to the controllers, MSD
    /// transport results are applied as they arrive, and the pointer timer
    /// runs at `move_interval`.  On exit both controllers are told the link
    /// is gone.
    pub async fn watch(&mut self, running: Arc<AtomicBool>) -> Result<(), ShellError> {
        let url = self.client.ws_url()?;
        let ControlLink { channel, mut events } =
            connect_control_channel(&url, self.client.credentials()).await?;

        let Self { config, msd, pointer, msd_events, .. } = self;
        pointer.set_socket(Some(channel));

        let mut ticker = tokio::time::interval(config.move_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(DaemonEvent::MsdState(status)) => msd.set_state(Some(status)),
                    Some(DaemonEvent::HidState(state)) => pointer.set_state(state),
                    Some(DaemonEvent::Other(name)) => trace!(%name, "ignoring daemon event"),
                    None => {
                        info!("control channel closed");
                        break;
                    }
                },
                Some(event) = msd_events.recv() => {
                    msd.handle_event(event);
                }
                _ = ticker.tick() => {
                    if !running.load(Ordering::Relaxed) {
                        info!("shutdown flag set; leaving watch loop");
                        break;
                    }
                    pointer.tick();
                }
            }
        }

        pointer.set_socket(None);
        msd.set_state(None);
        Ok(())
    }

    /// Uploads `file` and waits for the daemon's answer.
    ///
    /// Ctrl+C while waiting aborts the transfer.
    pub async fn upload(&mut self, file: ImageFile) -> Result<(), ShellError> {
        self.refresh_msd().await?;
        if self.msd.view().buttons.select_new_image {
            return Err(ShellError::Disabled("image upload"));
        }
        self.msd.select_new_image_file(file)?;
        self.msd.start_upload()?;

        let Self { msd, msd_events, .. } = self;
        let interrupted = tokio::signal::ctrl_c();
        tokio::pin!(interrupted);

        loop {
            tokio::select! {
                event = msd_events.recv() => {
                    let event = event.ok_or(ShellError::Disconnected)?;
                    let rejected = match &event {
                        MsdEvent::UploadFinished { status, body, .. } => Some((*status, body.clone())),
                        _ => None,
                    };
                    if let EventOutcome::UploadFinished { ok } = msd.handle_event(event) {
                        return match (ok, rejected) {
                            (false, Some((status, body))) => {
                                Err(ShellError::Rejected { what: "upload", status, body })
                            }
                            _ => Ok(()),
                        };
                    }
                }
                _ = &mut interrupted => {
                    warn!("interrupted; aborting upload");
                    msd.abort_upload();
                    return Err(ShellError::Aborted);
                }
            }
        }
    }

    /// Issues a connect or reset and waits for the daemon's answer.
    pub async fn command(&mut self, command: MsdCommand) -> Result<(), ShellError> {
        self.refresh_msd().await?;
        let buttons = self.msd.view().buttons;
        let (disabled, what) = match command {
            MsdCommand::Connect(Target::Kvm) => (buttons.switch_to_kvm, "switch to KVM"),
            MsdCommand::Connect(Target::Server) => (buttons.switch_to_server, "switch to Server"),
            MsdCommand::Reset => (buttons.reset, "reset"),
        };
        if disabled {
            return Err(ShellError::Disabled(what));
        }

        match command {
            MsdCommand::Connect(target) => self.msd.switch_target(target),
            MsdCommand::Reset => self.msd.reset(),
        }

        while let Some(event) = self.msd_events.recv().await {
            let rejected = match &event {
                MsdEvent::CommandFinished { status, body, .. } => Some((*status, body.clone())),
                _ => None,
            };
            if let EventOutcome::CommandFinished { command: done, ok } = self.msd.handle_event(event) {
                if done != command {
                    continue;
                }
                return match (ok, rejected) {
                    (false, Some((status, body))) => Err(ShellError::Rejected { what, status, body }),
                    _ => Ok(()),
                };
            }
        }
        Err(ShellError::Disconnected)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
