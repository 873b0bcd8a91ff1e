//! End-to-end MSD controller flows against the recording test doubles.

use std::path::PathBuf;
use std::sync::Arc;

use kvmd_web_console::application::mock::{MockMsdTransport, RecordingMsdUi};
use kvmd_web_console::application::{EventOutcome, MassStorageController, MsdEvent};
use kvmd_web_core::{ImageFile, Led, MsdCommand, MsdInfo, MsdMode, MsdStatus, Target};

fn status(connected_to: Target, busy: bool, in_operate: bool, size: u64) -> MsdStatus {
    MsdStatus {
        connected_to,
        busy,
        in_operate,
        info: MsdInfo { size, image: None },
    }
}

fn setup() -> (MassStorageController, Arc<RecordingMsdUi>, Arc<MockMsdTransport>) {
    let ui = Arc::new(RecordingMsdUi::new());
    let transport = Arc::new(MockMsdTransport::new());
    let ctl = MassStorageController::new(ui.clone(), transport.clone());
    (ctl, ui, transport)
}

fn file(name: &str, size: u64) -> ImageFile {
    ImageFile { name: name.into(), size, path: PathBuf::from(name) }
}

#[test]
fn test_upload_then_switch_to_server() {
    // Arrange
    let (mut ctl, ui, transport) = setup();
    ctl.set_state(Some(status(Target::Kvm, false, true, 4096)));

    // Act: select, upload, progress, finish
    ctl.select_new_image_file(file("boot.iso", 2048)).unwrap();
    let id = ctl.start_upload().unwrap();
    assert_eq!(ui.last_view().unwrap().mode, MsdMode::Uploading);

    ctl.handle_event(MsdEvent::UploadProgress { id, loaded: 1024, total: Some(2048) });
    assert_eq!(ui.last_view().unwrap().progress.label, "50%");

    let outcome = ctl.handle_event(MsdEvent::UploadFinished { id, status: 200, body: String::new() });
    assert_eq!(outcome, EventOutcome::UploadFinished { ok: true });

    // The daemon pushes the new state, then the user attaches the device.
    ctl.set_state(Some(status(Target::Kvm, false, true, 4096)));
    ctl.switch_target(Target::Server);
    assert!(ui.last_view().unwrap().buttons.switch_to_server);

    ctl.handle_event(MsdEvent::CommandFinished {
        command: MsdCommand::Connect(Target::Server),
        status: 200,
        body: String::new(),
    });
    ctl.set_state(Some(status(Target::Server, false, true, 4096)));

    // Assert
    let view = ui.last_view().unwrap();
    assert_eq!(view.led, Led::Green);
    assert_eq!(view.status_text, "Connected to Server");
    assert!(view.buttons.switch_to_server);
    assert!(!view.buttons.switch_to_kvm);
    assert!(view.buttons.upload);
    assert_eq!(transport.uploads().len(), 1);
    assert_eq!(transport.commands(), vec![MsdCommand::Connect(Target::Server)]);
    assert!(ui.errors().is_empty());
}

#[test]
fn test_abort_then_new_upload_ignores_old_events() {
    let (mut ctl, ui, transport) = setup();
    ctl.set_state(Some(status(Target::Kvm, false, true, 4096)));

    ctl.select_new_image_file(file("a.iso", 100)).unwrap();
    let first = ctl.start_upload().unwrap();
    ctl.abort_upload();
    assert_eq!(transport.cancelled(), vec![first]);
    assert_eq!(ui.last_view().unwrap().progress.label, "Aborted");

    let second = ctl.start_upload().unwrap();
    assert_ne!(first, second);

    // A late completion of the aborted transfer changes nothing.
    let outcome = ctl.handle_event(MsdEvent::UploadFinished {
        id: first,
        status: 500,
        body: "cancelled".into(),
    });
    assert_eq!(outcome, EventOutcome::Ignored);
    assert!(ctl.is_uploading());
    assert!(ui.errors().is_empty());

    ctl.handle_event(MsdEvent::UploadFinished { id: second, status: 200, body: String::new() });
    assert!(!ctl.is_uploading());
    assert!(ctl.selected_image().is_none());
}

#[test]
fn test_failed_reset_reports_body() {
    let (mut ctl, ui, _) = setup();
    ctl.set_state(Some(status(Target::Kvm, false, true, 4096)));

    ctl.reset();
    assert!(ui.last_view().unwrap().buttons.reset);
    ctl.handle_event(MsdEvent::CommandFinished {
        command: MsdCommand::Reset,
        status: 0,
        body: "connection refused".into(),
    });

    assert_eq!(ui.errors(), vec!["Mass Storage Device reset failed: connection refused"]);
    assert!(!ui.last_view().unwrap().buttons.reset);
}

#[test]
fn test_link_loss_disables_everything() {
    let (mut ctl, ui, _) = setup();
    ctl.set_state(Some(status(Target::Kvm, false, true, 4096)));
    ctl.set_state(None);

    let view = ui.last_view().unwrap();
    assert_eq!(view.mode, MsdMode::NoState);
    assert!(view.buttons.all_disabled());
    assert_eq!(view.status_text, "");
}
