//! Board state machine contracts: guarded transitions, view validity,
//! and the end-to-end configure/start/suspend/resume/stop/reset flow.

mod common;

use common::{script_sketch, sleeper};
use tempfile::TempDir;
use vmcu_common::gpio::BoardConfig;
use vmcu_core::{Board, Sketch, SketchConfig, Status};

fn config_with_pins(pins: &[u16]) -> BoardConfig {
    BoardConfig {
        pins: pins.iter().copied().collect(),
        gpio_drivers: Default::default(),
    }
}

#[test]
fn full_lifecycle_flow() {
    let dir = TempDir::new().unwrap();
    let sketch = sleeper(&dir);

    let mut board = Board::new();
    assert_eq!(board.status(), Status::Clean);
    assert!(!board.view().valid());

    assert!(board.configure(BoardConfig::default()));
    assert_eq!(board.status(), Status::Configured);
    assert!(!board.view().valid());

    assert!(board.attach_sketch(&sketch));
    assert!(!board.view().valid());

    assert!(board.start());
    assert_eq!(board.status(), Status::Running);
    assert!(board.view().valid());

    assert!(board.suspend());
    assert_eq!(board.status(), Status::Suspended);
    // Cannot suspend twice.
    assert!(!board.suspend());
    // Cannot rebind a sketch under a live process.
    assert!(!board.attach_sketch(&sketch));
    // Cannot reset while suspended.
    assert!(!board.reset());
    assert!(board.view().valid());

    assert!(board.resume());
    assert_eq!(board.status(), Status::Running);
    assert!(!board.attach_sketch(&sketch));
    assert!(board.view().valid());

    assert!(board.stop());
    assert_eq!(board.status(), Status::Stopped);
    assert!(!board.view().valid());

    assert!(board.reset());
    assert_eq!(board.status(), Status::Clean);
    assert!(!board.view().valid());
}

#[test]
fn start_preconditions() {
    let dir = TempDir::new().unwrap();
    let mut board = Board::new();

    // Unconfigured board cannot start.
    assert!(!board.start());

    assert!(board.configure(BoardConfig::default()));
    // Configured but no sketch attached.
    assert!(!board.start());
    assert_eq!(board.status(), Status::Configured);

    // Uncompiled sketch cannot be attached, so start keeps failing.
    let uncompiled = Sketch::new(
        dir.path().join("blink"),
        SketchConfig {
            fqbn: "arduino:avr:nano".into(),
        },
    );
    assert!(!board.attach_sketch(&uncompiled));
    assert!(!board.start());

    // A compiled one unlocks start.
    let compiled = sleeper(&dir);
    assert!(board.attach_sketch(&compiled));
    assert!(board.start());
    assert_eq!(board.status(), Status::Running);

    // Already running.
    assert!(!board.start());

    assert!(board.terminate());
}

#[test]
fn guarded_operations_leave_status_unchanged() {
    let dir = TempDir::new().unwrap();
    let sketch = sleeper(&dir);

    // Clean: only configure is permitted (and reset, which is identity).
    let mut board = Board::new();
    assert!(!board.attach_sketch(&sketch));
    assert!(!board.start());
    assert!(!board.suspend());
    assert!(!board.resume());
    assert!(!board.stop());
    assert!(!board.terminate());
    assert_eq!(board.status(), Status::Clean);
    assert!(board.reset());
    assert_eq!(board.status(), Status::Clean);

    // Configured: no process operations, no reconfigure, no reset.
    assert!(board.configure(BoardConfig::default()));
    assert!(!board.configure(BoardConfig::default()));
    assert!(!board.suspend());
    assert!(!board.resume());
    assert!(!board.stop());
    assert!(!board.terminate());
    assert!(!board.reset());
    assert_eq!(board.status(), Status::Configured);

    // Running: no configure/attach/start/resume/reset.
    assert!(board.attach_sketch(&sketch));
    assert!(board.start());
    assert!(!board.configure(BoardConfig::default()));
    assert!(!board.attach_sketch(&sketch));
    assert!(!board.start());
    assert!(!board.resume());
    assert!(!board.reset());
    assert_eq!(board.status(), Status::Running);

    // Suspended: stop requires running; terminate is the forced path.
    assert!(board.suspend());
    assert!(!board.stop());
    assert!(!board.start());
    assert!(!board.configure(BoardConfig::default()));
    assert_eq!(board.status(), Status::Suspended);

    // Stopped: only configure/reset.
    assert!(board.terminate());
    assert!(!board.attach_sketch(&sketch));
    assert!(!board.start());
    assert!(!board.suspend());
    assert!(!board.resume());
    assert!(!board.stop());
    assert!(!board.terminate());
    assert_eq!(board.status(), Status::Stopped);
}

#[test]
fn terminate_works_from_suspended() {
    let dir = TempDir::new().unwrap();
    let mut board = Board::new();
    assert!(board.configure(BoardConfig::default()));
    assert!(board.attach_sketch(&sleeper(&dir)));
    assert!(board.start());
    assert!(board.suspend());

    assert!(board.terminate());
    assert_eq!(board.status(), Status::Stopped);
    assert!(!board.view().valid());

    // A second immediate terminate has no live process to kill.
    assert!(!board.terminate());
}

#[test]
fn reset_clears_configuration_and_sketch() {
    let dir = TempDir::new().unwrap();
    let sketch = sleeper(&dir);

    let mut board = Board::new();
    assert!(board.configure(BoardConfig::default()));
    assert!(board.attach_sketch(&sketch));
    assert!(board.start());
    assert!(board.terminate());

    assert!(board.reset());
    assert_eq!(board.status(), Status::Clean);

    // The old binding is gone: attach without a fresh configure fails.
    assert!(!board.attach_sketch(&sketch));
    assert!(!board.start());
}

#[test]
fn stopped_board_can_reconfigure_and_restart() {
    let dir = TempDir::new().unwrap();
    let sketch = sleeper(&dir);

    let mut board = Board::new();
    assert!(board.configure(config_with_pins(&[2])));
    assert!(board.attach_sketch(&sketch));
    assert!(board.start());
    assert!(board.stop());

    // Sketch binding survives stop; a new configure + start works.
    assert!(board.configure(config_with_pins(&[2, 3])));
    assert!(board.start());
    assert_eq!(board.status(), Status::Running);
    assert!(board.terminate());
}

#[test]
fn stale_views_invalidate_on_teardown() {
    let dir = TempDir::new().unwrap();
    let mut board = Board::new();

    let early_view = board.view();
    assert!(!early_view.valid());

    assert!(board.configure(config_with_pins(&[4])));
    assert!(board.attach_sketch(&script_sketch(&dir, "s", "sleep 30")));
    assert!(board.start());

    // A handle taken before start tracks status in real time.
    assert!(early_view.valid());
    let pin = early_view.pin(4);

    assert!(board.terminate());
    assert!(!early_view.valid());
    assert!(!pin.exists());
    assert_eq!(pin.digital().read(), None);
    assert_eq!(pin.analog().read(), None);
    assert!(!pin.digital().write(true));
}
