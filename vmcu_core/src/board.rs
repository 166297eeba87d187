//! Board lifecycle state machine.
//!
//! The single entry point used by host code. Every operation is guarded by
//! a flat dispatch over the current status; a failed call returns `false`
//! and leaves the board exactly as it was. Wrong-state calls are expected
//! caller errors, never panics.

use crate::gpio::DriverEngine;
use crate::process::{EXIT_SPAWN_FAILED, SketchProcess};
use crate::sketch::Sketch;
use crate::view::{BoardView, ViewShared};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use vmcu_common::gpio::BoardConfig;
use vmcu_shm::HostPinTable;

/// How long `stop()` waits for a cooperative exit before forcing a kill.
const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(3);

/// Board lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    /// Fresh or reset; nothing configured.
    Clean = 0,
    /// Configuration stored; no process yet.
    Configured = 1,
    /// Sketch process executing.
    Running = 2,
    /// Sketch process paused at the OS level.
    Suspended = 3,
    /// Process torn down; configuration and sketch binding retained.
    Stopped = 4,
}

impl Status {
    pub(crate) const fn as_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Clean,
            1 => Self::Configured,
            2 => Self::Running,
            3 => Self::Suspended,
            _ => Self::Stopped,
        }
    }
}

type ExitNotify = Box<dyn FnMut(i32) + Send>;

/// A virtual microcontroller board.
///
/// Owns at most one live sketch process, one shared pin table, one active
/// configuration, and one bound compiled sketch. Not safe for concurrent
/// driving from multiple host threads; exactly one logical owner must call
/// its transitions and [`tick`](Self::tick).
pub struct Board {
    shared: Arc<ViewShared>,
    config: Option<BoardConfig>,
    sketch: Option<Sketch>,
    process: Option<SketchProcess>,
    engine: Option<DriverEngine>,
    exit_notify: Option<ExitNotify>,
    exit_notified: bool,
    pending_exit: Option<i32>,
    stop_grace: Duration,
}

impl Board {
    /// Board without an exit-notify callback.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(ViewShared::new()),
            config: None,
            sketch: None,
            process: None,
            engine: None,
            exit_notify: None,
            exit_notified: false,
            pending_exit: None,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Board with an exit-notify callback, captured once at construction.
    ///
    /// The callback fires at most once per process lifetime: with the
    /// process's code when [`tick`](Self::tick) (or a synchronous check in
    /// `stop`/`terminate`) detects that it exited on its own, or with
    /// [`EXIT_SPAWN_FAILED`] if spawn itself failed.
    pub fn with_exit_notify<F>(callback: F) -> Self
    where
        F: FnMut(i32) + Send + 'static,
    {
        let mut board = Self::new();
        board.exit_notify = Some(Box::new(callback));
        board
    }

    /// Override the graceful-stop grace period.
    pub fn set_stop_grace(&mut self, grace: Duration) {
        self.stop_grace = grace;
    }

    /// Current lifecycle status.
    pub fn status(&self) -> Status {
        Status::from_u8(self.shared.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: Status) {
        self.shared.status.store(status.as_u8(), Ordering::Release);
    }

    /// Live view over the board's pins. `valid()` tracks status in real
    /// time, for this and every previously obtained handle.
    pub fn view(&self) -> BoardView {
        BoardView::new(Arc::clone(&self.shared))
    }

    /// Store a configuration. `clean|stopped → configured`.
    ///
    /// Rejected while a process is live (the peripheral contract of a
    /// running sketch must not change) and while already `configured`
    /// (reset first to reconfigure).
    pub fn configure(&mut self, config: BoardConfig) -> bool {
        match self.status() {
            Status::Clean | Status::Stopped => {}
            _ => return false,
        }
        if !config.is_well_formed() {
            tracing::warn!("rejecting malformed board configuration");
            return false;
        }
        tracing::debug!(pins = config.pins.len(), drivers = config.gpio_drivers.len(), "board configured");
        self.config = Some(config);
        self.set_status(Status::Configured);
        true
    }

    /// Bind a compiled sketch. Valid only while `configured`.
    pub fn attach_sketch(&mut self, sketch: &Sketch) -> bool {
        if self.status() != Status::Configured {
            return false;
        }
        if !sketch.is_compiled() {
            return false;
        }
        self.sketch = Some(sketch.clone());
        true
    }

    /// Spawn the sketch process. `configured → running`.
    ///
    /// Allocates the shared pin table sized to the configuration, spawns
    /// the process with a handle to it, and initializes the GPIO drivers.
    /// On failure nothing changes; a spawn-level failure additionally
    /// queues an [`EXIT_SPAWN_FAILED`] notification for the next `tick()`.
    pub fn start(&mut self) -> bool {
        if self.status() != Status::Configured {
            return false;
        }
        let Some(config) = self.config.clone() else {
            return false;
        };
        let Some(executable) = self
            .sketch
            .as_ref()
            .filter(|sketch| sketch.is_compiled())
            .and_then(|sketch| sketch.executable())
            .map(Path::to_path_buf)
        else {
            return false;
        };

        let table = match HostPinTable::create(&config.pins) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!(error = %e, "pin table allocation failed");
                return false;
            }
        };

        let process = match SketchProcess::spawn(&executable, table.path()) {
            Ok(process) => process,
            Err(e) => {
                tracing::warn!(error = %e, "sketch spawn failed");
                self.exit_notified = false;
                self.pending_exit = Some(EXIT_SPAWN_FAILED);
                return false;
            }
        };

        let engine = DriverEngine::new(&config, &table);
        *self.shared.table.write() = Some(Arc::new(table));
        tracing::info!(pid = process.pid(), "board started");
        self.process = Some(process);
        self.engine = Some(engine);
        self.exit_notified = false;
        self.pending_exit = None;
        self.set_status(Status::Running);
        true
    }

    /// Pause the sketch process. `running → suspended`.
    pub fn suspend(&mut self) -> bool {
        if self.status() != Status::Running {
            return false;
        }
        let Some(process) = self.process.as_mut() else {
            return false;
        };
        if !process.poll_alive().0 {
            return false;
        }
        if !process.pause() {
            return false;
        }
        tracing::debug!(pid = process.pid(), "board suspended");
        self.set_status(Status::Suspended);
        true
    }

    /// Continue the paused sketch process. `suspended → running`.
    pub fn resume(&mut self) -> bool {
        if self.status() != Status::Suspended {
            return false;
        }
        let Some(process) = self.process.as_mut() else {
            return false;
        };
        if !process.resume() {
            return false;
        }
        tracing::debug!(pid = process.pid(), "board resumed");
        self.set_status(Status::Running);
        true
    }

    /// Graceful stop. `running → stopped`.
    ///
    /// Signals a cooperative exit with a bounded grace period, falling
    /// back to a forced kill, then tears down the pin table; views become
    /// invalid. `terminate()` is the forced path from `suspended`.
    pub fn stop(&mut self) -> bool {
        if self.status() != Status::Running {
            return false;
        }
        let Some(mut process) = self.process.take() else {
            return false;
        };

        // Sketch may have exited on its own already; that exit is the
        // notifiable one, not the stop we are about to force.
        if let (false, Some(code)) = process.poll_alive() {
            self.deliver_exit(code);
        }

        let code = process.graceful_stop(self.stop_grace);
        tracing::info!(code, "board stopped");
        self.teardown();
        true
    }

    /// Unconditional forced kill. `running|suspended → stopped`.
    pub fn terminate(&mut self) -> bool {
        match self.status() {
            Status::Running | Status::Suspended => {}
            _ => return false,
        }
        let Some(mut process) = self.process.take() else {
            return false;
        };

        if let (false, Some(code)) = process.poll_alive() {
            self.deliver_exit(code);
        }

        let code = process.kill();
        tracing::info!(code, "board terminated");
        self.teardown();
        true
    }

    /// Clear configuration and sketch binding. `clean|stopped → clean`.
    pub fn reset(&mut self) -> bool {
        match self.status() {
            Status::Clean | Status::Stopped => {}
            _ => return false,
        }
        self.config = None;
        self.sketch = None;
        self.pending_exit = None;
        self.set_status(Status::Clean);
        true
    }

    /// Advance the emulation by one host step.
    ///
    /// Callable in any state; effective only while a process exists:
    /// polls liveness, fires the exit-notify callback at most once when
    /// the process is found dead, and steps the driver engine.
    pub fn tick(&mut self) {
        if let Some(code) = self.pending_exit.take() {
            self.deliver_exit(code);
        }

        let Some(process) = self.process.as_mut() else {
            return;
        };
        if let (false, Some(code)) = process.poll_alive() {
            self.deliver_exit(code);
        }

        let guard = self.shared.table.read();
        if let (Some(engine), Some(table)) = (self.engine.as_mut(), guard.as_ref()) {
            engine.step(table);
        }
    }

    fn deliver_exit(&mut self, code: i32) {
        if self.exit_notified {
            return;
        }
        self.exit_notified = true;
        tracing::debug!(code, "sketch exit notification");
        if let Some(callback) = self.exit_notify.as_mut() {
            callback(code);
        }
    }

    /// Drop the process handle, driver engine, and pin table mapping.
    /// Outstanding views observe the invalidation immediately.
    fn teardown(&mut self) {
        self.process = None;
        self.engine = None;
        *self.shared.table.write() = None;
        self.set_status(Status::Stopped);
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_board_is_clean_with_invalid_view() {
        let board = Board::new();
        assert_eq!(board.status(), Status::Clean);
        assert!(!board.view().valid());
    }

    #[test]
    fn status_roundtrips_through_u8() {
        for status in [
            Status::Clean,
            Status::Configured,
            Status::Running,
            Status::Suspended,
            Status::Stopped,
        ] {
            assert_eq!(Status::from_u8(status.as_u8()), status);
        }
    }

    #[test]
    fn configure_rejects_malformed_config() {
        let mut board = Board::new();
        let mut config = BoardConfig::default();
        config
            .gpio_drivers
            .insert(9, vmcu_common::gpio::DriverSpec::PassThrough);

        assert!(!board.configure(config));
        assert_eq!(board.status(), Status::Clean);
    }

    #[test]
    fn attach_requires_configured_and_compiled() {
        let mut board = Board::new();
        let compiled = Sketch::from_executable("/bin/true");

        // Not configured yet.
        assert!(!board.attach_sketch(&compiled));

        assert!(board.configure(BoardConfig::default()));
        let uncompiled = Sketch::new(
            "sketches/blink",
            crate::sketch::SketchConfig {
                fqbn: "arduino:avr:nano".into(),
            },
        );
        assert!(!board.attach_sketch(&uncompiled));
        assert!(board.attach_sketch(&compiled));
    }
}
