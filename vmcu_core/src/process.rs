//! Sketch process supervisor: spawn, pause/resume, kill, graceful stop.

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use vmcu_shm::SHM_PATH_ENV;

/// Exit code reported through the exit-notify path when the process could
/// not be created at all. Shell convention for "command not found".
pub const EXIT_SPAWN_FAILED: i32 = 127;

/// Interval between liveness polls while waiting out a graceful stop.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors from spawning a sketch process.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// Executable missing or not a regular file.
    #[error("sketch executable not runnable: {path}")]
    NotRunnable {
        /// Offending path
        path: PathBuf,
    },

    /// OS-level process creation failed.
    #[error("process creation failed: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },
}

/// Handle to the running sketch process.
///
/// Owns exactly one child for its lifetime; once the child is reaped the
/// exit code is cached so every later query reports the same status.
pub struct SketchProcess {
    child: Child,
    exit_code: Option<i32>,
    paused: bool,
}

impl SketchProcess {
    /// Spawn the compiled sketch, publishing the pin-table path to it
    /// through the `VMCU_SHM_PATH` environment variable.
    pub fn spawn(executable: &Path, shm_path: &Path) -> Result<Self, SpawnError> {
        if !executable.is_file() {
            return Err(SpawnError::NotRunnable {
                path: executable.to_path_buf(),
            });
        }

        let child = Command::new(executable)
            .env(SHM_PATH_ENV, shm_path)
            .stdin(Stdio::null())
            .spawn()?;

        tracing::debug!(pid = child.id(), exe = %executable.display(), "sketch process spawned");
        Ok(Self {
            child,
            exit_code: None,
            paused: false,
        })
    }

    /// OS process id of the child.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Whether the child is currently SIGSTOPped.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Non-blocking liveness poll. Returns `(alive, exit_code)`; the exit
    /// code is present exactly when the child is known to have exited.
    pub fn poll_alive(&mut self) -> (bool, Option<i32>) {
        if let Some(code) = self.exit_code {
            return (false, Some(code));
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                let code = exit_code_of(status);
                self.exit_code = Some(code);
                tracing::debug!(pid = self.child.id(), code, "sketch process exited");
                (false, Some(code))
            }
            Ok(None) => (true, None),
            Err(e) => {
                tracing::warn!(pid = self.child.id(), error = %e, "liveness poll failed");
                (false, None)
            }
        }
    }

    /// OS-level pause (SIGSTOP). Process memory and the shared mapping
    /// stay intact.
    pub fn pause(&mut self) -> bool {
        if self.exit_code.is_some() || self.paused {
            return false;
        }
        match kill(Pid::from_raw(self.child.id() as i32), Signal::SIGSTOP) {
            Ok(()) => {
                self.paused = true;
                true
            }
            Err(e) => {
                tracing::warn!(pid = self.child.id(), error = %e, "SIGSTOP failed");
                false
            }
        }
    }

    /// Continue a paused process (SIGCONT).
    pub fn resume(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        match kill(Pid::from_raw(self.child.id() as i32), Signal::SIGCONT) {
            Ok(()) => {
                self.paused = false;
                true
            }
            Err(e) => {
                tracing::warn!(pid = self.child.id(), error = %e, "SIGCONT failed");
                false
            }
        }
    }

    /// Forceful termination with a synchronous wait. SIGKILL is delivered
    /// even to a stopped process, so this works regardless of pause state.
    pub fn kill(&mut self) -> i32 {
        if let Some(code) = self.exit_code {
            return code;
        }
        let _ = self.child.kill();
        let code = match self.child.wait() {
            Ok(status) => exit_code_of(status),
            Err(e) => {
                tracing::warn!(pid = self.child.id(), error = %e, "wait after kill failed");
                EXIT_SPAWN_FAILED
            }
        };
        self.exit_code = Some(code);
        self.paused = false;
        code
    }

    /// Cooperative exit request (SIGTERM) with a bounded grace period,
    /// falling back to [`kill`](Self::kill). Never hangs indefinitely.
    pub fn graceful_stop(&mut self, grace: Duration) -> i32 {
        if let Some(code) = self.exit_code {
            return code;
        }
        let pid = Pid::from_raw(self.child.id() as i32);
        if let Err(e) = kill(pid, Signal::SIGTERM) {
            tracing::warn!(pid = self.child.id(), error = %e, "SIGTERM failed");
            return self.kill();
        }

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if let (false, Some(code)) = self.poll_alive() {
                return code;
            }
            std::thread::sleep(STOP_POLL_INTERVAL);
        }

        tracing::warn!(pid = self.child.id(), "grace period expired, forcing kill");
        self.kill()
    }
}

impl Drop for SketchProcess {
    fn drop(&mut self) {
        if self.exit_code.is_none() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Zero for a clean exit, the raw code otherwise; signal termination maps
/// to `128 + signo`.
fn exit_code_of(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}
