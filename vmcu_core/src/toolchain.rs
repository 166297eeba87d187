//! Sketch compilation toolchain.
//!
//! Wraps the external CMake-based build that turns sketch source into a
//! runnable executable against an Arduino-style core/library resource
//! directory. Consumed by the board only through its result contracts:
//! the error taxonomy below and the compiled flag it sets on the sketch.

use crate::sketch::Sketch;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

/// Environment variable overriding the CMake executable used for builds.
pub const CMAKE_ENV: &str = "VMCU_CMAKE";

/// Name of the executable a successful sketch build produces.
const SKETCH_BIN: &str = "sketch_bin";

static BUILD_SEQ: AtomicU32 = AtomicU32::new(0);

/// Compilation failure taxonomy.
///
/// Environment-level (`Resdir*`), sketch-level (`SketchInvalid`), and
/// build-level (`ConfigureFailed`/`CompileFailed`) causes are kept
/// distinguishable so callers can report actionable diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ToolchainError {
    /// Resource directory does not exist.
    #[error("resource directory is absent")]
    ResdirAbsent,

    /// Resource directory exists but contains nothing.
    #[error("resource directory is empty")]
    ResdirEmpty,

    /// Resource directory path points at a file.
    #[error("resource directory is not a directory")]
    ResdirFile,

    /// Sketch source path or configuration is unusable.
    #[error("sketch source or configuration is invalid")]
    SketchInvalid,

    /// Build-system configure step failed.
    #[error("build configure step failed")]
    ConfigureFailed,

    /// Compile step failed or produced no executable.
    #[error("compile step failed")]
    CompileFailed,
}

/// Handle to the sketch build environment rooted at a resource directory.
pub struct Toolchain {
    resource_dir: PathBuf,
    cmake_path: PathBuf,
    build_stdout: String,
    build_stderr: String,
}

impl Toolchain {
    /// Toolchain over `resource_dir`. The CMake executable is taken from
    /// `VMCU_CMAKE` or found on `PATH`.
    pub fn new(resource_dir: impl Into<PathBuf>) -> Self {
        let cmake_path = std::env::var_os(CMAKE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("cmake"));
        Self {
            resource_dir: resource_dir.into(),
            cmake_path,
            build_stdout: String::new(),
            build_stderr: String::new(),
        }
    }

    /// Resource directory this toolchain compiles against.
    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    /// CMake executable used for builds.
    pub fn cmake_path(&self) -> &Path {
        &self.cmake_path
    }

    /// Captured (stdout, stderr) of the most recent compile.
    pub fn build_log(&self) -> (&str, &str) {
        (&self.build_stdout, &self.build_stderr)
    }

    /// Probe the resource directory. `None` means the environment is
    /// usable.
    pub fn check_suitable_environment(&self) -> Option<ToolchainError> {
        if self.resource_dir.as_os_str().is_empty() || !self.resource_dir.exists() {
            return Some(ToolchainError::ResdirAbsent);
        }
        if !self.resource_dir.is_dir() {
            return Some(ToolchainError::ResdirFile);
        }
        match std::fs::read_dir(&self.resource_dir) {
            Ok(mut entries) => {
                if entries.next().is_none() {
                    return Some(ToolchainError::ResdirEmpty);
                }
            }
            Err(_) => return Some(ToolchainError::ResdirAbsent),
        }
        None
    }

    /// Compile `sketch`, recording the produced executable on it.
    ///
    /// `None` means success. Validation order: sketch first, then the
    /// configure step, then the build step; the environment probe is the
    /// caller's concern (a broken resdir surfaces as `ConfigureFailed`).
    pub fn compile(&mut self, sketch: &mut Sketch) -> Option<ToolchainError> {
        self.build_stdout.clear();
        self.build_stderr.clear();

        if sketch.source().as_os_str().is_empty() || !sketch.source().exists() {
            return Some(ToolchainError::SketchInvalid);
        }
        if sketch.fqbn().is_empty() {
            return Some(ToolchainError::SketchInvalid);
        }

        let build_dir = std::env::temp_dir().join(format!(
            "vmcu_build_{}_{}",
            std::process::id(),
            BUILD_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        if std::fs::create_dir_all(&build_dir).is_err() {
            return Some(ToolchainError::ConfigureFailed);
        }

        // The executable lands inside the build dir, so it is kept on
        // success and removed on any failure.
        let result = self.run_build(sketch, &build_dir);
        if result.is_some() {
            let _ = std::fs::remove_dir_all(&build_dir);
        }
        result
    }

    fn run_build(&mut self, sketch: &mut Sketch, build_dir: &Path) -> Option<ToolchainError> {
        tracing::info!(sketch = %sketch.source().display(), fqbn = sketch.fqbn(), "configuring sketch build");
        let configure = Command::new(&self.cmake_path)
            .arg("-S")
            .arg(&self.resource_dir)
            .arg("-B")
            .arg(&build_dir)
            .arg(format!("-DVMCU_SKETCH={}", sketch.source().display()))
            .arg(format!("-DVMCU_FQBN={}", sketch.fqbn()))
            .output();
        match configure {
            Ok(output) => {
                self.append_log(&output.stdout, &output.stderr);
                if !output.status.success() {
                    return Some(ToolchainError::ConfigureFailed);
                }
            }
            Err(e) => {
                tracing::warn!(cmake = %self.cmake_path.display(), error = %e, "could not run cmake");
                return Some(ToolchainError::ConfigureFailed);
            }
        }

        tracing::info!(sketch = %sketch.source().display(), "compiling sketch");
        let build = Command::new(&self.cmake_path)
            .arg("--build")
            .arg(&build_dir)
            .output();
        match build {
            Ok(output) => {
                self.append_log(&output.stdout, &output.stderr);
                if !output.status.success() {
                    return Some(ToolchainError::CompileFailed);
                }
            }
            Err(_) => return Some(ToolchainError::CompileFailed),
        }

        let executable = build_dir.join(SKETCH_BIN);
        if !executable.is_file() {
            return Some(ToolchainError::CompileFailed);
        }

        sketch.set_executable(executable);
        None
    }

    fn append_log(&mut self, stdout: &[u8], stderr: &[u8]) {
        self.build_stdout
            .push_str(&String::from_utf8_lossy(stdout));
        self.build_stderr
            .push_str(&String::from_utf8_lossy(stderr));
    }
}
