//! Sketch descriptor: source path, board-identifier configuration,
//! compiled state.

use std::path::{Path, PathBuf};

/// Compilation configuration carried by a sketch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SketchConfig {
    /// Fully-qualified board name, e.g. `arduino:avr:nano`.
    pub fqbn: String,
}

/// A human-authored sketch and, once compiled, its executable.
///
/// The [`Toolchain`](crate::Toolchain) records the produced executable on
/// the sketch; [`Board::attach_sketch`](crate::Board::attach_sketch) only
/// accepts sketches for which [`is_compiled`](Self::is_compiled) holds.
#[derive(Debug, Clone)]
pub struct Sketch {
    source: PathBuf,
    config: SketchConfig,
    executable: Option<PathBuf>,
}

impl Sketch {
    /// Describe an uncompiled sketch.
    pub fn new(source: impl Into<PathBuf>, config: SketchConfig) -> Self {
        Self {
            source: source.into(),
            config,
            executable: None,
        }
    }

    /// Wrap an executable built outside the toolchain as a compiled sketch.
    pub fn from_executable(executable: impl Into<PathBuf>) -> Self {
        let executable = executable.into();
        Self {
            source: executable.clone(),
            config: SketchConfig {
                fqbn: "native".to_string(),
            },
            executable: Some(executable),
        }
    }

    /// Sketch source path.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Board identifier the sketch targets.
    pub fn fqbn(&self) -> &str {
        &self.config.fqbn
    }

    /// Whether a compile has produced an executable for this sketch.
    pub fn is_compiled(&self) -> bool {
        self.executable.is_some()
    }

    /// Compiled executable path, if any.
    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    pub(crate) fn set_executable(&mut self, executable: PathBuf) {
        self.executable = Some(executable);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sketch_is_uncompiled() {
        let sk = Sketch::new(
            "sketches/blink",
            SketchConfig {
                fqbn: "arduino:avr:nano".into(),
            },
        );
        assert!(!sk.is_compiled());
        assert!(sk.executable().is_none());
        assert_eq!(sk.fqbn(), "arduino:avr:nano");
    }

    #[test]
    fn from_executable_is_compiled() {
        let sk = Sketch::from_executable("/tmp/sketch_bin");
        assert!(sk.is_compiled());
        assert_eq!(sk.executable().unwrap(), Path::new("/tmp/sketch_bin"));
    }
}
