//! Shared helpers: shell scripts standing in for compiled sketches.

#![allow(dead_code)]

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;
use vmcu_core::Sketch;

/// Write an executable shell script and wrap it as a compiled sketch.
pub fn script_sketch(dir: &TempDir, name: &str, body: &str) -> Sketch {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh\n{body}").unwrap();
    drop(file);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    Sketch::from_executable(path)
}

/// A sketch that runs until told to stop.
pub fn sleeper(dir: &TempDir) -> Sketch {
    script_sketch(dir, "sleeper", "sleep 30")
}
