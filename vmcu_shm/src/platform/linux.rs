//! Linux-specific shared memory operations

use crate::error::{ShmError, ShmResult};
use memmap2::{MmapMut, MmapOptions};
use nix::unistd::getpid;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Create the backing file for a pin table and map it read/write.
///
/// Fails with [`ShmError::AlreadyExists`] if the path is taken; the caller
/// picks collision-free names, so an existing file means a leaked table.
pub fn create_segment_mmap(path: &Path, size: usize) -> ShmResult<MmapMut> {
    let file = OpenOptions::new()
        .create_new(true)
        .read(true)
        .write(true)
        .mode(0o600) // Owner read/write only
        .open(path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                ShmError::AlreadyExists {
                    path: path.display().to_string(),
                }
            } else {
                ShmError::Io { source: e }
            }
        })?;

    // set_len zero-fills, so slots start with all flags cleared.
    file.set_len(size as u64)?;

    let mmap = unsafe { MmapOptions::new().populate().map_mut(&file)? };
    Ok(mmap)
}

/// Attach to an existing pin-table backing file.
pub fn attach_segment_mmap(path: &Path) -> ShmResult<MmapMut> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShmError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                ShmError::Io { source: e }
            }
        })?;

    let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
    Ok(mmap)
}

/// Check if a process is alive using `kill(pid, 0)`.
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Null signal tests for existence without delivering anything.
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::Error::EPERM) => true, // Exists but not ours to signal
        Err(_) => false,
    }
}

/// Get current process ID
pub fn current_pid() -> u32 {
    getpid().as_raw() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        assert!(is_process_alive(current_pid()));
    }

    #[test]
    fn absurd_pid_is_not_alive() {
        // Beyond the default pid_max on Linux.
        assert!(!is_process_alive(0x3FFF_FFFF));
    }

    #[test]
    fn create_refuses_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken");
        std::fs::write(&path, b"occupied").unwrap();

        let result = create_segment_mmap(&path, 4096);
        assert!(matches!(result, Err(ShmError::AlreadyExists { .. })));
    }

    #[test]
    fn attach_missing_path_is_not_found() {
        let result = attach_segment_mmap(Path::new("/nonexistent/vmcu_table"));
        assert!(matches!(result, Err(ShmError::NotFound { .. })));
    }
}
