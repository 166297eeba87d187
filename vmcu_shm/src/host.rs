//! Host-side pin table with exclusive creation ownership

use crate::error::{ShmError, ShmResult};
use crate::platform::{create_segment_mmap, current_pid};
use memmap2::MmapMut;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering, fence};
use std::time::{SystemTime, UNIX_EPOCH};
use vmcu_common::table::{PinSlot, TableHeader, table_len};

/// Monotonic suffix so one host process can own several tables.
static TABLE_SEQ: AtomicU32 = AtomicU32::new(0);

/// JSON sidecar describing a live table, for external inspection.
#[derive(Debug, Serialize)]
struct TableInfo {
    path: String,
    slot_count: u32,
    host_pid: u32,
    created_at_secs: u64,
}

/// Host-side view of the shared pin table.
///
/// Created at board start with one slot per configured pin, ordered by pin
/// number. The backing file lives under `/dev/shm` and is removed when this
/// handle is dropped.
pub struct HostPinTable {
    path: PathBuf,
    mmap: MmapMut,
    pins: Vec<u16>,
}

impl HostPinTable {
    /// Allocate a fresh table sized to `pins`.
    pub fn create(pins: &BTreeSet<u16>) -> ShmResult<Self> {
        let seq = TABLE_SEQ.fetch_add(1, Ordering::Relaxed);
        let host_pid = current_pid();
        let path = PathBuf::from(format!("/dev/shm/vmcu_pins_{}_{}", host_pid, seq));

        let pins: Vec<u16> = pins.iter().copied().collect();
        let total = table_len(pins.len());
        let mut mmap = create_segment_mmap(&path, total)?;

        {
            let header = unsafe { &mut *(mmap.as_mut_ptr() as *mut TableHeader) };
            *header = TableHeader::new(pins.len() as u32, host_pid);
        }

        // Header must be visible before any slot is handed out.
        fence(Ordering::Release);

        let table = Self { path, mmap, pins };
        for (index, pin) in table.pins.iter().enumerate() {
            if let Some(slot) = table.slot(index) {
                slot.bind(*pin);
            }
        }

        table.write_info_file(host_pid)?;
        tracing::debug!(path = %table.path.display(), slots = table.pins.len(), "pin table created");
        Ok(table)
    }

    /// Backing file path, handed to the sketch process at spawn.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of slots in the table.
    pub fn slot_count(&self) -> usize {
        self.pins.len()
    }

    /// Configured pin numbers, in slot order.
    pub fn pins(&self) -> &[u16] {
        &self.pins
    }

    /// Slot index for a pin number.
    pub fn slot_index(&self, pin: u16) -> Option<usize> {
        self.pins.binary_search(&pin).ok()
    }

    /// Slot at `index`, if in range.
    pub fn slot(&self, index: usize) -> Option<&PinSlot> {
        if index >= self.pins.len() {
            return None;
        }
        let base = unsafe {
            self.mmap
                .as_ptr()
                .add(std::mem::size_of::<TableHeader>())
                .cast::<PinSlot>()
        };
        Some(unsafe { &*base.add(index) })
    }

    /// Slot serving a pin number.
    pub fn slot_for_pin(&self, pin: u16) -> Option<&PinSlot> {
        self.slot_index(pin).and_then(|index| self.slot(index))
    }

    fn header(&self) -> &TableHeader {
        unsafe { &*(self.mmap.as_ptr() as *const TableHeader) }
    }

    /// PID recorded by the creating host.
    pub fn host_pid(&self) -> u32 {
        self.header().host_pid
    }

    fn info_path(&self) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push(".meta");
        PathBuf::from(p)
    }

    fn write_info_file(&self, host_pid: u32) -> ShmResult<()> {
        let info = TableInfo {
            path: self.path.display().to_string(),
            slot_count: self.pins.len() as u32,
            host_pid,
            created_at_secs: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };
        let json = serde_json::to_string_pretty(&info).map_err(|e| ShmError::Io {
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        std::fs::write(self.info_path(), json)?;
        Ok(())
    }
}

impl Drop for HostPinTable {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        let _ = std::fs::remove_file(self.info_path());
        tracing::debug!(path = %self.path.display(), "pin table destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin_set(pins: &[u16]) -> BTreeSet<u16> {
        pins.iter().copied().collect()
    }

    #[test]
    fn create_orders_slots_by_pin_number() {
        let table = HostPinTable::create(&pin_set(&[13, 1, 5])).unwrap();
        assert_eq!(table.pins(), &[1, 5, 13]);
        assert_eq!(table.slot_count(), 3);
        assert_eq!(table.slot_index(5), Some(1));
        assert_eq!(table.slot_index(7), None);
        assert_eq!(table.slot(1).unwrap().pin(), 5);
        assert!(table.slot(3).is_none());
    }

    #[test]
    fn create_records_host_pid() {
        let table = HostPinTable::create(&pin_set(&[2])).unwrap();
        assert_eq!(table.host_pid(), current_pid());
    }

    #[test]
    fn backing_files_removed_on_drop() {
        let table = HostPinTable::create(&pin_set(&[4])).unwrap();
        let path = table.path().to_path_buf();
        let meta = table.info_path();
        assert!(path.exists());
        assert!(meta.exists());

        drop(table);
        assert!(!path.exists());
        assert!(!meta.exists());
    }

    #[test]
    fn empty_pin_set_is_allowed() {
        let table = HostPinTable::create(&BTreeSet::new()).unwrap();
        assert_eq!(table.slot_count(), 0);
        assert!(table.slot(0).is_none());
    }
}
