//! Sketch-side pin table attachment
//!
//! The counterpart of [`HostPinTable`](crate::host::HostPinTable), linked
//! into the sketch runtime. The spawned process finds the backing path in
//! the `VMCU_SHM_PATH` environment variable, attaches, declares the
//! capabilities its pins use, and then reads/writes values by pin number.

use crate::error::{ShmError, ShmResult};
use crate::platform::{attach_segment_mmap, is_process_alive};
use memmap2::MmapMut;
use std::path::Path;
use vmcu_common::table::{PinSlot, SHM_PATH_ENV, TableHeader, layout_hash, table_len};

/// Sketch-side view of the shared pin table.
pub struct SketchPinTable {
    mmap: MmapMut,
    pins: Vec<u16>,
}

impl SketchPinTable {
    /// Attach to the table backing file at `path`.
    ///
    /// Validates the header magic, layout hash, and declared slot count
    /// against the mapped length before any slot access.
    pub fn attach(path: &Path) -> ShmResult<Self> {
        let mmap = attach_segment_mmap(path)?;

        if mmap.len() < std::mem::size_of::<TableHeader>() {
            return Err(ShmError::Truncated {
                len: mmap.len(),
                slot_count: 0,
            });
        }

        let header = unsafe { &*(mmap.as_ptr() as *const TableHeader) };
        if !header.is_magic_valid() {
            return Err(ShmError::BadMagic {
                path: path.display().to_string(),
            });
        }
        if header.layout_hash != layout_hash() {
            return Err(ShmError::LayoutMismatch {
                expected: layout_hash(),
                found: header.layout_hash,
            });
        }
        let slot_count = header.slot_count;
        if mmap.len() < table_len(slot_count as usize) {
            return Err(ShmError::Truncated {
                len: mmap.len(),
                slot_count,
            });
        }

        let base = unsafe {
            mmap.as_ptr()
                .add(std::mem::size_of::<TableHeader>())
                .cast::<PinSlot>()
        };
        let pins = (0..slot_count as usize)
            .map(|index| unsafe { (*base.add(index)).pin() })
            .collect();

        tracing::debug!(path = %path.display(), slots = slot_count, "attached to pin table");
        Ok(Self { mmap, pins })
    }

    /// Attach using the path published in `VMCU_SHM_PATH`.
    pub fn attach_env() -> ShmResult<Self> {
        let path = std::env::var_os(SHM_PATH_ENV).ok_or(ShmError::EnvMissing(SHM_PATH_ENV))?;
        Self::attach(Path::new(&path))
    }

    /// Pin numbers present in the table, in slot order.
    pub fn pins(&self) -> &[u16] {
        &self.pins
    }

    /// Whether the host process that created the table is still alive.
    ///
    /// A dead host leaves the mapping readable but frozen; sketch runtimes
    /// poll this to bail out instead of spinning on stale pins.
    pub fn host_alive(&self) -> bool {
        is_process_alive(self.header().host_pid)
    }

    fn header(&self) -> &TableHeader {
        unsafe { &*(self.mmap.as_ptr() as *const TableHeader) }
    }

    fn slot(&self, index: usize) -> Option<&PinSlot> {
        let header = self.header();
        if index >= header.slot_count as usize {
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

    fn slot_for_pin(&self, pin: u16) -> ShmResult<&PinSlot> {
        self.pins
            .iter()
            .position(|&p| p == pin)
            .and_then(|index| self.slot(index))
            .ok_or(ShmError::UnknownPin { pin })
    }

    /// Declare the digital capability on `pin`.
    pub fn declare_digital(&self, pin: u16) -> ShmResult<()> {
        self.slot_for_pin(pin)?.declare_digital();
        Ok(())
    }

    /// Declare the analog capability on `pin`.
    pub fn declare_analog(&self, pin: u16) -> ShmResult<()> {
        self.slot_for_pin(pin)?.declare_analog();
        Ok(())
    }

    /// Read the digital value of `pin`.
    pub fn read_digital(&self, pin: u16) -> ShmResult<bool> {
        Ok(self.slot_for_pin(pin)?.digital())
    }

    /// Write the digital value of `pin`.
    pub fn write_digital(&self, pin: u16, value: bool) -> ShmResult<()> {
        self.slot_for_pin(pin)?.set_digital(value);
        Ok(())
    }

    /// Read the analog value of `pin`.
    pub fn read_analog(&self, pin: u16) -> ShmResult<u16> {
        Ok(self.slot_for_pin(pin)?.analog())
    }

    /// Write the analog value of `pin`.
    pub fn write_analog(&self, pin: u16, value: u16) -> ShmResult<()> {
        self.slot_for_pin(pin)?.set_analog(value);
        Ok(())
    }
}
