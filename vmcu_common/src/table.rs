//! Shared pin-table layout.
//!
//! Defines the fixed `#[repr(C)]` record mapped into both the host and the
//! sketch process: a [`TableHeader`] followed by one [`PinSlot`] per
//! configured pin, ordered by pin number. Every sub-value of a slot is an
//! independent atomic, so a reader always observes the most recent complete
//! write without any cross-process lock.

use static_assertions::const_assert_eq;
use std::sync::atomic::{AtomicU8, AtomicU16, Ordering};

/// Magic bytes identifying a valid pin table: `"VMCUPIN\0"`.
pub const VMCU_TABLE_MAGIC: [u8; 8] = *b"VMCUPIN\0";

/// Environment variable carrying the table path to the sketch process.
pub const SHM_PATH_ENV: &str = "VMCU_SHM_PATH";

/// Table header — 64 bytes, cache-line aligned.
///
/// Written once by the host before the sketch process is spawned. The
/// sketch side validates `magic` and `layout_hash` before touching slots.
#[repr(C, align(64))]
pub struct TableHeader {
    /// Magic bytes: must be [`VMCU_TABLE_MAGIC`].
    pub magic: [u8; 8],
    /// Compile-time hash of the table layout, from [`layout_hash`].
    /// Attach refuses a segment whose hash mismatches.
    pub layout_hash: u32,
    /// Number of [`PinSlot`] records following this header.
    pub slot_count: u32,
    /// PID of the host process that created the table.
    pub host_pid: u32,
    /// Padding to fill 64 bytes.
    pub _padding: [u8; 44],
}

const_assert_eq!(core::mem::size_of::<TableHeader>(), 64);
const_assert_eq!(core::mem::align_of::<TableHeader>(), 64);

impl TableHeader {
    /// Header for a table with `slot_count` slots.
    pub fn new(slot_count: u32, host_pid: u32) -> Self {
        Self {
            magic: VMCU_TABLE_MAGIC,
            layout_hash: layout_hash(),
            slot_count,
            host_pid,
            _padding: [0u8; 44],
        }
    }

    /// Validate the magic bytes.
    #[inline]
    pub fn is_magic_valid(&self) -> bool {
        self.magic == VMCU_TABLE_MAGIC
    }
}

/// One per-pin capability slot — 64 bytes, cache-line aligned.
///
/// The host initializes `pin` before spawn; everything else starts zeroed.
/// Capability flags are set once while the process is live and never
/// retracted. Values are last-write-wins; write direction per capability is
/// fixed at configure time (driver XOR sketch), so no field is contended.
#[repr(C, align(64))]
pub struct PinSlot {
    pin: AtomicU16,
    exists: AtomicU8,
    digital_cap: AtomicU8,
    analog_cap: AtomicU8,
    digital: AtomicU8,
    analog: AtomicU16,
    _padding: [u8; 56],
}

const_assert_eq!(core::mem::size_of::<PinSlot>(), 64);
const_assert_eq!(core::mem::align_of::<PinSlot>(), 64);

impl PinSlot {
    /// Bind this slot to a pin number. Host side, before spawn.
    pub fn bind(&self, pin: u16) {
        self.pin.store(pin, Ordering::Release);
    }

    /// Pin number this slot serves.
    pub fn pin(&self) -> u16 {
        self.pin.load(Ordering::Acquire)
    }

    /// Whether any capability has been declared on this slot.
    pub fn exists(&self) -> bool {
        self.exists.load(Ordering::Acquire) != 0
    }

    /// Declare the digital capability. Set-once; never retracted while live.
    pub fn declare_digital(&self) {
        self.digital_cap.store(1, Ordering::Release);
        self.exists.store(1, Ordering::Release);
    }

    /// Declare the analog capability. Set-once; never retracted while live.
    pub fn declare_analog(&self) {
        self.analog_cap.store(1, Ordering::Release);
        self.exists.store(1, Ordering::Release);
    }

    /// Whether the digital capability has been declared.
    pub fn has_digital(&self) -> bool {
        self.digital_cap.load(Ordering::Acquire) != 0
    }

    /// Whether the analog capability has been declared.
    pub fn has_analog(&self) -> bool {
        self.analog_cap.load(Ordering::Acquire) != 0
    }

    /// Current digital value. Meaningful only if [`has_digital`](Self::has_digital).
    pub fn digital(&self) -> bool {
        self.digital.load(Ordering::Acquire) != 0
    }

    /// Store a digital value.
    pub fn set_digital(&self, value: bool) {
        self.digital.store(value as u8, Ordering::Release);
    }

    /// Current analog value. Meaningful only if [`has_analog`](Self::has_analog).
    pub fn analog(&self) -> u16 {
        self.analog.load(Ordering::Acquire)
    }

    /// Store an analog value.
    pub fn set_analog(&self, value: u16) {
        self.analog.store(value, Ordering::Release);
    }
}

/// Compile-time hash of the table layout.
///
/// Derived from the sizes and alignments of [`TableHeader`] and [`PinSlot`];
/// if either record changes shape the hash changes and reader/writer refuse
/// to connect. Does not detect field reordering within the same total
/// size/alignment, which is acceptable for `#[repr(C)]` records with
/// explicit padding.
pub const fn layout_hash() -> u32 {
    let hs = core::mem::size_of::<TableHeader>() as u32;
    let ss = core::mem::size_of::<PinSlot>() as u32;
    let sa = core::mem::align_of::<PinSlot>() as u32;
    hs.wrapping_mul(0x9E37_79B9) ^ ss.wrapping_mul(0x517C_C1B7) ^ sa.wrapping_mul(0x85EB_CA6B)
}

/// Total byte length of a table with `slot_count` slots.
pub const fn table_len(slot_count: usize) -> usize {
    core::mem::size_of::<TableHeader>() + slot_count * core::mem::size_of::<PinSlot>()
}
