//! # vmcu Shared Pin Table
//!
//! Inter-process shared memory holding the board's peripheral state: a
//! fixed-layout table of per-pin capability slots mapped by both the host
//! and the sketch process.
//!
//! The host creates the table before spawning the sketch
//! ([`HostPinTable::create`]) and hands the backing path to the child via
//! the `VMCU_SHM_PATH` environment variable; the sketch side attaches with
//! [`SketchPinTable::attach_env`]. Every slot sub-value is an independent
//! atomic with a fixed, single-owner write direction, so no cross-process
//! locking is needed and no reader ever observes a torn value.
//!
//! ## Thread Safety
//!
//! - [`HostPinTable`]: shareable across host threads (all access is atomic)
//! - [`SketchPinTable`]: same, on the sketch side

#![warn(clippy::all)]

pub mod error;
pub mod host;
pub mod platform;
pub mod sketch;

pub use error::{ShmError, ShmResult};
pub use host::HostPinTable;
pub use sketch::SketchPinTable;
pub use vmcu_common::table::{PinSlot, SHM_PATH_ENV, TableHeader};
