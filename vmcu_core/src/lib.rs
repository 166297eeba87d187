//! # vmcu Core
//!
//! Emulates a microcontroller board by running a compiled sketch as an
//! isolated OS process and exposing its virtual pins to the host for
//! inspection, stimulation, and automated testing.
//!
//! The entry point is [`Board`]: a guarded lifecycle state machine that
//! supervises the sketch process, owns the shared pin table, and steps the
//! synthetic GPIO drivers once per [`Board::tick`]. Sketches are produced
//! by the [`Toolchain`] from a [`Sketch`] descriptor and consumed only
//! through their result contracts.
//!
//! ```rust,no_run
//! use vmcu_core::{Board, Sketch};
//! use vmcu_common::gpio::BoardConfig;
//!
//! let mut board = Board::new();
//! let sketch = Sketch::from_executable("/path/to/compiled/sketch");
//! assert!(board.configure(BoardConfig::default()));
//! assert!(board.attach_sketch(&sketch));
//! assert!(board.start());
//! board.tick();
//! assert!(board.stop());
//! ```

pub mod board;
pub mod gpio;
pub mod process;
pub mod sketch;
pub mod toolchain;
pub mod view;

pub use board::{Board, Status};
pub use process::{EXIT_SPAWN_FAILED, SketchProcess, SpawnError};
pub use sketch::{Sketch, SketchConfig};
pub use toolchain::{Toolchain, ToolchainError};
pub use view::{AnalogPin, BoardView, DigitalPin, PinView};
