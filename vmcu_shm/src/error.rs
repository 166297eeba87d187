//! Error types for shared pin-table operations

use thiserror::Error;

/// Errors that can occur during shared pin-table operations
#[derive(Error, Debug)]
pub enum ShmError {
    /// Backing file already exists
    #[error("Pin table already exists: {path}")]
    AlreadyExists {
        /// Backing file path
        path: String,
    },

    /// Backing file not found
    #[error("Pin table not found: {path}")]
    NotFound {
        /// Backing file path
        path: String,
    },

    /// Mapped segment does not carry the expected magic bytes
    #[error("Not a vmcu pin table: {path}")]
    BadMagic {
        /// Backing file path
        path: String,
    },

    /// Table layout hash differs from this build's layout
    #[error("Pin table layout mismatch: expected {expected:#010x}, found {found:#010x}")]
    LayoutMismatch {
        /// Hash this build computes
        expected: u32,
        /// Hash stored in the mapped header
        found: u32,
    },

    /// Mapping is too small for the slot count its header declares
    #[error("Pin table truncated: {len} bytes for {slot_count} slots")]
    Truncated {
        /// Mapped length in bytes
        len: usize,
        /// Slot count from the header
        slot_count: u32,
    },

    /// Pin number has no slot in the table
    #[error("Pin {pin} is not present in the table")]
    UnknownPin {
        /// Requested pin number
        pin: u16,
    },

    /// Environment variable carrying the table path is not set
    #[error("{0} is not set in the environment")]
    EnvMissing(&'static str),

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },
}

/// Result type for shared pin-table operations
pub type ShmResult<T> = Result<T, ShmError>;
