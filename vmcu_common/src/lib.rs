//! vmcu Common Library
//!
//! Shared types used by every vmcu workspace crate.
//!
//! # Module Structure
//!
//! - [`gpio`] - Pin identifiers, board configuration, GPIO driver specs
//! - [`table`] - Fixed `#[repr(C)]` layout of the shared pin table
//! - [`config`] - TOML configuration loading traits and types

pub mod config;
pub mod gpio;
pub mod table;
