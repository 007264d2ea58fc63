//! # palaver-shared
//!
//! Identifiers, domain enums, and configuration shared by every Palaver
//! crate.  This crate performs no I/O; it only defines the vocabulary the
//! store and the rules layer speak.

pub mod config;
pub mod constants;
pub mod types;

pub use config::ChatConfig;
pub use types::*;
