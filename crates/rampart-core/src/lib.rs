//! Rampart Core — shared types, errors, and configuration.
//!
//! This crate provides the foundational types used across all Rampart crates.
//! It has no internal Rampart dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`record`]: The persisted policy row
//! - [`filter`]: Exact and windowed row predicates
//! - [`config`]: Store backend and naming configuration

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod filter;
pub mod record;

// Re-export key types at crate root for convenience
pub use config::StoreConfig;
pub use error::{BoxError, Error, Result};
pub use filter::RecordFilter;
pub use record::{MAX_FIELDS, PolicyRecord};
