//! # rampart-acl
//!
//! Policy adapter for access-control engines.
//!
//! This crate bridges an in-memory policy model and a Rampart store:
//! - [`PolicyModel`]: section → policy type → ordered rules
//! - [`Adapter`]: the load / save / add / remove contract a host engine calls
//! - [`PolicyAdapter`]: the adapter over any [`PolicyStore`](rampart_storage::PolicyStore)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod adapter;
pub mod model;

pub use adapter::{Adapter, PolicyAdapter, SAVED_SECTIONS};
pub use model::{Assertion, PolicyModel};
pub use rampart_core::{Error, Result, StoreConfig};
