//! # cardest-common
//!
//! Foundation layer for cardest: identifier types, hashing aliases, and
//! the shared error taxonomy.
//!
//! This crate is used by every other cardest crate. It has no internal
//! dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Core type definitions (VertexId, VLabel, ELabel)
//! - [`hash`] - Fast non-cryptographic hash map/set aliases
//! - [`error`] - Error taxonomy and `Result` alias

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod hash;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{Error, Result};
pub use hash::{FxHashMap, FxHashSet};
pub use types::{ELabel, VLabel, VertexId};
