//! Domain types and wire-format arithmetic shared by every strongbox crate.
//!
//! This crate has no I/O. It defines the `.tef` chunk-layout math, the
//! persistent data model, the cross-cutting error taxonomy, and small
//! helpers (handle/code generation) that every other crate in the
//! workspace depends on.

pub mod chunk;
pub mod constants;
pub mod error;
pub mod model;
pub mod token;

pub use chunk::*;
pub use constants::*;
pub use error::AppError;
