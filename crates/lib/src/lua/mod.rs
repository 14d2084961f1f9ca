//! Lua front-end for descriptors.
//!
//! A descriptor is a Lua script declaring artifacts through the `make`
//! global. Every call forwards to the [`Session`](crate::session::Session)
//! the runtime is bound to.
//!
//! # Submodules
//!
//! - [`globals`] - the `make` table
//! - [`paths`] - `make.paths`, artifact locations
//! - [`runtime`] - Lua VM creation and descriptor loading
//! - [`values`] - argument conversion

pub mod globals;
pub mod paths;
pub mod runtime;
pub mod values;
