//! atmake-lib: declarative build descriptions for XATMI artifacts
//!
//! Descriptors are Lua scripts declaring libraries, executables, servers and
//! installs. Evaluating one fills a [`session::Session`] whose target graph
//! is then either:
//! - emitted as make rules ([`emit`], [`descriptor`]), or
//! - realized directly ([`execute`]).

pub mod config;
pub mod consts;
pub mod descriptor;
pub mod emit;
pub mod eval;
pub mod execute;
pub mod graph;
pub mod lua;
pub mod naming;
pub mod placeholder;
pub mod platform;
pub mod recipe;
pub mod session;
