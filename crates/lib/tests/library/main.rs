//! Descriptor-level tests against the public API.

mod common;
mod emission_tests;
mod modules_tests;
