//! CLI integration tests, run against fixture descriptors.

mod build_tests;
mod common;
mod generate_tests;
mod tree_tests;
