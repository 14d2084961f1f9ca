//! Recipes: what produces a target, independent of how it is invoked.
//!
//! A [`Recipe`] pairs an [`ActionId`] with its arguments. Recipes are
//! immutable once attached to a target. Turning them into text happens in
//! [`render`], once for generated rule files and once for direct execution.

pub mod render;
mod types;

pub use types::{ActionId, Recipe, Resources, Services, ValidationError};
pub(crate) use types::validate_name;
