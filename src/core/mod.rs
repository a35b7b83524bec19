//! Core types and error handling for recipe-kit
//!
//! This module hosts the crate-wide error type and its user-facing rendering.
//! Domain models (packages, recipes, operations) live in [`crate::models`].

pub mod error;

pub use error::{ErrorContext, RecipeError, user_friendly_error};
