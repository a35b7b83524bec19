//! Integration test suite for recipe-kit
//!
//! End-to-end tests running the `rkit` binary against throwaway projects.
//! No test needs network access: the endpoint points at a closed port and
//! server answers are planted in the response cache, which exercises the
//! degraded mode.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **resolve**: `rkit resolve` output and failures
//! - **sync_recipes**: `rkit sync-recipes` against host lock files

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod resolve;
mod sync_recipes;

use common::{TestProject, UNREACHABLE_ENDPOINT};
use recipe_kit::downloader::{Response, ResponseCache};
use serde_json::Value;

const LAST_MODIFIED: &str = "Tue, 02 Jan 2018 03:04:05 GMT";

/// Stores `body` as the cached answer for `path` of the test endpoint.
fn plant_cached_response(project: &TestProject, path: &str, body: Value) {
    let cache = ResponseCache::new(project.cache_path(), UNREACHABLE_ENDPOINT);
    let response = Response::new(body, [("Last-Modified", LAST_MODIFIED)], 200);
    cache.write(path, &response).unwrap();
}
