//! recipe-kit - applies vendor recipes to a project
//!
//! When a host package manager installs, updates or removes packages,
//! recipe-kit fetches a "recipe" for each of them from a recipe server and
//! applies it: environment variables, container parameters, Docker Compose
//! services, Makefile rules, bundle registrations, scripts and copied files.
//! Removing the package reverts exactly those edits.
//!
//! # Architecture Overview
//!
//! - The [`downloader`] turns package operations into recipe manifests with
//!   conditional revalidation, bounded retries and a cached degraded mode.
//! - The [`configurator`] dispatches each manifest key to a format-specific
//!   configurator; shared text files are patched between named markers so
//!   every edit can be removed byte-for-byte.
//! - The [`installer`] runs fetch, configure and lock bookkeeping for a set
//!   of operations, and implements recipe sync.
//! - The [`resolver`] maps short aliases and version keywords (`lts`,
//!   `next`, ...) to canonical requirement strings.
//! - The [`lockfile`] records which recipes were applied.
//!
//! # Core Modules
//!
//! - [`cli`] - `rkit resolve` and `rkit sync-recipes`
//! - [`config`] - Global config, project metadata and configurator options
//! - [`configurator`] - Marker patching and the per-format configurators
//! - [`constants`] - Wire limits, default locations and variable names
//! - [`core`] - Error types and user-facing error rendering
//! - [`downloader`] - Recipe server client and response cache
//! - [`installer`] - Operation orchestration and bundle class guessing
//! - [`lockfile`] - The recipe lock
//! - [`models`] - Package operations and recipes
//! - [`resolver`] - Alias and version keyword resolution
//! - [`utils`] - File system helpers and the retry policy
//! - [`version`] - Version constraint grammar

pub mod cli;
pub mod config;
pub mod configurator;
pub mod constants;
pub mod core;
pub mod downloader;
pub mod installer;
pub mod lockfile;
pub mod models;
pub mod resolver;
pub mod utils;
pub mod version;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
