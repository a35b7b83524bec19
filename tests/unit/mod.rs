//! Unit test suite for recipe-kit
//!
//! Library-level tests that cross module boundaries without running the
//! binary: several recipes patching the same project files, and the
//! installer driven by a scripted transport.
//!
//! ```bash
//! cargo test --test unit
//! ```

mod installer_flow;
mod patching;
