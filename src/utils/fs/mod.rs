//! File system utilities
//!
//! - [`atomic`]: temp-and-rename writes for patched files
//! - [`dirs`]: directory creation, listing and pruning for file copies

pub mod atomic;
pub mod dirs;

pub use atomic::{atomic_write, safe_write};
pub use dirs::{ensure_dir, list_files, remove_empty_parents};
