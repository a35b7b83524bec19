//! Shared utilities
//!
//! # Modules
//!
//! - [`backoff`] - Bounded retry policy for remote calls
//! - [`fs`] - Atomic writes and directory helpers for patched project files
//!
//! # Example
//!
//! ```rust,no_run
//! use recipe_kit::utils::{atomic_write, ensure_dir};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! ensure_dir(Path::new("config/packages"))?;
//! atomic_write(Path::new("config/packages/mailer.yaml"), b"mailer: ~\n")?;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod fs;

pub use backoff::RetryPolicy;
pub use fs::{atomic_write, ensure_dir, safe_write};
