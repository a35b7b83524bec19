//! Error handling for recipe-kit
//!
//! This module provides the strongly-typed error enum used across the crate and the
//! user-facing rendering of those errors. The error system follows two principles:
//! 1. **Strongly-typed errors** for precise handling in code (e.g. the installer
//!    distinguishing a missing package from a transport failure)
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Resolution**: [`RecipeError::AliasResolution`], [`RecipeError::InvalidVersionConstraint`]
//! - **Network**: [`RecipeError::TransportFailure`]
//! - **Patching**: [`RecipeError::PatchConflict`], [`RecipeError::UnknownConfigurator`]
//! - **Sync**: [`RecipeError::MissingInstalledPackage`]
//! - **Files**: [`RecipeError::LockParseError`], [`RecipeError::ConfigError`],
//!   [`RecipeError::IoError`], [`RecipeError::JsonError`]
//!
//! A `404` from the recipe server is not an error: it yields an empty response.
//!
//! # Examples
//!
//! ```rust,no_run
//! use recipe_kit::core::{RecipeError, user_friendly_error};
//!
//! let error = RecipeError::UnknownConfigurator {
//!     key: "templates".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for recipe-kit operations.
#[derive(Error, Debug)]
pub enum RecipeError {
    /// A bare argument was neither a known alias nor a valid version constraint.
    ///
    /// The message already contains the multi-line "did you mean" text when
    /// close aliases exist, and is surfaced to the user verbatim.
    #[error("{message}")]
    AliasResolution {
        /// The argument that failed to resolve
        argument: String,
        /// Rendered message, including suggestions
        message: String,
    },

    /// Invalid version constraint
    #[error("Invalid version constraint: {constraint}")]
    InvalidVersionConstraint {
        /// The invalid version constraint string
        constraint: String,
    },

    /// The recipe server could not be reached and no cached copy exists.
    #[error("Could not fetch {url}: {reason}")]
    TransportFailure {
        /// Full URL of the failed request
        url: String,
        /// Reason reported by the last attempt
        reason: String,
    },

    /// A target file does not have the structure a configurator needs.
    ///
    /// Files already patched earlier in the same recipe are not rolled back.
    #[error("Cannot patch {file}: {reason}")]
    PatchConflict {
        /// Path of the file that could not be patched
        file: String,
        /// Why the insertion point could not be found
        reason: String,
    },

    /// A manifest carries a key no configurator handles.
    #[error("Unknown configurator \"{key}\"")]
    UnknownConfigurator {
        /// The unrecognized manifest key
        key: String,
    },

    /// A package named for recipe sync is not installed.
    #[error("Package {name} is not installed")]
    MissingInstalledPackage {
        /// Name of the missing package
        name: String,
    },

    /// Lockfile parsing error
    #[error("Invalid lockfile syntax in {file}")]
    LockParseError {
        /// Path to the lockfile that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Error wrapper carrying a user-facing suggestion and extra details.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: RecipeError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Creates a context without suggestion or details.
    #[must_use]
    pub const fn new(error: RecipeError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Adds a suggestion for resolving the error.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Adds details explaining the error.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Converts any error into an [`ErrorContext`] suitable for the terminal.
///
/// Typed [`RecipeError`]s found anywhere in the `anyhow` chain get tailored
/// suggestions; everything else is wrapped as a configuration error carrying the
/// full context chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(recipe_error) = cause.downcast_ref::<RecipeError>() {
            let owned = match recipe_error {
                RecipeError::AliasResolution {
                    argument,
                    message,
                } => RecipeError::AliasResolution {
                    argument: argument.clone(),
                    message: message.clone(),
                },
                RecipeError::TransportFailure {
                    url,
                    reason,
                } => RecipeError::TransportFailure {
                    url: url.clone(),
                    reason: reason.clone(),
                },
                RecipeError::PatchConflict {
                    file,
                    reason,
                } => RecipeError::PatchConflict {
                    file: file.clone(),
                    reason: reason.clone(),
                },
                RecipeError::UnknownConfigurator {
                    key,
                } => RecipeError::UnknownConfigurator {
                    key: key.clone(),
                },
                RecipeError::MissingInstalledPackage {
                    name,
                } => RecipeError::MissingInstalledPackage {
                    name: name.clone(),
                },
                other => RecipeError::ConfigError {
                    message: other.to_string(),
                },
            };
            return create_error_context(owned);
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(RecipeError::ConfigError {
                message: format!("{error:#}"),
            })
            .with_suggestion("Check the permissions of the project directory");
        }
    }

    ErrorContext::new(RecipeError::ConfigError {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: RecipeError) -> ErrorContext {
    match &error {
        RecipeError::TransportFailure {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check your network connection or set RECIPES_ENDPOINT to a reachable server")
            .with_details("No cached copy of this response exists, so degraded mode was not possible"),
        RecipeError::PatchConflict {
            ..
        } => ErrorContext::new(error).with_details(
            "Files patched earlier for the same recipe were left in place; revert them manually if needed",
        ),
        RecipeError::UnknownConfigurator {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Upgrade rkit; the recipe uses an instruction this version does not know"),
        RecipeError::MissingInstalledPackage {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Run the package manager's install command before syncing recipes"),
        _ => ErrorContext::new(error),
    }
}
