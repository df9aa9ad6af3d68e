//! Application layer errors.
//!
//! These errors represent failures in orchestration, I/O and rollback, not
//! business logic. Business logic errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::application::transaction::{TransactionId, TransactionStatus};
use crate::domain::{LifecycleStep, RestoreFailure, ValidationResult};
use crate::error::ErrorCategory;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// A file that had to exist does not.
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// `restore` was called for a path that was never backed up.
    #[error("No backup recorded for {path}")]
    BackupNotFound { path: PathBuf },

    /// One or more files could not be restored. Every other file was.
    #[error(
        "Could not restore {count} file(s): {paths}",
        count = .failures.len(),
        paths = join_failures(.failures)
    )]
    RestoreFailed { failures: Vec<RestoreFailure> },

    /// The package manager exited unsuccessfully.
    #[error("Package installation failed for {}: {reason}", .packages.join(", "))]
    InstallFailed {
        packages: Vec<String>,
        reason: String,
    },

    /// The package manager did not finish in time and was killed.
    #[error("Package installation timed out after {timeout:?}")]
    InstallTimeout {
        packages: Vec<String>,
        timeout: Duration,
    },

    /// Text insertion could not find its anchor.
    #[error("Anchor {anchor:?} not found in {path}")]
    AnchorNotFound { path: PathBuf, anchor: String },

    /// A plugin's file configuration step failed.
    #[error("Configuration of '{plugin}' failed: {reason}")]
    ConfigurationFailed { plugin: String, reason: String },

    /// A plugin lifecycle hook reported failure.
    #[error("Plugin '{plugin}' failed during {step}: {reason}")]
    PluginFailed {
        plugin: String,
        step: LifecycleStep,
        reason: String,
    },

    /// The selection violates blocking compatibility rules. Nothing was changed.
    #[error("Incompatible plugin selection: {}", .result.error_summary())]
    ValidationFailed { result: Box<ValidationResult> },

    /// The project context could not be established.
    #[error("Could not detect project at {path}: {reason}")]
    DetectionFailed { path: PathBuf, reason: String },

    /// The run was cancelled between lifecycle steps.
    #[error("Installation cancelled")]
    Cancelled,

    #[error("Unknown transaction: {id}")]
    TransactionNotFound { id: TransactionId },

    #[error("Transaction {id} is already {status}")]
    InvalidTransactionState {
        id: TransactionId,
        status: TransactionStatus,
    },

    /// Shared state access failed (lock poisoned).
    #[error("Internal state lock poisoned")]
    StoreLockError,
}

fn join_failures(failures: &[RestoreFailure]) -> String {
    failures
        .iter()
        .map(|f| f.path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ApplicationError {
    pub fn filesystem(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::FilesystemError {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::FileNotFound { path } => vec![
                format!("Expected file is missing: {}", path.display()),
                "Run kiln from the project root or pass --root".into(),
            ],
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
            ],
            Self::RestoreFailed { failures } => {
                let mut out = vec!["Some files could not be restored automatically:".into()];
                out.extend(failures.iter().map(|f| format!("  {f}")));
                out.push("Restore them from version control (git checkout -- <file>)".into());
                out
            }
            Self::InstallFailed { packages, .. } => vec![
                format!("Try installing manually: npm install {}", packages.join(" ")),
                "Check your network connection and registry settings".into(),
            ],
            Self::InstallTimeout { .. } => vec![
                "The package manager took too long".into(),
                "Raise the limit with --timeout or install.timeout_secs".into(),
            ],
            Self::ValidationFailed { result } => {
                let mut out: Vec<String> = result
                    .errors
                    .iter()
                    .map(|v| format!("{} (key: {})", v.message, v.key()))
                    .collect();
                if result.errors.iter().any(|v| v.allow_override) {
                    out.push("Accept an overridable violation with --accept <key>".into());
                }
                out.push("Try: kiln check <plugins...> to see every violation".into());
                out
            }
            Self::DetectionFailed { .. } => vec![
                "Make sure the directory contains a package.json".into(),
                "Supported frameworks: react, vue, svelte, angular, nextjs, nuxt, solid, preact"
                    .into(),
            ],
            Self::StoreLockError => vec![
                "Internal state is locked".into(),
                "Try again in a moment".into(),
            ],
            _ => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FileNotFound { .. } | Self::DetectionFailed { .. } => ErrorCategory::NotFound,
            Self::ValidationFailed { .. } => ErrorCategory::Compatibility,
            Self::InstallFailed { .. }
            | Self::InstallTimeout { .. }
            | Self::ConfigurationFailed { .. }
            | Self::PluginFailed { .. }
            | Self::RestoreFailed { .. } => ErrorCategory::Installation,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::FilesystemError { .. }
            | Self::AnchorNotFound { .. }
            | Self::BackupNotFound { .. }
            | Self::TransactionNotFound { .. }
            | Self::InvalidTransactionState { .. }
            | Self::StoreLockError => ErrorCategory::Internal,
        }
    }
}
