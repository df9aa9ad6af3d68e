//! Application layer for Kiln.
//!
//! This layer contains:
//! - **Services**: Use case orchestration (CompatibilityService, InstallationOrchestrator)
//! - **Ports**: Interface definitions (traits) for external dependencies and plugins
//! - **State**: Backup store, config writer and transactions that make installs undoable
//! - **Errors**: Application-specific error types
//!
//! Compatibility rules and validation live in `crate::domain`; this layer
//! applies them and performs the side effects.

pub mod backup;
pub mod cancel;
pub mod catalog;
pub mod config_writer;
pub mod error;
pub mod ports;
pub mod services;
pub mod transaction;

#[cfg(test)]
pub(crate) mod testing;

pub use backup::BackupStore;
pub use cancel::CancellationToken;
pub use catalog::Catalog;
pub use config_writer::{ConfigWriter, WriterLedger};
pub use error::ApplicationError;
pub use services::{
    CompatibilityService, FailurePolicy, InstallRequest, InstallSettings, InstallationOrchestrator,
};
pub use transaction::{TrackedOperation, TransactionId, TransactionManager, TransactionStatus};

// Re-export port traits (for adapter implementation)
pub use ports::{
    ConfigureOutcome, Filesystem, InstallObserver, InstallOutcome, LifecycleEnv, NoopObserver,
    PackageInstallRequest, PackageInstaller, Plugin,
};
