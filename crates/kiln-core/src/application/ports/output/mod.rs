//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `kiln-adapters` crate provides implementations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{LifecycleStep, PackageManager};
use crate::error::KilnResult;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `kiln_adapters::filesystem::LocalFilesystem` (production)
/// - `kiln_adapters::filesystem::MemoryFilesystem` (testing)
///
/// ## Design Notes
///
/// - Paths handed to the port are already absolute and normalized
/// - Reading a missing file is `ApplicationError::FileNotFound`, never a
///   generic I/O error, so callers can branch on it
pub trait Filesystem: Send + Sync {
    /// Read a UTF-8 file.
    fn read_to_string(&self, path: &Path) -> KilnResult<String>;

    /// Write content to a file, creating parent directories.
    fn write_file(&self, path: &Path, content: &str) -> KilnResult<()>;

    /// Remove a single file.
    fn remove_file(&self, path: &Path) -> KilnResult<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> KilnResult<()>;
}

/// One package-manager invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInstallRequest {
    /// `name@version` specs.
    pub packages: Vec<String>,
    pub dev: bool,
    pub package_manager: PackageManager,
    pub project_root: PathBuf,
    pub exact: bool,
    pub silent: bool,
    /// The install is killed and reported as failed after this long.
    pub timeout: Duration,
}

impl PackageInstallRequest {
    /// Full argv (program first) for this request.
    pub fn command_line(&self) -> Vec<String> {
        let mut argv = vec![self.package_manager.program().to_string()];
        argv.extend(
            self.package_manager
                .install_args(&self.packages, self.dev, self.exact, self.silent),
        );
        argv
    }
}

/// Port for the package manager.
///
/// Implemented by:
/// - `kiln_adapters::installer::CommandInstaller` (spawns npm/pnpm/yarn/bun)
/// - `kiln_adapters::installer::RecordingInstaller` (testing, dry runs)
#[cfg_attr(test, mockall::automock)]
pub trait PackageInstaller: Send + Sync {
    /// Install the requested packages. Timeouts are errors.
    fn install(&self, request: &PackageInstallRequest) -> KilnResult<()>;
}

/// Progress callbacks for a presentation layer.
///
/// Every method has an empty default so observers implement only what they show.
pub trait InstallObserver: Send + Sync {
    fn plugin_started(&self, _plugin: &str, _index: usize, _total: usize) {}

    fn step(&self, _plugin: &str, _step: LifecycleStep) {}

    fn plugin_finished(&self, _plugin: &str, _success: bool) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl InstallObserver for NoopObserver {}
