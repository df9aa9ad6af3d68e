//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `kiln-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: File operations
//!   - `PackageInstaller`: Package-manager invocation
//!   - `InstallObserver`: Progress reporting
//!
//! - **Plugin port**: `Plugin` is implemented by each installable add-on and
//!   driven by the orchestrator through a `LifecycleEnv`

pub mod output;
pub mod plugin;

pub use output::{
    Filesystem, InstallObserver, NoopObserver, PackageInstallRequest, PackageInstaller,
};
pub use plugin::{ConfigureOutcome, InstallOutcome, LifecycleEnv, Plugin};

#[cfg(test)]
pub use output::MockPackageInstaller;
