//! Infrastructure adapters for Kiln.
//!
//! This crate implements the ports defined in `kiln-core::application::ports`
//! and ships the built-in plugin catalog. It contains all process spawning
//! and disk I/O.

pub mod builtin_plugins;
pub mod detector;
pub mod filesystem;
pub mod installer;
pub mod plugin_loader;
pub mod plugins;
pub mod versions;

// Re-export commonly used adapters
pub use detector::ProjectDetector;
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use installer::{CommandInstaller, RecordingInstaller};
pub use plugin_loader::{PluginManifest, PluginManifestLoader};
pub use plugins::{DeclarativePlugin, FileAction};
