pub mod common;
pub mod context;
pub mod file_operation;
pub mod plugin;
pub mod report;

pub use crate::domain::DomainError;
pub use common::normalize_path;
pub use context::{ProjectContext, ProjectContextBuilder};
pub use file_operation::{FileOperation, FileOperationKind};
pub use plugin::{Named, PackageSet, PluginDescriptor, PluginDescriptorBuilder, Unnamed};
pub use report::{InstallationReport, LifecycleStep, PluginFailure, RestoreFailure};
