//! Core domain layer for kiln.
//!
//! Pure data and pure functions: plugin metadata, the project context,
//! compatibility rule generation and validation. All I/O and plugin
//! behaviour live behind ports in the application layer.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: Domain logic is synchronous
//! - **No I/O**: No filesystem, process or network calls
//! - **No logging**: diagnostics are returned as data for callers to log
//! - **Immutable entities**: All domain objects are Clone + PartialEq
pub mod entities;
pub mod error;
pub mod rules;
pub mod validation;
pub mod value_objects;

pub use entities::{
    FileOperation, FileOperationKind, InstallationReport, LifecycleStep, PackageSet,
    PluginDescriptor, PluginDescriptorBuilder, PluginFailure, ProjectContext,
    ProjectContextBuilder, RestoreFailure, normalize_path,
};

pub use error::{DomainError, ErrorCategory};

pub use rules::{CompatibilityRule, RuleDiagnostic, RuleGenerator, RuleSet};

pub use validation::{
    CompatibilityValidator, ValidationResult, Violation, ViolationKey, ViolationKind,
};

pub use value_objects::{Bundler, Category, Framework, PackageManager, Severity};
