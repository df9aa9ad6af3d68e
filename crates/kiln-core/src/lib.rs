//! Kiln Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for Kiln, which
//! adds plugins (state libraries, CSS frameworks, test runners...) to an
//! existing front-end project and undoes its own changes when an install fails.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             kiln-cli (CLI)              │
//! │       (Implements Driving Ports)        │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │          Application Services           │
//! │ (CompatibilityService, Orchestrator)    │
//! │  ConfigWriter, BackupStore, Transactions│
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        Application Ports (Traits)       │
//! │  (Filesystem, PackageInstaller, Plugin) │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     kiln-adapters (Infrastructure)      │
//! │ (LocalFilesystem, CommandInstaller, ...)│
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        Domain Layer (Pure Logic)        │
//! │ (PluginDescriptor, RuleGenerator,       │
//! │  CompatibilityValidator)                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kiln_core::prelude::*;
//!
//! # fn demo(
//! #     plugins: Vec<Arc<dyn Plugin>>,
//! #     fs: Arc<dyn Filesystem>,
//! #     installer: Arc<dyn PackageInstaller>,
//! # ) -> KilnResult<()> {
//! let catalog = Catalog::new(plugins);
//! let ctx = ProjectContext::builder(Framework::React, "/work/app").build()?;
//!
//! let request = InstallRequest::new(catalog.resolve(&["zustand"])?);
//! let orchestrator = InstallationOrchestrator::new(fs, installer, InstallSettings::default());
//! let report = orchestrator.run(&request, &ctx, &catalog.rules().rules, &CancellationToken::new())?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        BackupStore, CancellationToken, Catalog, CompatibilityService, ConfigWriter,
        FailurePolicy, InstallRequest, InstallSettings, InstallationOrchestrator,
        TransactionManager,
        ports::{
            ConfigureOutcome, Filesystem, InstallObserver, InstallOutcome, LifecycleEnv,
            PackageInstallRequest, PackageInstaller, Plugin,
        },
    };
    pub use crate::domain::{
        Bundler, Category, CompatibilityRule, CompatibilityValidator, FileOperation, Framework,
        InstallationReport, PackageManager, PackageSet, PluginDescriptor, ProjectContext,
        RuleGenerator, Severity, ValidationResult, ViolationKey,
    };
    pub use crate::error::{KilnError, KilnResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
