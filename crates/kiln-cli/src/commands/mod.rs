//! Command handlers, one module per subcommand.
//!
//! Handlers take parsed arguments, the loaded config and the output manager,
//! and return [`CliResult`]. Anything shared between handlers lives here.

pub mod add;
pub mod check;
pub mod completions;
pub mod config;
pub mod detect;
pub mod init;
pub mod list;
pub mod rules;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use kiln_adapters::{LocalFilesystem, PluginManifestLoader, ProjectDetector, builtin_plugins};
use kiln_core::{
    application::{Catalog, ports::Plugin},
    domain::{ProjectContext, Severity, ValidationResult},
};

use crate::{
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// Built-in plugins plus any manifests from `catalog.plugins_dir`.
pub(crate) fn load_catalog(config: &AppConfig) -> CliResult<Catalog> {
    let mut plugins = builtin_plugins::plugins();

    if let Some(dir) = &config.catalog.plugins_dir {
        let loaded = PluginManifestLoader::new(dir)
            .load_all()
            .map_err(|e| CliError::ConfigError {
                message: format!("Cannot load plugins from '{}'", dir.display()),
                source: Some(Box::new(e)),
            })?;
        info!(count = loaded.len(), dir = %dir.display(), "Loaded plugin manifests");
        plugins.extend(
            loaded
                .into_iter()
                .map(|plugin| Arc::new(plugin) as Arc<dyn Plugin>),
        );
    }

    let catalog = Catalog::new(plugins);
    debug!(plugins = catalog.len(), rules = catalog.rules().len(), "Catalog ready");
    Ok(catalog)
}

/// Detect the project rooted at `root` from its files on disk.
pub(crate) fn detect_project(root: &Path) -> CliResult<ProjectContext> {
    let detector = ProjectDetector::new(Arc::new(LocalFilesystem::new()));
    Ok(detector.detect(root)?)
}

/// Human rendering of a validation result. Overridable findings carry the
/// key that `--accept` takes.
pub(crate) fn print_validation(result: &ValidationResult, output: &OutputManager) -> CliResult<()> {
    for violation in &result.errors {
        output.error(&violation.message)?;
        if violation.allow_override {
            output.print(&format!(
                "    {}",
                output.dim(&format!("accept with --accept {}", violation.key()))
            ))?;
        }
    }
    for violation in &result.warnings {
        output.warning(&violation.message)?;
        if violation.allow_override {
            output.print(&format!(
                "    {}",
                output.dim(&format!("accept with --accept {}", violation.key()))
            ))?;
        }
    }
    for violation in &result.overridden {
        let label = match violation.severity {
            Severity::Error => "accepted error",
            _ => "accepted",
        };
        output.print(&output.dim(&format!("  {label}: {}", violation.message)))?;
    }
    for suggestion in &result.suggestions {
        output.info(suggestion)?;
    }
    Ok(())
}

/// Error returned when a selection has blocking violations.
pub(crate) fn incompatible(result: &ValidationResult) -> CliError {
    CliError::Incompatible {
        summary: result.error_summary(),
        overridable: result
            .errors
            .iter()
            .filter(|v| v.allow_override)
            .map(|v| v.key().to_string())
            .collect(),
    }
}
