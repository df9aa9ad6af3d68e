//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns config; the core crate only sees the [`InstallSettings`]
//! derived from it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. Environment variables: `KILN_INSTALL__TIMEOUT_SECS=60`
//! 3. The file passed with `--config`
//! 4. `.kiln.toml` in the current directory
//! 5. The user config file (`kiln config path`)
//! 6. Built-in defaults (always present)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use kiln_core::{
    application::{FailurePolicy, InstallSettings},
    domain::PackageManager,
};

/// File name of the per-project config.
pub const LOCAL_CONFIG: &str = ".kiln.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// How installs run.
    pub install: InstallConfig,
    /// Output settings.
    pub output: OutputConfig,
    /// Where extra plugins come from.
    pub catalog: CatalogConfig,
    /// Log file settings.
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub failure_policy: FailurePolicy,
    pub timeout_secs: u64,
    pub exact: bool,
    pub silent: bool,
    /// Overrides the detected package manager when set.
    pub package_manager: Option<PackageManager>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    /// `auto`, `human`, `plain` or `json`.
    pub format: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory of `*.toml` plugin manifests loaded next to the built-ins.
    pub plugins_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Also write logs to this file.
    pub file: Option<PathBuf>,
    /// Write the log file as JSON lines.
    pub json: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        let settings = InstallSettings::default();
        Self {
            failure_policy: settings.failure_policy,
            timeout_secs: settings.timeout.as_secs(),
            exact: settings.exact,
            silent: settings.silent,
            package_manager: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            no_color: false,
            format: "auto".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from every source, over the built-in defaults.
    ///
    /// `config_file` is the path the user passed via `--config`; unlike the
    /// implicit locations it must exist.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        Self::load_from(Self::config_path(), Path::new(LOCAL_CONFIG), config_file)
    }

    fn load_from(
        user_file: PathBuf,
        local_file: &Path,
        explicit: Option<&PathBuf>,
    ) -> anyhow::Result<Self> {
        let defaults = Config::try_from(&Self::default()).context("Invalid built-in defaults")?;

        let mut builder = Config::builder()
            .add_source(defaults)
            .add_source(File::from(user_file).format(FileFormat::Toml).required(false))
            .add_source(
                File::from(local_file.to_path_buf())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path.clone()).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("KILN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Configuration has invalid values")
    }

    /// Path to the user configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.kiln.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "kiln", "kiln")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG))
    }

    /// Settings handed to the installation orchestrator.
    pub fn install_settings(&self) -> InstallSettings {
        InstallSettings {
            package_manager: self.install.package_manager,
            exact: self.install.exact,
            silent: self.install.silent,
            timeout: Duration::from_secs(self.install.timeout_secs),
            failure_policy: self.install.failure_policy,
        }
    }

    /// Look up a value by dotted key, e.g. `install.timeout_secs`.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = serde_json::to_value(self).ok()?;
        let found = key
            .split('.')
            .try_fold(&value, |node, part| node.get(part))?;
        Some(match found {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        })
    }
}
