//! The plugin port.
//!
//! A plugin is a [`PluginDescriptor`] (pure data) plus lifecycle behaviour.
//! Every hook receives the descriptor and context explicitly through a
//! [`LifecycleEnv`], so no hook depends on its own object identity.

use serde::{Deserialize, Serialize};

use crate::application::{
    config_writer::ConfigWriter,
    ports::output::{PackageInstallRequest, PackageInstaller},
    services::orchestrator::InstallSettings,
};
use crate::domain::{FileOperation, PackageSet, PluginDescriptor, ProjectContext};
use crate::error::KilnResult;

/// Result of a plugin's `install` hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallOutcome {
    /// Packages the orchestrator installs on the plugin's behalf.
    pub packages: PackageSet,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InstallOutcome {
    pub fn packages(packages: PackageSet) -> Self {
        Self {
            packages,
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            packages: PackageSet::default(),
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Result of a plugin's `configure` hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureOutcome {
    /// Declarative file effects the orchestrator applies through the
    /// plugin's writer after the hook returns.
    pub files: Vec<FileOperation>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConfigureOutcome {
    pub fn files(files: Vec<FileOperation>) -> Self {
        Self {
            files,
            success: true,
            message: None,
        }
    }

    pub fn done() -> Self {
        Self::files(Vec::new())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            files: Vec::new(),
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Everything a lifecycle hook may touch.
///
/// File effects go through `writer`, which backs up every file before its
/// first mutation. The writer is scoped to one plugin.
pub struct LifecycleEnv<'a> {
    pub descriptor: &'a PluginDescriptor,
    pub ctx: &'a ProjectContext,
    pub writer: &'a mut ConfigWriter,
    installer: &'a dyn PackageInstaller,
    settings: &'a InstallSettings,
}

impl<'a> LifecycleEnv<'a> {
    pub fn new(
        descriptor: &'a PluginDescriptor,
        ctx: &'a ProjectContext,
        writer: &'a mut ConfigWriter,
        installer: &'a dyn PackageInstaller,
        settings: &'a InstallSettings,
    ) -> Self {
        Self {
            descriptor,
            ctx,
            writer,
            installer,
            settings,
        }
    }

    pub fn settings(&self) -> &InstallSettings {
        self.settings
    }

    /// Install a package set with the project's package manager.
    ///
    /// `package.json` and the lockfile are snapshotted first so a rollback
    /// restores them even though the package manager rewrites them.
    pub fn install_packages(&mut self, packages: &PackageSet) -> KilnResult<()> {
        if packages.is_empty() {
            return Ok(());
        }

        let package_manager = self
            .settings
            .package_manager
            .unwrap_or(self.ctx.package_manager);

        self.writer.track_external_modification("package.json")?;
        self.writer
            .track_external_modification(package_manager.lockfile())?;

        for dev in [false, true] {
            let specs = packages.specs(dev);
            if specs.is_empty() {
                continue;
            }
            let request = PackageInstallRequest {
                packages: specs,
                dev,
                package_manager,
                project_root: self.ctx.project_root.clone(),
                exact: self.settings.exact,
                silent: self.settings.silent,
                timeout: self.settings.timeout,
            };
            self.installer.install(&request)?;
        }

        Ok(())
    }

    /// Undo every file effect made through this plugin's writer.
    pub fn undo(&mut self) -> KilnResult<()> {
        self.writer.undo()
    }
}

/// An installable add-on.
///
/// Only `descriptor`, `install` and `configure` are required. Hooks return
/// explicit results; a failure in any hook after mutation began triggers
/// `rollback`.
pub trait Plugin: Send + Sync {
    fn descriptor(&self) -> &PluginDescriptor;

    /// True if the plugin is already present in the project.
    fn detect(&self, descriptor: &PluginDescriptor, ctx: &ProjectContext) -> bool {
        ctx.has_dependency(&descriptor.name)
    }

    fn pre_install(&self, _env: &mut LifecycleEnv<'_>) -> KilnResult<()> {
        Ok(())
    }

    fn install(&self, env: &mut LifecycleEnv<'_>) -> KilnResult<InstallOutcome>;

    fn post_install(&self, _env: &mut LifecycleEnv<'_>) -> KilnResult<()> {
        Ok(())
    }

    fn configure(&self, env: &mut LifecycleEnv<'_>) -> KilnResult<ConfigureOutcome>;

    /// Restore every file this plugin touched and remove the ones it created.
    fn rollback(&self, env: &mut LifecycleEnv<'_>) -> KilnResult<()> {
        env.undo()
    }
}
