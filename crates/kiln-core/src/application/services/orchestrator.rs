//! Installation orchestrator.
//!
//! Drives each selected plugin through its lifecycle, one plugin at a time:
//!
//! ```text
//! Idle → Detecting ─(present)→ skipped
//!            └→ PreInstall → Install → PostInstall → Configure → Done
//!                    └──── any failure ────┴──────────→ RollingBack
//! ```
//!
//! Validation gates the run: an invalid selection is rejected before any
//! file is touched. Each plugin writes through its own `ConfigWriter`; when
//! a plugin finishes, its ledger is folded into one run-wide transaction so
//! [`FailurePolicy::AbortAndRevert`] can undo earlier plugins too.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::application::{
    ApplicationError,
    cancel::CancellationToken,
    config_writer::{ConfigWriter, WriterLedger},
    ports::{Filesystem, InstallObserver, LifecycleEnv, NoopObserver, PackageInstaller, Plugin},
    transaction::{TransactionId, TransactionManager},
};
use crate::domain::{
    CompatibilityRule, CompatibilityValidator, DomainError, InstallationReport, LifecycleStep,
    PackageManager, PluginDescriptor, PluginFailure, ProjectContext, RestoreFailure, ViolationKey,
};
use crate::error::{KilnError, KilnResult};

// ── Settings ──────────────────────────────────────────────────────────────────

/// What happens to the rest of the queue after a plugin fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Roll back the failed plugin and keep installing the rest.
    Continue,
    /// Roll back the failed plugin and stop. Completed plugins stay.
    Abort,
    /// Roll back the failed plugin, stop, and undo completed plugins too.
    #[default]
    AbortAndRevert,
}

impl FailurePolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Abort => "abort",
            Self::AbortAndRevert => "abort-and-revert",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            "abort-and-revert" | "revert" => Ok(Self::AbortAndRevert),
            other => Err(DomainError::InvalidContext(format!(
                "unknown failure policy '{other}' (expected continue, abort or abort-and-revert)"
            ))),
        }
    }
}

/// Knobs for one installation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSettings {
    /// Overrides the detected package manager.
    pub package_manager: Option<PackageManager>,
    pub exact: bool,
    pub silent: bool,
    pub timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            package_manager: None,
            exact: false,
            silent: true,
            timeout: Duration::from_secs(300),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// The plugins to install and the violations the caller accepted.
#[derive(Clone, Default)]
pub struct InstallRequest {
    pub plugins: Vec<Arc<dyn Plugin>>,
    pub accepted: BTreeSet<ViolationKey>,
}

impl InstallRequest {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self {
            plugins,
            accepted: BTreeSet::new(),
        }
    }

    pub fn accept(mut self, keys: impl IntoIterator<Item = ViolationKey>) -> Self {
        self.accepted.extend(keys);
        self
    }

    /// Plugins in the order they will run: required plugins first.
    pub fn ordered(&self) -> Vec<Arc<dyn Plugin>> {
        install_order(&self.plugins)
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

enum PluginRun {
    Skipped,
    Installed(WriterLedger),
    Failed(PluginFailure),
}

pub struct InstallationOrchestrator {
    fs: Arc<dyn Filesystem>,
    installer: Arc<dyn PackageInstaller>,
    transactions: TransactionManager,
    settings: InstallSettings,
    observer: Arc<dyn InstallObserver>,
}

impl InstallationOrchestrator {
    pub fn new(
        fs: Arc<dyn Filesystem>,
        installer: Arc<dyn PackageInstaller>,
        settings: InstallSettings,
    ) -> Self {
        Self {
            transactions: TransactionManager::new(fs.clone()),
            fs,
            installer,
            settings,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn InstallObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn settings(&self) -> &InstallSettings {
        &self.settings
    }

    /// Validate, then install every plugin in `request`.
    ///
    /// Returns `ValidationFailed` without touching disk when the selection
    /// is invalid. Per-plugin failures are rolled back and reported in the
    /// returned report rather than as an error.
    #[instrument(
        skip_all,
        fields(
            plugins = request.plugins.len(),
            root = %ctx.project_root.display(),
            policy = %self.settings.failure_policy
        )
    )]
    pub fn run(
        &self,
        request: &InstallRequest,
        ctx: &ProjectContext,
        rules: &[CompatibilityRule],
        cancel: &CancellationToken,
    ) -> KilnResult<InstallationReport> {
        let started = Instant::now();
        let mut report = InstallationReport::new(Utc::now());

        let selected: Vec<&PluginDescriptor> =
            request.plugins.iter().map(|p| p.descriptor()).collect();
        let validation = CompatibilityValidator::validate_with_overrides(
            &selected,
            ctx,
            rules,
            &request.accepted,
        );
        if !validation.valid {
            warn!(errors = validation.errors.len(), "Selection rejected");
            return Err(ApplicationError::ValidationFailed {
                result: Box::new(validation),
            }
            .into());
        }
        report
            .warnings
            .extend(validation.warnings.iter().map(|w| w.message.clone()));
        report.suggestions = validation.suggestions.clone();

        let queue = install_order(&request.plugins);
        let txn = self.transactions.begin()?;
        let total = queue.len();
        let mut stopped_at = None;

        for (index, plugin) in queue.iter().enumerate() {
            let name = plugin.descriptor().name.clone();

            if cancel.is_cancelled() {
                info!("Cancelled before {name}");
                report.warnings.push("Installation cancelled".into());
                report.success = false;
                stopped_at = Some(index);
                break;
            }

            self.observer.plugin_started(&name, index, total);
            let run = self.run_plugin(plugin.as_ref(), ctx, cancel);

            let failure = match run {
                PluginRun::Skipped => {
                    info!(plugin = %name, "Already present, skipped");
                    report.skipped.push(name.clone());
                    self.observer.plugin_finished(&name, true);
                    continue;
                }
                PluginRun::Installed(ledger) => match self.settle(txn, &name, ledger, &mut report) {
                    None => {
                        info!(plugin = %name, "Installed");
                        report.installed.push(name.clone());
                        self.observer.plugin_finished(&name, true);
                        continue;
                    }
                    Some(failure) => failure,
                },
                PluginRun::Failed(failure) => failure,
            };

            self.observer.plugin_finished(&name, false);
            let cancelled = cancel.is_cancelled();
            if !failure.fully_reverted() {
                report.warnings.push(format!(
                    "{} failed and could not be fully undone: {}",
                    failure.plugin,
                    join_paths(&failure.restore_failures)
                ));
            }
            report.failed.push(failure);
            report.success = false;

            if cancelled || self.settings.failure_policy != FailurePolicy::Continue {
                stopped_at = Some(index + 1);
                break;
            }
        }

        if let Some(from) = stopped_at {
            report.not_attempted = queue[from..]
                .iter()
                .map(|p| p.descriptor().name.clone())
                .collect();
        }

        let revert = !report.success
            && self.settings.failure_policy == FailurePolicy::AbortAndRevert
            && !report.installed.is_empty();

        if revert {
            self.revert_run(txn, &mut report);
        } else if let Err(error) = self.transactions.commit(txn) {
            warn!(%error, "Could not commit run transaction");
            report.warnings.push(format!("Run could not be committed: {error}"));
        }
        if let Err(error) = self.transactions.discard(txn) {
            debug!(%error, "Run transaction already discarded");
        }

        report.duration = started.elapsed();
        info!(summary = %report.summary(), "Installation finished");
        Ok(report)
    }

    fn run_plugin(
        &self,
        plugin: &dyn Plugin,
        ctx: &ProjectContext,
        cancel: &CancellationToken,
    ) -> PluginRun {
        let descriptor = plugin.descriptor();
        self.observer.step(&descriptor.name, LifecycleStep::Detecting);
        if plugin.detect(descriptor, ctx) {
            return PluginRun::Skipped;
        }

        let mut writer = ConfigWriter::new(self.fs.clone(), ctx.project_root.clone());
        let failure = {
            let mut env = LifecycleEnv::new(
                descriptor,
                ctx,
                &mut writer,
                self.installer.as_ref(),
                &self.settings,
            );

            match self.drive(plugin, &mut env, cancel) {
                Ok(()) => None,
                Err((step, error)) => {
                    warn!(plugin = %descriptor.name, %step, %error, "Plugin failed, rolling back");
                    self.observer.step(&descriptor.name, LifecycleStep::RollingBack);
                    let restore_failures = restore_failures(plugin.rollback(&mut env));
                    Some(PluginFailure {
                        plugin: descriptor.name.clone(),
                        step,
                        error: error.to_string(),
                        restore_failures,
                    })
                }
            }
        };

        match failure {
            Some(failure) => PluginRun::Failed(failure),
            None => PluginRun::Installed(writer.into_ledger()),
        }
    }

    /// Run the mutating steps. Errors carry the step they happened in.
    fn drive(
        &self,
        plugin: &dyn Plugin,
        env: &mut LifecycleEnv<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), (LifecycleStep, KilnError)> {
        let name = env.descriptor.name.clone();
        let steps = [
            LifecycleStep::PreInstall,
            LifecycleStep::Install,
            LifecycleStep::PostInstall,
            LifecycleStep::Configure,
        ];

        for step in steps {
            if cancel.is_cancelled() {
                return Err((step, ApplicationError::Cancelled.into()));
            }
            self.observer.step(&name, step);
            debug!(plugin = %name, %step, "Entering step");

            let result = match step {
                LifecycleStep::PreInstall => plugin.pre_install(env),
                LifecycleStep::Install => self.install_step(plugin, env),
                LifecycleStep::PostInstall => plugin.post_install(env),
                LifecycleStep::Configure => self.configure_step(plugin, env),
                _ => Ok(()),
            };
            result.map_err(|e| (step, e))?;
        }

        self.observer.step(&name, LifecycleStep::Done);
        Ok(())
    }

    fn install_step(&self, plugin: &dyn Plugin, env: &mut LifecycleEnv<'_>) -> KilnResult<()> {
        let outcome = plugin.install(env)?;
        if !outcome.success {
            return Err(ApplicationError::PluginFailed {
                plugin: env.descriptor.name.clone(),
                step: LifecycleStep::Install,
                reason: outcome
                    .message
                    .unwrap_or_else(|| "install hook reported failure".into()),
            }
            .into());
        }
        env.install_packages(&outcome.packages)
    }

    fn configure_step(&self, plugin: &dyn Plugin, env: &mut LifecycleEnv<'_>) -> KilnResult<()> {
        let outcome = plugin.configure(env)?;
        if !outcome.success {
            return Err(ApplicationError::ConfigurationFailed {
                plugin: env.descriptor.name.clone(),
                reason: outcome
                    .message
                    .unwrap_or_else(|| "configure hook reported failure".into()),
            }
            .into());
        }
        for op in &outcome.files {
            env.writer.apply(op)?;
        }
        Ok(())
    }

    /// Fold a finished plugin into the run transaction. When that fails the
    /// plugin's own changes are undone and it counts as failed.
    fn settle(
        &self,
        txn: TransactionId,
        name: &str,
        mut ledger: WriterLedger,
        report: &mut InstallationReport,
    ) -> Option<PluginFailure> {
        let error = match self.fold(txn, &ledger, report) {
            Ok(()) => return None,
            Err(error) => error,
        };
        warn!(plugin = %name, %error, "Could not record plugin changes, undoing them");
        Some(PluginFailure {
            plugin: name.to_string(),
            step: LifecycleStep::Done,
            error: error.to_string(),
            restore_failures: restore_failures(ledger.revert(self.fs.as_ref())),
        })
    }

    /// Move a finished plugin's effects into the run transaction. The report
    /// only changes once every operation is tracked.
    fn fold(
        &self,
        txn: TransactionId,
        ledger: &WriterLedger,
        report: &mut InstallationReport,
    ) -> KilnResult<()> {
        let mut seen: HashSet<&PathBuf> = HashSet::new();
        let mut created_paths = Vec::new();
        let mut modified_paths = Vec::new();
        for op in &ledger.operations {
            if !seen.insert(&op.path) {
                continue;
            }
            let previous = ledger.previous_content(&op.path);
            let created = previous.is_none();
            // A snapshotted lockfile the package manager never wrote.
            if created && !self.fs.exists(&op.path) {
                continue;
            }
            self.transactions.track(txn, op.clone(), previous)?;

            if created {
                created_paths.push(op.path.clone());
            } else {
                modified_paths.push(op.path.clone());
            }
        }

        for (list, paths) in [
            (&mut report.files_created, created_paths),
            (&mut report.files_modified, modified_paths),
        ] {
            for path in paths {
                if !list.contains(&path) {
                    list.push(path);
                }
            }
        }
        Ok(())
    }

    fn revert_run(&self, txn: TransactionId, report: &mut InstallationReport) {
        info!(
            plugins = report.installed.len(),
            "Reverting completed plugins"
        );
        match self.transactions.rollback(txn) {
            Ok(undone) => debug!(undone, "Run reverted"),
            Err(e) => {
                let failures = restore_failures(Err(e));
                report.warnings.push(format!(
                    "Earlier plugins could not be fully undone: {}",
                    join_paths(&failures)
                ));
            }
        }
        report.reverted = true;
        report.rolled_back = std::mem::take(&mut report.installed);
        report.files_created.clear();
        report.files_modified.clear();
    }
}

/// Selection order, except that a selected plugin's REQUIRES targets that
/// are also selected come first.
fn install_order(plugins: &[Arc<dyn Plugin>]) -> Vec<Arc<dyn Plugin>> {
    let by_name: HashMap<&str, &Arc<dyn Plugin>> = plugins
        .iter()
        .map(|p| (p.descriptor().name.as_str(), p))
        .collect();

    fn visit<'a>(
        plugin: &'a Arc<dyn Plugin>,
        by_name: &HashMap<&str, &'a Arc<dyn Plugin>>,
        visited: &mut HashSet<String>,
        out: &mut Vec<Arc<dyn Plugin>>,
    ) {
        if !visited.insert(plugin.descriptor().name.clone()) {
            return;
        }
        for dep in &plugin.descriptor().requires {
            if let Some(&dep_plugin) = by_name.get(dep.as_str()) {
                visit(dep_plugin, by_name, visited, out);
            }
        }
        out.push(plugin.clone());
    }

    let mut visited = HashSet::new();
    let mut out = Vec::with_capacity(plugins.len());
    for plugin in plugins {
        visit(plugin, &by_name, &mut visited, &mut out);
    }
    out
}

fn restore_failures(result: KilnResult<()>) -> Vec<RestoreFailure> {
    match result {
        Ok(()) => Vec::new(),
        Err(KilnError::Application(ApplicationError::RestoreFailed { failures })) => failures,
        Err(other) => vec![RestoreFailure {
            path: PathBuf::new(),
            reason: other.to_string(),
        }],
    }
}

fn join_paths(failures: &[RestoreFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
