//! `kiln add` - validate, then install and configure plugins.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use tracing::{info, instrument, warn};

use kiln_adapters::{CommandInstaller, LocalFilesystem};
use kiln_core::{
    application::{
        CancellationToken, CompatibilityService, InstallRequest, InstallSettings,
        InstallationOrchestrator,
    },
    domain::{InstallationReport, ProjectContext, ValidationResult},
};

use crate::{
    cli::{AddArgs, GlobalArgs},
    commands::{detect_project, incompatible, load_catalog, print_validation},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
    progress::SpinnerObserver,
};

/// What `--dry-run` prints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstallPlan<'a> {
    project: &'a ProjectContext,
    validation: &'a ValidationResult,
    /// Plugins in install order.
    steps: &'a [PlannedStep],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlannedStep {
    plugin: String,
    version: String,
    already_installed: bool,
}

#[instrument(skip_all, fields(plugins = ?args.plugins))]
pub fn execute(
    args: AddArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let ctx = detect_project(&global.root)?;
    let catalog = Arc::new(load_catalog(&config)?);

    let accepted: BTreeSet<_> = args.accept.iter().cloned().collect();
    let service = CompatibilityService::new(catalog.clone());
    let validation = service.check(&args.plugins, &ctx, &accepted)?;

    if !validation.valid {
        if output.is_json() {
            output.json(&validation)?;
        } else {
            print_validation(&validation, &output)?;
        }
        return Err(incompatible(&validation));
    }

    let request = InstallRequest::new(catalog.resolve(&args.plugins)?).accept(accepted);
    let steps = plan(&request, &ctx);

    if args.dry_run {
        return print_plan(&steps, &ctx, &validation, &output);
    }

    if !output.is_json() {
        print_validation(&validation, &output)?;
        print_steps(&steps, &ctx, &output)?;
    }

    if !args.yes && output.is_interactive() && !confirm(steps.len())? {
        return Err(CliError::Cancelled);
    }

    let settings = settings(&args, &config);
    info!(policy = %settings.failure_policy, "Starting installation");

    let cancel = CancellationToken::new();
    watch_signals(&cancel);

    let observer = Arc::new(SpinnerObserver::new(
        output.is_interactive(),
        output.supports_color(),
    ));
    let orchestrator = InstallationOrchestrator::new(
        Arc::new(LocalFilesystem::new()),
        Arc::new(CommandInstaller::new()),
        settings,
    )
    .with_observer(observer.clone());

    let result = orchestrator.run(&request, &ctx, &catalog.rules().rules, &cancel);
    observer.finish();
    let report = result?;

    if output.is_json() {
        output.json(&report)?;
    } else {
        print_report(&report, &output)?;
    }

    if report.success {
        Ok(())
    } else {
        Err(CliError::InstallFailed {
            summary: report.summary(),
            reverted: report.installed.is_empty()
                && report.failed.iter().all(|f| f.fully_reverted()),
        })
    }
}

/// Config values, overridden by whatever was passed on the command line.
fn settings(args: &AddArgs, config: &AppConfig) -> InstallSettings {
    let mut settings = config.install_settings();
    if let Some(policy) = args.policy {
        settings.failure_policy = policy;
    }
    if let Some(pm) = args.package_manager {
        settings.package_manager = Some(pm);
    }
    if args.exact {
        settings.exact = true;
    }
    if let Some(secs) = args.timeout {
        settings.timeout = Duration::from_secs(secs);
    }
    settings
}

fn plan(request: &InstallRequest, ctx: &ProjectContext) -> Vec<PlannedStep> {
    request
        .ordered()
        .iter()
        .map(|plugin| {
            let descriptor = plugin.descriptor();
            PlannedStep {
                plugin: descriptor.name.clone(),
                version: descriptor.version.clone(),
                already_installed: plugin.detect(descriptor, ctx),
            }
        })
        .collect()
}

fn print_plan(
    plan: &[PlannedStep],
    ctx: &ProjectContext,
    validation: &ValidationResult,
    output: &OutputManager,
) -> CliResult<()> {
    if output.is_json() {
        output.json(&InstallPlan {
            project: ctx,
            validation,
            steps: plan,
        })?;
        return Ok(());
    }

    print_validation(validation, output)?;
    print_steps(plan, ctx, output)?;
    output.info("Dry run: nothing was installed")?;
    Ok(())
}

fn print_steps(plan: &[PlannedStep], ctx: &ProjectContext, output: &OutputManager) -> CliResult<()> {
    output.header(&format!(
        "Plan for {} ({}, {})",
        ctx.project_name, ctx.framework, ctx.package_manager
    ))?;
    for (i, step) in plan.iter().enumerate() {
        let note = if step.already_installed {
            output.dim("  already installed, skipping")
        } else {
            String::new()
        };
        output.print(&format!(
            "  {}. {}@{}{note}",
            i + 1,
            step.plugin,
            step.version
        ))?;
    }
    Ok(())
}

fn print_report(report: &InstallationReport, output: &OutputManager) -> CliResult<()> {
    for warning in &report.warnings {
        output.warning(warning)?;
    }
    for failure in &report.failed {
        output.error(&format!(
            "{} failed during {}: {}",
            failure.plugin, failure.step, failure.error
        ))?;
        for restore in &failure.restore_failures {
            output.warning(&format!("could not restore {restore}"))?;
        }
    }
    for path in &report.files_created {
        output.print(&format!("  created  {}", path.display()))?;
    }
    for path in &report.files_modified {
        output.print(&format!("  modified {}", path.display()))?;
    }
    if report.reverted {
        output.warning(&format!(
            "Reverted changes from: {}",
            report.rolled_back.join(", ")
        ))?;
    }
    if !report.not_attempted.is_empty() {
        output.warning(&format!(
            "Not attempted: {}",
            report.not_attempted.join(", ")
        ))?;
    }
    for suggestion in &report.suggestions {
        output.info(suggestion)?;
    }

    if report.success {
        output.success(&report.summary())?;
    }
    let started = report.started_at.with_timezone(&Local);
    output.print(&output.dim(&format!("  started {}", started.format("%H:%M:%S"))))?;
    Ok(())
}

#[cfg(feature = "interactive")]
fn confirm(count: usize) -> CliResult<bool> {
    dialoguer::Confirm::new()
        .with_prompt(format!("Install {count} plugin(s)?"))
        .default(true)
        .interact()
        .map_err(|e| CliError::IoError {
            message: "Failed to read confirmation".into(),
            source: std::io::Error::other(e),
        })
}

#[cfg(not(feature = "interactive"))]
fn confirm(_count: usize) -> CliResult<bool> {
    Ok(true)
}

/// Cancel `token` on SIGINT or SIGTERM so the run stops between steps and
/// rolls back instead of dying half-way.
#[cfg(unix)]
fn watch_signals(token: &CancellationToken) {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(signals) => signals,
        Err(e) => {
            warn!(error = %e, "Cannot watch for interrupts; Ctrl-C will not roll back");
            return;
        }
    };
    let token = token.clone();
    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            warn!(signal, "Interrupted, cancelling after the current step");
            token.cancel();
        }
    });
}

#[cfg(not(unix))]
fn watch_signals(_token: &CancellationToken) {}
