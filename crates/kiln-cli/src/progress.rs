//! Spinner shown while plugins install.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use kiln_core::{application::InstallObserver, domain::LifecycleStep};

/// Renders orchestrator progress as a single spinner line.
///
/// Hidden when output is not interactive, so piped output stays clean.
pub struct SpinnerObserver {
    bar: ProgressBar,
    color: bool,
}

impl SpinnerObserver {
    pub fn new(visible: bool, color: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new_spinner();
            let template = if color {
                "{spinner:.cyan} {msg}"
            } else {
                "{spinner} {msg}"
            };
            bar.set_style(
                ProgressStyle::with_template(template)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(90));
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar, color }
    }

    /// Clear the spinner before printing the report.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl InstallObserver for SpinnerObserver {
    fn plugin_started(&self, plugin: &str, index: usize, total: usize) {
        self.bar.set_prefix(format!("[{}/{total}]", index + 1));
        self.bar.set_message(format!("[{}/{total}] {plugin}", index + 1));
    }

    fn step(&self, plugin: &str, step: LifecycleStep) {
        let prefix = self.bar.prefix();
        self.bar
            .set_message(format!("{prefix} {plugin}: {}", step_label(step)));
    }

    fn plugin_finished(&self, plugin: &str, success: bool) {
        let mark = match (success, self.color) {
            (true, true) => "\u{2713}".green().to_string(),
            (true, false) => "\u{2713}".to_string(),
            (false, true) => "\u{2717}".red().to_string(),
            (false, false) => "\u{2717}".to_string(),
        };
        self.bar.println(format!("{mark} {plugin}"));
    }
}

fn step_label(step: LifecycleStep) -> &'static str {
    match step {
        LifecycleStep::Detecting => "checking for an existing install",
        LifecycleStep::PreInstall => "preparing",
        LifecycleStep::Install => "installing packages",
        LifecycleStep::PostInstall => "finishing install",
        LifecycleStep::Configure => "writing configuration",
        LifecycleStep::RollingBack => "rolling back",
        LifecycleStep::Idle | LifecycleStep::Done => step.as_str(),
    }
}
