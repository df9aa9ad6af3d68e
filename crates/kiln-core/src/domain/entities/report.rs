use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-plugin lifecycle state.
///
/// ```text
/// Idle → Detecting → PreInstall → Install → PostInstall → Configure → Done
///                         └──────────┴───────────┴────────────┴──→ RollingBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleStep {
    Idle,
    Detecting,
    PreInstall,
    Install,
    PostInstall,
    Configure,
    Done,
    RollingBack,
}

impl LifecycleStep {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Detecting => "detecting",
            Self::PreInstall => "pre-install",
            Self::Install => "install",
            Self::PostInstall => "post-install",
            Self::Configure => "configure",
            Self::Done => "done",
            Self::RollingBack => "rolling-back",
        }
    }

    /// Steps after which the project may already be mutated.
    pub const fn mutates(self) -> bool {
        matches!(
            self,
            Self::PreInstall | Self::Install | Self::PostInstall | Self::Configure
        )
    }
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A path that could not be restored during rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for RestoreFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// One plugin that failed, the step it failed in, and what could not be undone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginFailure {
    pub plugin: String,
    pub step: LifecycleStep,
    pub error: String,
    #[serde(default)]
    pub restore_failures: Vec<RestoreFailure>,
}

impl PluginFailure {
    pub fn fully_reverted(&self) -> bool {
        self.restore_failures.is_empty()
    }
}

/// Final outcome of an installation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationReport {
    pub success: bool,
    pub started_at: DateTime<Utc>,
    #[serde(with = "duration_ms", rename = "durationMs")]
    pub duration: Duration,
    pub installed: Vec<String>,
    /// Plugins whose `detect` reported them as already present.
    pub skipped: Vec<String>,
    /// Plugins never attempted because the queue was aborted.
    pub not_attempted: Vec<String>,
    pub failed: Vec<PluginFailure>,
    pub warnings: Vec<String>,
    /// Info-level findings from validation, such as recommended add-ons.
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub files_created: Vec<PathBuf>,
    pub files_modified: Vec<PathBuf>,
    /// Set when earlier plugins' changes were undone after a later failure.
    pub reverted: bool,
    /// Plugins that completed but were undone by the revert.
    #[serde(default)]
    pub rolled_back: Vec<String>,
}

impl InstallationReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            started_at,
            duration: Duration::ZERO,
            installed: Vec::new(),
            skipped: Vec::new(),
            not_attempted: Vec::new(),
            failed: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
            files_created: Vec::new(),
            files_modified: Vec::new(),
            reverted: false,
            rolled_back: Vec::new(),
        }
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} installed", self.installed.len())];
        if !self.skipped.is_empty() {
            parts.push(format!("{} already present", self.skipped.len()));
        }
        if !self.failed.is_empty() {
            parts.push(format!("{} failed", self.failed.len()));
        }
        if !self.not_attempted.is_empty() {
            parts.push(format!("{} not attempted", self.not_attempted.len()));
        }
        if self.reverted {
            parts.push(format!("{} reverted", self.rolled_back.len()));
        }

        format!(
            "{}: {} in {:.1}s",
            if self.success { "Success" } else { "Failed" },
            parts.join(", "),
            self.duration.as_secs_f64()
        )
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
