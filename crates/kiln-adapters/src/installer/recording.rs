//! Installer that records requests instead of running anything.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use tracing::debug;

use kiln_core::{
    application::{ApplicationError, ports::PackageInstallRequest, ports::PackageInstaller},
    error::KilnResult,
};

/// Records every request. Used for dry runs and tests.
///
/// Requests that mention a package registered with
/// [`RecordingInstaller::fail_on`] fail with `InstallFailed`.
#[derive(Debug, Clone, Default)]
pub struct RecordingInstaller {
    requests: Arc<RwLock<Vec<PackageInstallRequest>>>,
    failing: Arc<RwLock<BTreeSet<String>>>,
}

impl RecordingInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any request that installs `package` (bare name, no version).
    pub fn fail_on(self, package: impl Into<String>) -> Self {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(package.into());
        }
        self
    }

    pub fn requests(&self) -> Vec<PackageInstallRequest> {
        self.requests
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Every package spec requested so far, in order.
    pub fn packages(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .flat_map(|r| r.packages)
            .collect()
    }
}

/// `@scope/name@^1.0.0` → `@scope/name`
fn bare_name(spec: &str) -> &str {
    match spec.rfind('@') {
        Some(0) | None => spec,
        Some(i) => &spec[..i],
    }
}

impl PackageInstaller for RecordingInstaller {
    fn install(&self, request: &PackageInstallRequest) -> KilnResult<()> {
        debug!(command = %request.command_line().join(" "), "Recording install");
        self.requests
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?
            .push(request.clone());

        let failing = self
            .failing
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        if let Some(spec) = request
            .packages
            .iter()
            .find(|spec| failing.contains(bare_name(spec)))
        {
            return Err(ApplicationError::InstallFailed {
                packages: request.packages.clone(),
                reason: format!("{} is configured to fail", bare_name(spec)),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::domain::PackageManager;
    use std::path::PathBuf;
    use std::time::Duration;

    fn request(packages: &[&str]) -> PackageInstallRequest {
        PackageInstallRequest {
            packages: packages.iter().map(|p| p.to_string()).collect(),
            dev: false,
            package_manager: PackageManager::Pnpm,
            project_root: PathBuf::from("/app"),
            exact: false,
            silent: true,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn records_requests_in_order() {
        let installer = RecordingInstaller::new();
        installer.install(&request(&["zustand@^5.0.0"])).unwrap();
        installer.install(&request(&["@tanstack/react-query"])).unwrap();

        assert_eq!(
            installer.packages(),
            vec!["zustand@^5.0.0", "@tanstack/react-query"]
        );
    }

    #[test]
    fn fails_for_configured_packages() {
        let installer = RecordingInstaller::new().fail_on("@tanstack/react-query");

        assert!(installer.install(&request(&["zustand"])).is_ok());
        assert!(
            installer
                .install(&request(&["@tanstack/react-query@^5.0.0"]))
                .is_err()
        );
        assert_eq!(installer.requests().len(), 2);
    }

    #[test]
    fn scoped_names_keep_their_scope() {
        assert_eq!(bare_name("@scope/pkg@1.0.0"), "@scope/pkg");
        assert_eq!(bare_name("@scope/pkg"), "@scope/pkg");
        assert_eq!(bare_name("pkg@latest"), "pkg");
    }
}
