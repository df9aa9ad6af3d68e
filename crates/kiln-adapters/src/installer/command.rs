//! Installs packages by running the project's package manager.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use kiln_core::{
    application::{ApplicationError, ports::PackageInstaller, ports::PackageInstallRequest},
    error::KilnResult,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long a failed install waits for the rest of stderr. Grandchildren can
/// hold the pipe open long after the package manager itself has exited.
const STDERR_GRACE: Duration = Duration::from_millis(500);

/// Spawns `npm`, `pnpm`, `yarn` or `bun` in the project root.
///
/// The child is polled until it exits or the request's timeout elapses. On
/// unix it runs in its own process group, so a timeout kills lifecycle
/// scripts and other grandchildren along with it. Stderr is captured for the
/// error message.
#[derive(Debug, Clone, Default)]
pub struct CommandInstaller {
    /// Replaces the package manager's program name. Used by tests.
    program: Option<String>,
}

impl CommandInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `program` instead of the package manager, with the same arguments.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    fn spawn(&self, request: &PackageInstallRequest) -> KilnResult<Child> {
        let mut argv = request.command_line();
        if let Some(program) = &self.program {
            argv[0] = program.clone();
        }
        let (program, args) = argv.split_first().ok_or_else(|| ApplicationError::InstallFailed {
            packages: request.packages.clone(),
            reason: "empty command line".into(),
        })?;

        debug!(command = %argv.join(" "), "Spawning package manager");

        let mut command = Command::new(program);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command
            .args(args)
            .current_dir(&request.project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ApplicationError::InstallFailed {
                    packages: request.packages.clone(),
                    reason: format!("could not start {program}: {e}"),
                }
                .into()
            })
    }
}

impl PackageInstaller for CommandInstaller {
    #[instrument(
        skip_all,
        fields(
            manager = %request.package_manager,
            dev = request.dev,
            packages = %request.packages.join(" ")
        )
    )]
    fn install(&self, request: &PackageInstallRequest) -> KilnResult<()> {
        if request.packages.is_empty() {
            return Ok(());
        }

        let mut child = self.spawn(request)?;

        // Drain stderr on a detached thread so a chatty package manager
        // cannot block on a full pipe while we poll. The thread is never
        // joined: it only finishes once every holder of the pipe has exited.
        let (tx, stderr) = mpsc::channel();
        if let Some(mut pipe) = child.stderr.take() {
            thread::spawn(move || {
                let mut buffer = String::new();
                let _ = pipe.read_to_string(&mut buffer);
                let _ = tx.send(buffer);
            });
        }
        let collect_stderr = |rx: mpsc::Receiver<String>| {
            rx.recv_timeout(STDERR_GRACE)
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => {
                    info!(elapsed_ms = started.elapsed().as_millis(), "Packages installed");
                    return Ok(());
                }
                Ok(Some(status)) => {
                    let stderr = collect_stderr(stderr);
                    warn!(?status, "Package manager exited with failure");
                    let reason = if stderr.is_empty() {
                        format!("exited with {status}")
                    } else {
                        stderr
                    };
                    return Err(ApplicationError::InstallFailed {
                        packages: request.packages.clone(),
                        reason,
                    }
                    .into());
                }
                Ok(None) if started.elapsed() > request.timeout => {
                    warn!(
                        timeout_ms = request.timeout.as_millis(),
                        "Package manager timed out, killing process group"
                    );
                    kill_tree(&mut child);
                    drop(child.wait());
                    return Err(ApplicationError::InstallTimeout {
                        packages: request.packages.clone(),
                        timeout: request.timeout,
                    }
                    .into());
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    kill_tree(&mut child);
                    return Err(ApplicationError::InstallFailed {
                        packages: request.packages.clone(),
                        reason: format!("could not wait for package manager: {e}"),
                    }
                    .into());
                }
            }
        }
    }
}

/// Kill the package manager and everything in its process group.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let group = i32::try_from(child.id()).map(Pid::from_raw);
    match group {
        Ok(pid) => {
            if let Err(errno) = killpg(pid, Signal::SIGKILL) {
                debug!(%errno, "Could not signal process group, killing child only");
                drop(child.kill());
            }
        }
        Err(_) => drop(child.kill()),
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    drop(child.kill());
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use kiln_core::domain::PackageManager;
    use kiln_core::error::KilnError;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    fn script(dir: &Path, body: &str) -> String {
        let path = dir.join("fake-pm.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn request(root: &Path, timeout: Duration) -> PackageInstallRequest {
        PackageInstallRequest {
            packages: vec!["zustand@^5.0.0".into()],
            dev: false,
            package_manager: PackageManager::Npm,
            project_root: root.to_path_buf(),
            exact: false,
            silent: true,
            timeout,
        }
    }

    #[test]
    fn runs_in_the_project_root() {
        let temp = TempDir::new().unwrap();
        let installer =
            CommandInstaller::with_program(script(temp.path(), "echo \"$@\" > args.txt"));

        installer
            .install(&request(temp.path(), Duration::from_secs(10)))
            .unwrap();

        let args = fs::read_to_string(temp.path().join("args.txt")).unwrap();
        assert_eq!(args.trim(), "install --silent zustand@^5.0.0");
    }

    #[test]
    fn non_zero_exit_reports_stderr() {
        let temp = TempDir::new().unwrap();
        let installer =
            CommandInstaller::with_program(script(temp.path(), "echo 'E404 not found' >&2; exit 1"));

        let err = installer
            .install(&request(temp.path(), Duration::from_secs(10)))
            .unwrap_err();

        match err {
            KilnError::Application(ApplicationError::InstallFailed { reason, .. }) => {
                assert_eq!(reason, "E404 not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn slow_installs_time_out() {
        let temp = TempDir::new().unwrap();
        let installer = CommandInstaller::with_program(script(temp.path(), "exec sleep 5"));

        let started = Instant::now();
        let err = installer
            .install(&request(temp.path(), Duration::from_millis(200)))
            .unwrap_err();

        assert!(matches!(
            err,
            KilnError::Application(ApplicationError::InstallTimeout { .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn timeout_does_not_wait_for_background_children() {
        let temp = TempDir::new().unwrap();
        let installer = CommandInstaller::with_program(script(temp.path(), "sleep 6 & sleep 6"));

        let started = Instant::now();
        let err = installer
            .install(&request(temp.path(), Duration::from_millis(200)))
            .unwrap_err();

        assert!(matches!(
            err,
            KilnError::Application(ApplicationError::InstallTimeout { .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn failure_does_not_wait_for_background_children() {
        let temp = TempDir::new().unwrap();
        let installer = CommandInstaller::with_program(script(
            temp.path(),
            "sleep 6 & echo 'lifecycle script failed' >&2; exit 1",
        ));

        let started = Instant::now();
        let err = installer
            .install(&request(temp.path(), Duration::from_secs(10)))
            .unwrap_err();

        assert!(matches!(
            err,
            KilnError::Application(ApplicationError::InstallFailed { .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn missing_program_is_an_install_failure() {
        let temp = TempDir::new().unwrap();
        let installer = CommandInstaller::with_program("/definitely/not/a/package-manager");

        let err = installer
            .install(&request(temp.path(), Duration::from_secs(1)))
            .unwrap_err();

        assert!(matches!(
            err,
            KilnError::Application(ApplicationError::InstallFailed { .. })
        ));
    }
}
