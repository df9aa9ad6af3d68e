//! Project context detection.
//!
//! Reads `package.json` and a handful of marker files to build the
//! [`ProjectContext`] the validator and plugins work against.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument};

use kiln_core::{
    application::{ApplicationError, ports::Filesystem},
    domain::{Bundler, Framework, PackageManager, ProjectContext},
    error::{KilnError, KilnResult},
};

/// Most specific first: a Next.js app also depends on React.
const FRAMEWORK_PRIORITY: [Framework; 8] = [
    Framework::NextJs,
    Framework::Nuxt,
    Framework::Angular,
    Framework::Svelte,
    Framework::Solid,
    Framework::Preact,
    Framework::Vue,
    Framework::React,
];

const BUNDLER_CONFIGS: &[(&str, Bundler)] = &[
    ("vite.config.ts", Bundler::Vite),
    ("vite.config.js", Bundler::Vite),
    ("vite.config.mts", Bundler::Vite),
    ("vite.config.mjs", Bundler::Vite),
    ("angular.json", Bundler::AngularCli),
    ("rspack.config.ts", Bundler::Rspack),
    ("rspack.config.js", Bundler::Rspack),
    ("webpack.config.ts", Bundler::Webpack),
    ("webpack.config.js", Bundler::Webpack),
    (".parcelrc", Bundler::Parcel),
];

const BUNDLER_PACKAGES: &[(&str, Bundler)] = &[
    ("vite", Bundler::Vite),
    ("@angular-devkit/build-angular", Bundler::AngularCli),
    ("@rspack/core", Bundler::Rspack),
    ("webpack", Bundler::Webpack),
    ("parcel", Bundler::Parcel),
];

const LOCKFILES: &[(&str, PackageManager)] = &[
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("yarn.lock", PackageManager::Yarn),
    ("bun.lockb", PackageManager::Bun),
    ("bun.lock", PackageManager::Bun),
    ("package-lock.json", PackageManager::Npm),
];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    name: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
    package_manager: Option<String>,
}

impl PackageJson {
    fn version_of(&self, package: &str) -> Option<&str> {
        self.dependencies
            .get(package)
            .or_else(|| self.dev_dependencies.get(package))
            .map(String::as_str)
    }
}

/// Builds a [`ProjectContext`] from what is on disk.
pub struct ProjectDetector {
    fs: Arc<dyn Filesystem>,
}

impl ProjectDetector {
    pub fn new(fs: Arc<dyn Filesystem>) -> Self {
        Self { fs }
    }

    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn detect(&self, root: &Path) -> KilnResult<ProjectContext> {
        let root = absolute(root)?;
        let manifest_path = root.join("package.json");

        let raw = self.fs.read_to_string(&manifest_path).map_err(|e| match e {
            KilnError::Application(ApplicationError::FileNotFound { .. }) => {
                failed(&root, "no package.json found; run kiln inside a JavaScript project")
            }
            other => other,
        })?;
        let manifest: PackageJson = serde_json::from_str(&raw)
            .map_err(|e| failed(&root, format!("package.json is not valid JSON: {e}")))?;

        let framework = FRAMEWORK_PRIORITY
            .into_iter()
            .find(|fw| manifest.version_of(fw.package()).is_some())
            .ok_or_else(|| failed(&root, "no supported framework found in dependencies"))?;

        let bundler = self.bundler(&root, &manifest);
        let package_manager = self.package_manager(&root, &manifest);
        let typescript =
            self.fs.exists(&root.join("tsconfig.json")) || manifest.version_of("typescript").is_some();

        debug!(
            %framework,
            bundler = ?bundler,
            %package_manager,
            typescript,
            "Project detected"
        );

        let mut builder = ProjectContext::builder(framework, root.clone())
            .package_manager(package_manager)
            .typescript(typescript);
        if let Some(version) = manifest.version_of(framework.package()) {
            builder = builder.framework_version(clean_version(version));
        }
        if let Some(bundler) = bundler {
            builder = builder.bundler(bundler);
        }
        if let Some(name) = &manifest.name {
            builder = builder.project_name(name.clone());
        }
        for (name, version) in &manifest.dependencies {
            builder = builder.dependency(name.clone(), version.clone());
        }
        for (name, version) in &manifest.dev_dependencies {
            builder = builder.dev_dependency(name.clone(), version.clone());
        }

        Ok(builder.build()?)
    }

    fn bundler(&self, root: &Path, manifest: &PackageJson) -> Option<Bundler> {
        BUNDLER_CONFIGS
            .iter()
            .find(|(file, _)| self.fs.exists(&root.join(file)))
            .or_else(|| {
                BUNDLER_PACKAGES
                    .iter()
                    .find(|(package, _)| manifest.version_of(package).is_some())
            })
            .map(|(_, bundler)| *bundler)
    }

    fn package_manager(&self, root: &Path, manifest: &PackageJson) -> PackageManager {
        if let Some((_, pm)) = LOCKFILES
            .iter()
            .find(|(file, _)| self.fs.exists(&root.join(file)))
        {
            return *pm;
        }
        manifest
            .package_manager
            .as_deref()
            .and_then(|field| field.split('@').next())
            .and_then(|name| name.parse().ok())
            .unwrap_or_default()
    }
}

fn absolute(root: &Path) -> KilnResult<PathBuf> {
    std::path::absolute(root).map_err(|e| failed(root, e.to_string()))
}

fn failed(root: &Path, reason: impl Into<String>) -> KilnError {
    ApplicationError::DetectionFailed {
        path: root.to_path_buf(),
        reason: reason.into(),
    }
    .into()
}

/// `^18.2.0` → `18.2.0`
fn clean_version(spec: &str) -> String {
    spec.trim_start_matches(|c: char| matches!(c, '^' | '~' | '=' | '>' | '<' | 'v' | ' '))
        .to_string()
}
