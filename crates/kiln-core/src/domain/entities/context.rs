use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{
    error::DomainError,
    value_objects::{Bundler, Framework, PackageManager},
};

/// Detected state of the target project.
///
/// Read-only input to validation and installation. Produced by a detector
/// adapter or assembled with [`ProjectContext::builder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    pub framework: Framework,
    pub framework_version: Option<String>,
    pub bundler: Option<Bundler>,
    pub package_manager: PackageManager,
    pub typescript: bool,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
    /// Absolute project root.
    pub project_root: PathBuf,
    /// `name` from package.json, falling back to the root directory name.
    pub project_name: String,
}

impl ProjectContext {
    pub fn builder(framework: Framework, project_root: impl Into<PathBuf>) -> ProjectContextBuilder {
        ProjectContextBuilder::new(framework, project_root)
    }

    /// True if `name` appears in either dependency map.
    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }

    pub fn root(&self) -> &Path {
        &self.project_root
    }

    /// Source directory relative to the root. Angular keeps code under
    /// `src/app`; every other supported framework uses `src`.
    pub fn src_dir(&self) -> &'static str {
        match self.framework {
            Framework::Angular => "src/app",
            Framework::NextJs => "app",
            _ => "src",
        }
    }

    /// Script extension for generated files.
    pub fn script_ext(&self) -> &'static str {
        if self.typescript { "ts" } else { "js" }
    }

    /// Component extension for generated files.
    pub fn component_ext(&self) -> &'static str {
        match (self.framework.uses_jsx(), self.typescript) {
            (true, true) => "tsx",
            (true, false) => "jsx",
            (false, true) => "ts",
            (false, false) => "js",
        }
    }
}

/// Builder for [`ProjectContext`].
#[derive(Debug, Clone)]
pub struct ProjectContextBuilder {
    ctx: ProjectContext,
}

impl ProjectContextBuilder {
    fn new(framework: Framework, project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let project_name = project_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".into());

        Self {
            ctx: ProjectContext {
                framework,
                framework_version: None,
                bundler: None,
                package_manager: PackageManager::default(),
                typescript: false,
                dependencies: BTreeMap::new(),
                dev_dependencies: BTreeMap::new(),
                project_root,
                project_name,
            },
        }
    }

    pub fn framework_version(mut self, version: impl Into<String>) -> Self {
        self.ctx.framework_version = Some(version.into());
        self
    }

    pub fn bundler(mut self, bundler: Bundler) -> Self {
        self.ctx.bundler = Some(bundler);
        self
    }

    pub fn package_manager(mut self, pm: PackageManager) -> Self {
        self.ctx.package_manager = pm;
        self
    }

    pub fn typescript(mut self, typescript: bool) -> Self {
        self.ctx.typescript = typescript;
        self
    }

    pub fn dependency(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.ctx.dependencies.insert(name.into(), version.into());
        self
    }

    pub fn dev_dependency(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.ctx.dev_dependencies.insert(name.into(), version.into());
        self
    }

    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.ctx.project_name = name.into();
        self
    }

    /// Build the context. The project root must be absolute.
    pub fn build(self) -> Result<ProjectContext, DomainError> {
        if !self.ctx.project_root.is_absolute() {
            return Err(DomainError::InvalidContext(format!(
                "project root must be absolute: {}",
                self.ctx.project_root.display()
            )));
        }
        Ok(self.ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_dependency_checks_both_maps() {
        let ctx = ProjectContext::builder(Framework::React, "/app")
            .dependency("react", "^18.3.0")
            .dev_dependency("vitest", "^2.0.0")
            .build()
            .unwrap();

        assert!(ctx.has_dependency("react"));
        assert!(ctx.has_dependency("vitest"));
        assert!(!ctx.has_dependency("vue"));
    }

    #[test]
    fn relative_root_is_rejected() {
        let result = ProjectContext::builder(Framework::Vue, "relative/app").build();
        assert!(matches!(result, Err(DomainError::InvalidContext(_))));
    }

    #[test]
    fn project_name_defaults_to_root_dir() {
        let ctx = ProjectContext::builder(Framework::Svelte, "/work/my-site")
            .build()
            .unwrap();
        assert_eq!(ctx.project_name, "my-site");
    }

    #[test]
    fn extensions_follow_framework_and_typescript() {
        let react_ts = ProjectContext::builder(Framework::React, "/a")
            .typescript(true)
            .build()
            .unwrap();
        assert_eq!(react_ts.component_ext(), "tsx");
        assert_eq!(react_ts.script_ext(), "ts");

        let vue_js = ProjectContext::builder(Framework::Vue, "/a").build().unwrap();
        assert_eq!(vue_js.component_ext(), "js");
        assert_eq!(vue_js.src_dir(), "src");
    }
}
