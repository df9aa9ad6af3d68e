//! Filesystem-based plugin loader.
//!
//! Discovers `*.toml` plugin manifests under a directory and turns each into
//! a [`DeclarativePlugin`], so teams can ship their own integrations without
//! rebuilding Kiln.
//!
//! # Manifest format
//!
//! ```toml
//! [plugin]
//! name         = "acme-ui"                 # unique identifier
//! display_name = "Acme UI"
//! description  = "Acme's component kit"
//! category     = "ui"                      # routing | state | http | css | ...
//! frameworks   = ["react", "nextjs"]
//! version      = "2.0.0"                   # optional
//! bundlers     = ["vite"]                  # optional
//! requires     = ["tailwindcss"]           # optional
//! recommends   = []                        # optional
//! incompatible_with   = ["@mui/material"]  # optional
//! requires_typescript = false              # optional
//! detected_by  = ["@acme/ui"]              # optional; defaults to the name
//!
//! [packages]
//! dependencies     = { "@acme/ui" = "^2.0.0" }
//! dev_dependencies = {}
//!
//! [[files]]
//! action  = "create"                       # create | append | insert-after
//! path    = "{{SRC_DIR}}/acme.{{EXT}}"     # | insert-before | ensure-line
//! content = "export * from '@acme/ui'\n"
//! ```

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use kiln_core::{
    application::ports::Plugin,
    domain::{Bundler, Category, DomainError, Framework, PackageSet, PluginDescriptor},
};

use crate::plugins::{DeclarativePlugin, FileAction};

// ── Manifest types ────────────────────────────────────────────────────────────

/// Deserialised representation of a plugin manifest.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PluginManifest {
    pub plugin: PluginSection,
    #[serde(default)]
    pub packages: PackagesSection,
    #[serde(default)]
    pub files: Vec<FileAction>,
}

/// `[plugin]` section.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PluginSection {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    pub frameworks: Vec<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub bundlers: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub recommends: Vec<String>,
    #[serde(default)]
    pub incompatible_with: Vec<String>,
    #[serde(default)]
    pub requires_typescript: bool,
    #[serde(default)]
    pub detected_by: Vec<String>,
}

/// `[packages]` section.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PackagesSection {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PluginManifest {
    /// Parse manifest text. `origin` only labels errors.
    pub fn parse(raw: &str, origin: &str) -> Result<Self, DomainError> {
        toml::from_str(raw).map_err(|e| invalid(origin, format!("failed to parse manifest: {e}")))
    }

    /// Validate the manifest and build the plugin it describes.
    pub fn into_plugin(self) -> Result<DeclarativePlugin, DomainError> {
        let section = self.plugin;
        let name = section.name.clone();

        let category: Category = section.category.parse()?;
        let frameworks = section
            .frameworks
            .iter()
            .map(|f| f.parse::<Framework>())
            .collect::<Result<Vec<_>, _>>()?;
        let bundlers = section
            .bundlers
            .iter()
            .map(|b| b.parse::<Bundler>())
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = PluginDescriptor::builder()
            .named(&section.name, &section.display_name, &section.description)
            .in_category(category)
            .for_frameworks(frameworks)
            .requires(section.requires)
            .recommends(section.recommends)
            .incompatible_with(section.incompatible_with);
        if let Some(version) = section.version {
            builder = builder.with_version(version);
        }
        if !bundlers.is_empty() {
            builder = builder.for_bundlers(bundlers);
        }
        if section.requires_typescript {
            builder = builder.requires_typescript();
        }
        let descriptor = builder.build()?;

        let packages = self
            .packages
            .dependencies
            .into_iter()
            .fold(PackageSet::new(), |set, (pkg, v)| set.dependency(pkg, v));
        let packages = self
            .packages
            .dev_dependencies
            .into_iter()
            .fold(packages, |set, (pkg, v)| set.dev_dependency(pkg, v));

        for action in &self.files {
            if action.path().trim().is_empty() {
                return Err(invalid(&name, "file action with an empty path"));
            }
        }

        let mut plugin = DeclarativePlugin::new(descriptor)
            .packages(packages)
            .actions(self.files);
        if !section.detected_by.is_empty() {
            plugin = plugin.detected_by(section.detected_by);
        }
        Ok(plugin)
    }
}

// ── Loader ────────────────────────────────────────────────────────────────────

/// Loads [`DeclarativePlugin`]s from a directory of `*.toml` manifests.
///
/// Manifests may sit directly in the directory or one level down
/// (`plugins/acme-ui/plugin.toml`). A manifest that fails to parse or
/// validate emits a `WARN` log and is skipped.
pub struct PluginManifestLoader {
    plugins_dir: PathBuf,
}

impl PluginManifestLoader {
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Load every valid manifest, in file-name order.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidPlugin`] when the directory is missing
    /// or unreadable. Individual bad manifests never fail the batch.
    #[instrument(skip(self), fields(dir = %self.plugins_dir.display()))]
    pub fn load_all(&self) -> Result<Vec<DeclarativePlugin>, DomainError> {
        if !self.plugins_dir.is_dir() {
            return Err(invalid(
                &self.plugins_dir.display().to_string(),
                "plugins directory not found",
            ));
        }

        let mut plugins = Vec::new();
        for entry in WalkDir::new(&self.plugins_dir)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                invalid(
                    &self.plugins_dir.display().to_string(),
                    format!("failed to read directory entry: {e}"),
                )
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "toml") {
                continue;
            }

            match Self::load_file(path) {
                Ok(plugin) => {
                    debug!(
                        plugin = %plugin.descriptor().name,
                        path = %path.display(),
                        "loaded plugin manifest"
                    );
                    plugins.push(plugin);
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "skipping plugin manifest due to load error"
                    );
                }
            }
        }

        debug!(count = plugins.len(), "finished loading plugin manifests");
        Ok(plugins)
    }

    /// Load one manifest file.
    pub fn load_file(path: &Path) -> Result<DeclarativePlugin, DomainError> {
        let origin = path.display().to_string();
        let raw = fs::read_to_string(path)
            .map_err(|e| invalid(&origin, format!("failed to read manifest: {e}")))?;
        PluginManifest::parse(&raw, &origin)?.into_plugin()
    }
}

fn invalid(plugin: &str, reason: impl Into<String>) -> DomainError {
    DomainError::InvalidPlugin {
        plugin: plugin.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ACME: &str = r#"
[plugin]
name = "acme-ui"
display_name = "Acme UI"
description = "Acme's component kit"
category = "ui"
frameworks = ["react", "nextjs"]
version = "2.0.0"
requires = ["tailwindcss"]
detected_by = ["@acme/ui"]

[packages]
dependencies = { "@acme/ui" = "^2.0.0" }
dev_dependencies = { "@acme/ui-lint" = "^1.0.0" }

[[files]]
action = "create"
path = "{{SRC_DIR}}/acme.{{EXT}}"
content = "export * from '@acme/ui'\n"

[[files]]
action = "ensure-line"
path = ".npmrc"
line = "@acme:registry=https://npm.acme.dev"
"#;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn parses_a_full_manifest() {
        let plugin = PluginManifest::parse(ACME, "acme.toml")
            .unwrap()
            .into_plugin()
            .unwrap();

        let d = plugin.descriptor();
        assert_eq!(d.name, "acme-ui");
        assert_eq!(d.category, Category::Ui);
        assert!(d.supports(Framework::NextJs));
        assert_eq!(d.version, "2.0.0");
        assert_eq!(d.requires, vec!["tailwindcss".to_string()]);
        assert_eq!(plugin.package_set().specs(false), vec!["@acme/ui@^2.0.0"]);
        assert_eq!(plugin.package_set().specs(true), vec!["@acme/ui-lint@^1.0.0"]);
        assert_eq!(plugin.file_actions().len(), 2);
        assert_eq!(plugin.file_actions()[1].path(), ".npmrc");
    }

    #[test]
    fn bad_values_are_rejected() {
        let unknown_category = ACME.replace("category = \"ui\"", "category = \"widgets\"");
        assert!(
            PluginManifest::parse(&unknown_category, "x")
                .unwrap()
                .into_plugin()
                .is_err()
        );

        let unknown_framework = ACME.replace("\"nextjs\"", "\"ember\"");
        assert!(
            PluginManifest::parse(&unknown_framework, "x")
                .unwrap()
                .into_plugin()
                .is_err()
        );

        let typo = ACME.replace("display_name", "displayname");
        assert!(PluginManifest::parse(&typo, "x").is_err());
    }

    #[test]
    fn load_all_skips_bad_manifests() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "acme.toml", ACME);
        write(
            dir.path(),
            "nested/plugin.toml",
            &ACME.replace("acme-ui", "acme-icons"),
        );
        write(dir.path(), "broken.toml", "[plugin\nname=");
        write(dir.path(), "README.md", "not a manifest");

        let plugins = PluginManifestLoader::new(dir.path()).load_all().unwrap();
        let names: Vec<&str> = plugins.iter().map(|p| p.descriptor().name.as_str()).collect();

        assert_eq!(names, vec!["acme-ui", "acme-icons"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = PluginManifestLoader::new(dir.path().join("nope"))
            .load_all()
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidPlugin { .. }));
    }
}
