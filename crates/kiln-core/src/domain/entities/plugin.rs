//! Plugin metadata and its typestate builder.
//!
//! A [`PluginDescriptor`] is the static, immutable half of a plugin: identity,
//! category, supported frameworks and cross-references to other plugins.
//! Behaviour (detect / install / configure / rollback) is attached by the
//! application layer's `Plugin` trait; the domain only ever sees this data.
//!
//! # Typestate builder
//!
//! `PluginDescriptor::builder()` starts in the `Unnamed` state. Only
//! `named(..)` moves it to `Named`, where the remaining fields and `build()`
//! become available, so a descriptor without identity cannot be constructed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::domain::{
    error::DomainError,
    value_objects::{Bundler, Category, Framework},
};

// ── Descriptor ────────────────────────────────────────────────────────────────

/// Immutable plugin metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    /// Package-style identifier, e.g. `react-router-dom`.
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub category: Category,
    /// Frameworks this plugin supports. Ordered for deterministic rule output.
    pub frameworks: BTreeSet<Framework>,
    pub version: String,
    #[serde(default)]
    pub incompatible_with: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub recommends: Vec<String>,
    #[serde(default)]
    pub requires_typescript: bool,
    /// When set, the plugin only works with these bundlers.
    #[serde(default)]
    pub bundlers: Vec<Bundler>,
}

impl PluginDescriptor {
    /// Start building a new descriptor.
    pub fn builder() -> PluginDescriptorBuilder<Unnamed> {
        PluginDescriptorBuilder::new()
    }

    pub fn supports(&self, framework: Framework) -> bool {
        self.frameworks.contains(&framework)
    }

    /// Validate the descriptor's internal consistency.
    ///
    /// Called by the builder and again when a catalog is assembled, so
    /// descriptors deserialized from manifests get the same checks.
    pub fn validate(&self) -> Result<(), DomainError> {
        let invalid = |reason: &str| DomainError::InvalidPlugin {
            plugin: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(DomainError::MissingRequiredField { field: "name" });
        }
        if self.display_name.trim().is_empty() {
            return Err(invalid("missing field 'displayName'"));
        }
        if self.description.trim().is_empty() {
            return Err(invalid("missing field 'description'"));
        }
        if self.frameworks.is_empty() {
            return Err(invalid("'frameworks' must be a non-empty list"));
        }

        let lists = [
            ("incompatibleWith", &self.incompatible_with),
            ("requires", &self.requires),
            ("recommends", &self.recommends),
        ];
        for (field, names) in lists {
            if names.iter().any(|n| n == &self.name) {
                return Err(invalid(&format!("'{field}' references the plugin itself")));
            }
        }

        Ok(())
    }
}

impl fmt::Display for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.name)
    }
}

// ── Typestate markers ─────────────────────────────────────────────────────────

/// Marker: `named(..)` has not been called yet.
pub struct Unnamed;
/// Marker: identity is set; the descriptor can be built.
pub struct Named;

// ── Builder ───────────────────────────────────────────────────────────────────

/// Typestate builder for [`PluginDescriptor`].
pub struct PluginDescriptorBuilder<S> {
    name: String,
    display_name: String,
    description: String,
    category: Option<Category>,
    frameworks: BTreeSet<Framework>,
    version: String,
    incompatible_with: Vec<String>,
    requires: Vec<String>,
    recommends: Vec<String>,
    requires_typescript: bool,
    bundlers: Vec<Bundler>,
    _marker: PhantomData<S>,
}

impl PluginDescriptorBuilder<Unnamed> {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            display_name: String::new(),
            description: String::new(),
            category: None,
            frameworks: BTreeSet::new(),
            version: "latest".into(),
            incompatible_with: Vec::new(),
            requires: Vec::new(),
            recommends: Vec::new(),
            requires_typescript: false,
            bundlers: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Set identity. Transitions the builder to `Named`.
    pub fn named(
        self,
        name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> PluginDescriptorBuilder<Named> {
        PluginDescriptorBuilder {
            name: name.into(),
            display_name: display_name.into(),
            description: description.into(),
            category: self.category,
            frameworks: self.frameworks,
            version: self.version,
            incompatible_with: self.incompatible_with,
            requires: self.requires,
            recommends: self.recommends,
            requires_typescript: self.requires_typescript,
            bundlers: self.bundlers,
            _marker: PhantomData,
        }
    }
}

impl Default for PluginDescriptorBuilder<Unnamed> {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginDescriptorBuilder<Named> {
    pub fn in_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn for_frameworks(mut self, frameworks: impl IntoIterator<Item = Framework>) -> Self {
        self.frameworks.extend(frameworks);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn incompatible_with<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.incompatible_with.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn recommends<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recommends.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn requires_typescript(mut self) -> Self {
        self.requires_typescript = true;
        self
    }

    pub fn for_bundlers(mut self, bundlers: impl IntoIterator<Item = Bundler>) -> Self {
        self.bundlers.extend(bundlers);
        self
    }

    /// Build and validate the descriptor.
    pub fn build(self) -> Result<PluginDescriptor, DomainError> {
        let category = self
            .category
            .ok_or(DomainError::MissingRequiredField { field: "category" })?;

        let descriptor = PluginDescriptor {
            name: self.name,
            display_name: self.display_name,
            description: self.description,
            category,
            frameworks: self.frameworks,
            version: self.version,
            incompatible_with: self.incompatible_with,
            requires: self.requires,
            recommends: self.recommends,
            requires_typescript: self.requires_typescript,
            bundlers: self.bundlers,
        };

        descriptor.validate()?;
        Ok(descriptor)
    }
}

// ── Packages ──────────────────────────────────────────────────────────────────

/// Packages a plugin installs, split like `package.json`.
///
/// Values are version specs (`^5.0.0`, `latest`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSet {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dependency(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), version.into());
        self
    }

    pub fn dev_dependency(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.dev_dependencies.insert(name.into(), version.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.dev_dependencies.is_empty()
    }

    /// `name@version` specs for one of the two groups.
    pub fn specs(&self, dev: bool) -> Vec<String> {
        let group = if dev {
            &self.dev_dependencies
        } else {
            &self.dependencies
        };
        group
            .iter()
            .map(|(name, version)| {
                if version.is_empty() {
                    name.clone()
                } else {
                    format!("{name}@{version}")
                }
            })
            .collect()
    }

    /// Fold another set into this one. Later versions win.
    pub fn merge(&mut self, other: &PackageSet) {
        self.dependencies
            .extend(other.dependencies.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.dev_dependencies
            .extend(other.dev_dependencies.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zustand() -> PluginDescriptorBuilder<Named> {
        PluginDescriptor::builder()
            .named("zustand", "Zustand", "Small state management")
            .in_category(Category::State)
            .for_frameworks([Framework::React, Framework::NextJs])
    }

    #[test]
    fn builder_produces_valid_descriptor() {
        let d = zustand().with_version("^5.0.0").build().unwrap();
        assert_eq!(d.name, "zustand");
        assert_eq!(d.category, Category::State);
        assert!(d.supports(Framework::React));
        assert!(!d.supports(Framework::Vue));
    }

    #[test]
    fn builder_requires_category() {
        let result = PluginDescriptor::builder()
            .named("x", "X", "desc")
            .for_frameworks([Framework::React])
            .build();
        assert_eq!(
            result.unwrap_err(),
            DomainError::MissingRequiredField { field: "category" }
        );
    }

    #[test]
    fn builder_rejects_empty_frameworks() {
        let result = PluginDescriptor::builder()
            .named("x", "X", "desc")
            .in_category(Category::Utils)
            .build();
        assert!(matches!(result, Err(DomainError::InvalidPlugin { .. })));
    }

    #[test]
    fn builder_rejects_self_reference() {
        let result = zustand().incompatible_with(["zustand"]).build();
        assert!(matches!(result, Err(DomainError::InvalidPlugin { .. })));
    }

    #[test]
    fn builder_rejects_blank_description() {
        let result = PluginDescriptor::builder()
            .named("x", "X", "  ")
            .in_category(Category::Utils)
            .for_frameworks([Framework::Vue])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn descriptor_serializes_camel_case() {
        let d = zustand().incompatible_with(["jotai"]).build().unwrap();
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["displayName"], "Zustand");
        assert_eq!(json["incompatibleWith"][0], "jotai");
    }

    #[test]
    fn package_specs_render_versions() {
        let set = PackageSet::new()
            .dependency("axios", "^1.7.0")
            .dev_dependency("vitest", "")
            .dependency("zod", "^3.23.0");
        assert_eq!(set.specs(false), vec!["axios@^1.7.0", "zod@^3.23.0"]);
        assert_eq!(set.specs(true), vec!["vitest"]);
    }

    #[test]
    fn package_merge_later_wins() {
        let mut a = PackageSet::new().dependency("axios", "1");
        a.merge(&PackageSet::new().dependency("axios", "2").dev_dependency("msw", "2"));
        assert_eq!(a.dependencies["axios"], "2");
        assert!(!a.is_empty());
        assert_eq!(a.dev_dependencies.len(), 1);
    }
}
