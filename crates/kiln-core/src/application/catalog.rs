//! The plugin catalog: an ordered, validated collection of plugins.
//!
//! Construction checks every descriptor and excludes malformed or duplicate
//! entries with a warning instead of failing the whole load. Compatibility
//! rules are generated once, when the catalog is built.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::ports::Plugin;
use crate::domain::{
    Category, DomainError, Framework, PluginDescriptor, ProjectContext, RuleGenerator, RuleSet,
};

pub struct Catalog {
    plugins: Vec<Arc<dyn Plugin>>,
    rejected: Vec<DomainError>,
    rules: RuleSet,
}

impl Catalog {
    pub fn new(plugins: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Self {
        let mut accepted: Vec<Arc<dyn Plugin>> = Vec::new();
        let mut rejected = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for plugin in plugins {
            let descriptor = plugin.descriptor();
            if let Err(e) = descriptor.validate() {
                warn!(plugin = %descriptor.name, error = %e, "Invalid plugin excluded from catalog");
                rejected.push(e);
                continue;
            }
            if !seen.insert(descriptor.name.clone()) {
                let e = DomainError::DuplicatePlugin {
                    name: descriptor.name.clone(),
                };
                warn!(error = %e, "Duplicate plugin excluded from catalog");
                rejected.push(e);
                continue;
            }
            accepted.push(plugin);
        }

        let descriptors: Vec<PluginDescriptor> =
            accepted.iter().map(|p| p.descriptor().clone()).collect();
        let rules = RuleGenerator::analyze(&descriptors);
        for diagnostic in &rules.diagnostics {
            warn!(
                plugin = %diagnostic.plugin,
                field = %diagnostic.field,
                missing = %diagnostic.missing,
                "Dangling plugin reference skipped"
            );
        }
        debug!(
            plugins = accepted.len(),
            rules = rules.len(),
            "Catalog loaded"
        );

        Self {
            plugins: accepted,
            rejected,
            rules,
        }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.iter()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.iter().map(|p| p.descriptor())
    }

    /// Entries excluded during construction.
    pub fn rejected(&self) -> &[DomainError] {
        &self.rejected
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.descriptor().name == name)
    }

    /// Resolve names to plugins, preserving order.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<dyn Plugin>>, DomainError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name)
                    .cloned()
                    .ok_or_else(|| DomainError::UnknownPlugin { name: name.into() })
            })
            .collect()
    }

    pub fn by_category(&self, category: Category) -> Vec<&PluginDescriptor> {
        self.descriptors().filter(|d| d.category == category).collect()
    }

    pub fn by_framework(&self, framework: Framework) -> Vec<&PluginDescriptor> {
        self.descriptors().filter(|d| d.supports(framework)).collect()
    }

    /// Plugins that fit the project: framework, TypeScript and bundler.
    pub fn compatible_with(&self, ctx: &ProjectContext) -> Vec<&PluginDescriptor> {
        self.descriptors().filter(|d| fits(d, ctx)).collect()
    }

    /// Plugins that fit the project and do not conflict with `plugin`.
    pub fn compatible_with_plugin(
        &self,
        plugin: &PluginDescriptor,
        ctx: &ProjectContext,
    ) -> Vec<&PluginDescriptor> {
        self.descriptors()
            .filter(|d| d.name != plugin.name)
            .filter(|d| !plugin.incompatible_with.contains(&d.name))
            .filter(|d| !d.incompatible_with.contains(&plugin.name))
            .filter(|d| fits(d, ctx))
            .collect()
    }

    /// Case-insensitive search over name, display name, description and category.
    pub fn search(&self, query: &str) -> Vec<&PluginDescriptor> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.descriptors().collect();
        }
        self.descriptors()
            .filter(|d| {
                d.name.to_lowercase().contains(&needle)
                    || d.display_name.to_lowercase().contains(&needle)
                    || d.description.to_lowercase().contains(&needle)
                    || d.category.as_str().contains(&needle)
            })
            .collect()
    }

    /// Plugins whose `detect` reports them as already present.
    pub fn installed(&self, ctx: &ProjectContext) -> Vec<&PluginDescriptor> {
        self.plugins
            .iter()
            .filter(|p| p.detect(p.descriptor(), ctx))
            .map(|p| p.descriptor())
            .collect()
    }
}

fn fits(d: &PluginDescriptor, ctx: &ProjectContext) -> bool {
    if !d.supports(ctx.framework) {
        return false;
    }
    if d.requires_typescript && !ctx.typescript {
        return false;
    }
    match ctx.bundler {
        Some(b) if !d.bundlers.is_empty() => d.bundlers.contains(&b),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ConfigureOutcome, InstallOutcome, LifecycleEnv};
    use crate::domain::{Bundler, PackageSet};
    use crate::error::KilnResult;

    struct Fixed(PluginDescriptor);

    impl Plugin for Fixed {
        fn descriptor(&self) -> &PluginDescriptor {
            &self.0
        }
        fn install(&self, _env: &mut LifecycleEnv<'_>) -> KilnResult<InstallOutcome> {
            Ok(InstallOutcome::packages(PackageSet::new()))
        }
        fn configure(&self, _env: &mut LifecycleEnv<'_>) -> KilnResult<ConfigureOutcome> {
            Ok(ConfigureOutcome::done())
        }
    }

    fn entry(d: PluginDescriptor) -> Arc<dyn Plugin> {
        Arc::new(Fixed(d))
    }

    fn desc(name: &str, category: Category, frameworks: &[Framework]) -> PluginDescriptor {
        PluginDescriptor::builder()
            .named(name, name.to_uppercase(), format!("{name} for apps"))
            .in_category(category)
            .for_frameworks(frameworks.iter().copied())
            .build()
            .unwrap()
    }

    fn catalog() -> Catalog {
        let mut emotion = desc("emotion", Category::Ui, &[Framework::React]);
        emotion.incompatible_with = vec!["styled-components".into()];
        let mut vite_only = desc("vite-pwa", Category::Tooling, &[Framework::React]);
        vite_only.bundlers = vec![Bundler::Vite];

        Catalog::new([
            entry(desc("zustand", Category::State, &[Framework::React])),
            entry(desc("pinia", Category::State, &[Framework::Vue])),
            entry(emotion),
            entry(desc("styled-components", Category::Ui, &[Framework::React])),
            entry(vite_only),
        ])
    }

    #[test]
    fn invalid_and_duplicate_entries_are_excluded() {
        let mut broken = desc("broken", Category::Utils, &[Framework::React]);
        broken.frameworks.clear();

        let c = Catalog::new([
            entry(desc("axios", Category::Http, &[Framework::React])),
            entry(desc("axios", Category::Http, &[Framework::Vue])),
            entry(broken),
        ]);

        assert_eq!(c.len(), 1);
        assert_eq!(c.rejected().len(), 2);
        assert!(c.get("axios").unwrap().descriptor().supports(Framework::React));
    }

    #[test]
    fn resolve_reports_unknown_names() {
        let c = catalog();
        assert_eq!(c.resolve(&["pinia", "zustand"]).unwrap().len(), 2);
        assert_eq!(
            c.resolve(&["ghost"]).err(),
            Some(DomainError::UnknownPlugin {
                name: "ghost".into()
            })
        );
    }

    #[test]
    fn filters_by_category_and_framework() {
        let c = catalog();
        assert_eq!(c.by_category(Category::State).len(), 2);
        assert_eq!(c.by_framework(Framework::Vue).len(), 1);
    }

    #[test]
    fn compatibility_filters() {
        let c = catalog();
        let ctx = ProjectContext::builder(Framework::React, "/app")
            .bundler(Bundler::Webpack)
            .build()
            .unwrap();

        let names: Vec<_> = c.compatible_with(&ctx).iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["zustand", "emotion", "styled-components"]);

        let emotion = c.get("emotion").unwrap().descriptor().clone();
        let names: Vec<_> = c
            .compatible_with_plugin(&emotion, &ctx)
            .iter()
            .map(|d| d.name.clone())
            .collect();
        assert_eq!(names, vec!["zustand"]);
    }

    #[test]
    fn search_is_case_insensitive() {
        let c = catalog();
        assert_eq!(c.search("ZUST").len(), 1);
        assert_eq!(c.search("state").len(), 2);
        assert_eq!(c.search("").len(), c.len());
    }

    #[test]
    fn installed_uses_detect() {
        let c = catalog();
        let ctx = ProjectContext::builder(Framework::React, "/app")
            .dependency("zustand", "^5.0.0")
            .build()
            .unwrap();
        let names: Vec<_> = c.installed(&ctx).iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["zustand"]);
    }

    #[test]
    fn rules_are_generated_once() {
        let c = catalog();
        // State exclusivity plus one emotion/styled-components conflict.
        assert_eq!(c.rules().len(), 2);
    }
}
