//! Compatibility validation.
//!
//! [`CompatibilityValidator::validate`] is a pure function of
//! `(selection, context, rules)`. It never waives a violation on its own;
//! accepting an overridable violation is the caller's decision, expressed by
//! re-validating through [`CompatibilityValidator::validate_with_overrides`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{
    entities::{PluginDescriptor, ProjectContext},
    error::DomainError,
    rules::CompatibilityRule,
    value_objects::{Framework, Severity},
};

// ── Violation ─────────────────────────────────────────────────────────────────

/// What kind of check produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ViolationKind {
    /// Plugin does not fit the detected project setup.
    Framework,
    Exclusive,
    Conflict,
    Requires,
}

impl ViolationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Framework => "framework",
            Self::Exclusive => "exclusive",
            Self::Conflict => "conflict",
            Self::Requires => "requires",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One breached rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    /// Plugins involved, in rule order.
    pub plugins: Vec<String>,
    /// Missing dependency names (REQUIRES only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,
    pub severity: Severity,
    pub allow_override: bool,
    pub message: String,
}

impl Violation {
    /// Stable identifier used to accept this violation on a re-run.
    pub fn key(&self) -> ViolationKey {
        let mut plugins = self.plugins.clone();
        plugins.sort();

        let mut key = format!("{}:{}", self.kind, plugins.join(","));
        if !self.missing.is_empty() {
            key.push_str("->");
            key.push_str(&self.missing.join(","));
        }
        if let Some(fw) = self.framework {
            key.push('@');
            key.push_str(fw.as_str());
        }
        ViolationKey(key)
    }

    pub fn involves(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p == name) || self.missing.iter().any(|m| m == name)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Textual key of a violation, e.g. `exclusive:jotai,zustand` or
/// `conflict:emotion,styled-components@react`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViolationKey(String);

impl ViolationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViolationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ViolationKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let known = ["framework:", "exclusive:", "conflict:", "requires:"];
        if !known.iter().any(|prefix| s.starts_with(prefix)) || s.ends_with(':') {
            return Err(DomainError::InvalidContext(format!(
                "'{s}' is not a violation key (expected <kind>:<plugins>)"
            )));
        }
        Ok(Self(s.to_string()))
    }
}

// ── Result ────────────────────────────────────────────────────────────────────

/// Outcome of validating a selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// True iff `errors` is empty.
    pub valid: bool,
    pub errors: Vec<Violation>,
    pub warnings: Vec<Violation>,
    pub suggestions: Vec<String>,
    /// Violations the caller accepted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overridden: Vec<Violation>,
}

impl ValidationResult {
    fn push(&mut self, violation: Violation) {
        match violation.severity {
            Severity::Error => self.errors.push(violation),
            Severity::Warning => self.warnings.push(violation),
            Severity::Info => self.suggest(violation.message),
        }
    }

    fn suggest(&mut self, suggestion: String) {
        if !self.suggestions.contains(&suggestion) {
            self.suggestions.push(suggestion);
        }
    }

    fn seal(mut self) -> Self {
        self.valid = self.errors.is_empty();
        self
    }

    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.errors.iter().chain(self.warnings.iter())
    }

    /// Blocking error messages joined on one line.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Validator ─────────────────────────────────────────────────────────────────

/// Evaluates a plugin selection against rules and the project context.
pub struct CompatibilityValidator;

impl CompatibilityValidator {
    /// Validate `selected` against `rules` for `ctx`.
    ///
    /// Output depends only on the set of selected names, not their order.
    pub fn validate(
        selected: &[&PluginDescriptor],
        ctx: &ProjectContext,
        rules: &[CompatibilityRule],
    ) -> ValidationResult {
        let mut ordered: Vec<&PluginDescriptor> = selected.to_vec();
        ordered.sort_by(|a, b| a.name.cmp(&b.name));
        ordered.dedup_by(|a, b| a.name == b.name);

        let mut result = ValidationResult::default();

        // Plugins that cannot run on this framework are reported once and
        // take no further part in rule evaluation.
        let names: BTreeSet<&str> = ordered
            .iter()
            .filter(|p| Self::check_environment(p, ctx, &mut result))
            .map(|p| p.name.as_str())
            .collect();
        let present = |name: &str| names.contains(name) || ctx.has_dependency(name);

        for rule in rules.iter().filter(|r| r.applies_to(ctx.framework)) {
            match rule {
                CompatibilityRule::Exclusive {
                    category,
                    plugins,
                    severity,
                    allow_override,
                    reason,
                } => {
                    let offending: Vec<String> = plugins
                        .iter()
                        .filter(|p| names.contains(p.as_str()))
                        .cloned()
                        .collect();
                    if offending.len() >= 2 {
                        result.push(Violation {
                            kind: ViolationKind::Exclusive,
                            message: format!(
                                "{} are all {category} plugins: {reason}",
                                offending.join(", ")
                            ),
                            plugins: offending,
                            missing: Vec::new(),
                            framework: None,
                            severity: *severity,
                            allow_override: *allow_override,
                        });
                    }
                }
                CompatibilityRule::Conflict {
                    plugins,
                    framework,
                    severity,
                    allow_override,
                    reason,
                } => {
                    if plugins.iter().all(|p| names.contains(p.as_str())) {
                        result.push(Violation {
                            kind: ViolationKind::Conflict,
                            plugins: plugins.to_vec(),
                            missing: Vec::new(),
                            framework: *framework,
                            severity: *severity,
                            allow_override: *allow_override,
                            message: reason.clone(),
                        });
                    }
                }
                CompatibilityRule::Requires {
                    plugin,
                    requires,
                    framework,
                    severity,
                    allow_override,
                    ..
                } => {
                    if !names.contains(plugin.as_str()) {
                        continue;
                    }
                    for dep in requires.iter().filter(|d| !present(d)) {
                        result.push(Violation {
                            kind: ViolationKind::Requires,
                            plugins: vec![plugin.clone()],
                            missing: vec![dep.clone()],
                            framework: Some(*framework),
                            severity: *severity,
                            allow_override: *allow_override,
                            message: format!(
                                "{plugin} requires {dep}, which is neither selected nor installed"
                            ),
                        });
                    }
                }
                CompatibilityRule::Recommends {
                    plugin, recommends, ..
                } => {
                    if !names.contains(plugin.as_str()) {
                        continue;
                    }
                    for rec in recommends.iter().filter(|r| !present(r)) {
                        result.suggest(format!("Consider adding {rec} alongside {plugin}"));
                    }
                }
            }
        }

        result.seal()
    }

    /// Validate, then drop violations the caller accepted.
    ///
    /// Only violations whose rule allows override are dropped; accepted keys
    /// for non-overridable violations are ignored.
    pub fn validate_with_overrides(
        selected: &[&PluginDescriptor],
        ctx: &ProjectContext,
        rules: &[CompatibilityRule],
        accepted: &BTreeSet<ViolationKey>,
    ) -> ValidationResult {
        let mut result = Self::validate(selected, ctx, rules);
        if accepted.is_empty() {
            return result;
        }

        let mut overridden = Vec::new();
        let mut keep = |list: Vec<Violation>| -> Vec<Violation> {
            list.into_iter()
                .filter_map(|v| {
                    if v.allow_override && accepted.contains(&v.key()) {
                        overridden.push(v);
                        None
                    } else {
                        Some(v)
                    }
                })
                .collect()
        };

        result.errors = keep(std::mem::take(&mut result.errors));
        result.warnings = keep(std::mem::take(&mut result.warnings));
        result.overridden = overridden;
        result.seal()
    }

    /// Returns false when the plugin does not support the project's framework.
    fn check_environment(
        plugin: &PluginDescriptor,
        ctx: &ProjectContext,
        result: &mut ValidationResult,
    ) -> bool {
        if !plugin.supports(ctx.framework) {
            let supported: Vec<&str> = plugin.frameworks.iter().map(|f| f.as_str()).collect();
            result.push(Violation {
                kind: ViolationKind::Framework,
                plugins: vec![plugin.name.clone()],
                missing: Vec::new(),
                framework: Some(ctx.framework),
                severity: Severity::Error,
                allow_override: false,
                message: format!(
                    "{} does not support {} (supports: {})",
                    plugin.name,
                    ctx.framework,
                    supported.join(", ")
                ),
            });
            return false;
        }

        if plugin.requires_typescript && !ctx.typescript {
            result.push(Violation {
                kind: ViolationKind::Framework,
                plugins: vec![plugin.name.clone()],
                missing: vec!["typescript".into()],
                framework: None,
                severity: Severity::Warning,
                allow_override: true,
                message: format!("{} expects a TypeScript project", plugin.name),
            });
        }

        if let Some(bundler) = ctx.bundler {
            if !plugin.bundlers.is_empty() && !plugin.bundlers.contains(&bundler) {
                result.push(Violation {
                    kind: ViolationKind::Framework,
                    plugins: vec![plugin.name.clone()],
                    missing: vec![bundler.as_str().into()],
                    framework: None,
                    severity: Severity::Warning,
                    allow_override: true,
                    message: format!("{} is not known to work with {bundler}", plugin.name),
                });
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        rules::RuleGenerator,
        value_objects::{Bundler, Category},
    };

    fn plugin(name: &str, category: Category, frameworks: &[Framework]) -> PluginDescriptor {
        PluginDescriptor::builder()
            .named(name, name, format!("{name} plugin"))
            .in_category(category)
            .for_frameworks(frameworks.iter().copied())
            .build()
            .unwrap()
    }

    fn ctx(framework: Framework) -> ProjectContext {
        ProjectContext::builder(framework, "/project").build().unwrap()
    }

    fn refs(plugins: &[PluginDescriptor]) -> Vec<&PluginDescriptor> {
        plugins.iter().collect()
    }

    #[test]
    fn plugin_for_other_framework_is_an_error() {
        let react_router = plugin("react-router-dom", Category::Routing, &[Framework::React]);
        let vue_router = plugin("vue-router", Category::Routing, &[Framework::Vue]);
        let catalog = vec![react_router.clone(), vue_router.clone()];
        let rules = RuleGenerator::generate(&catalog);

        let result = CompatibilityValidator::validate(
            &[&react_router, &vue_router],
            &ctx(Framework::Vue),
            &rules,
        );

        assert!(!result.valid);
        assert!(result.errors.iter().any(|v| v.involves("react-router-dom")));
        assert!(!result.violations().any(|v| v.involves("vue-router")));
    }

    #[test]
    fn two_state_plugins_violate_exclusivity() {
        let catalog = vec![
            plugin("zustand", Category::State, &[Framework::React]),
            plugin("jotai", Category::State, &[Framework::React]),
        ];
        let rules = RuleGenerator::generate(&catalog);

        let result = CompatibilityValidator::validate(&refs(&catalog), &ctx(Framework::React), &rules);

        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        let v = &result.errors[0];
        assert_eq!(v.kind, ViolationKind::Exclusive);
        assert_eq!(v.severity, Severity::Error);
        assert!(!v.allow_override);
    }

    #[test]
    fn two_css_plugins_only_warn() {
        let catalog = vec![
            plugin("tailwindcss", Category::Css, &[Framework::React]),
            plugin("bootstrap", Category::Css, &[Framework::React]),
        ];
        let rules = RuleGenerator::generate(&catalog);

        let result = CompatibilityValidator::validate(&refs(&catalog), &ctx(Framework::React), &rules);

        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, ViolationKind::Exclusive);
        assert_eq!(result.warnings[0].severity, Severity::Warning);
        assert!(result.warnings[0].allow_override);
    }

    #[test]
    fn missing_requirement_names_plugin_and_dependency() {
        let rtl = PluginDescriptor::builder()
            .named("testing-library", "Testing Library", "DOM testing")
            .in_category(Category::Testing)
            .for_frameworks([Framework::React])
            .requires(["vitest"])
            .build()
            .unwrap();
        let vitest = plugin("vitest", Category::Testing, &[Framework::React]);
        let rules = RuleGenerator::generate(&[rtl.clone(), vitest]);

        let result = CompatibilityValidator::validate(&[&rtl], &ctx(Framework::React), &rules);

        assert_eq!(result.errors.len(), 1);
        let v = &result.errors[0];
        assert_eq!(v.kind, ViolationKind::Requires);
        assert_eq!(v.plugins, vec!["testing-library"]);
        assert_eq!(v.missing, vec!["vitest"]);
    }

    #[test]
    fn requirement_satisfied_by_existing_dependency() {
        let rtl = PluginDescriptor::builder()
            .named("testing-library", "Testing Library", "DOM testing")
            .in_category(Category::Testing)
            .for_frameworks([Framework::React])
            .requires(["vitest"])
            .build()
            .unwrap();
        let rules = RuleGenerator::generate(std::slice::from_ref(&rtl));
        let context = ProjectContext::builder(Framework::React, "/project")
            .dev_dependency("vitest", "^2.0.0")
            .build()
            .unwrap();

        let result = CompatibilityValidator::validate(&[&rtl], &context, &rules);
        assert!(result.valid);
    }

    #[test]
    fn conflict_is_symmetric() {
        let a = PluginDescriptor::builder()
            .named("emotion", "Emotion", "CSS-in-JS")
            .in_category(Category::Ui)
            .for_frameworks([Framework::React])
            .incompatible_with(["styled-components"])
            .build()
            .unwrap();
        let b = plugin("styled-components", Category::Ui, &[Framework::React]);
        let rules = RuleGenerator::generate(&[a.clone(), b.clone()]);
        let context = ctx(Framework::React);

        let ab = CompatibilityValidator::validate(&[&a, &b], &context, &rules);
        let ba = CompatibilityValidator::validate(&[&b, &a], &context, &rules);

        assert_eq!(ab, ba);
        assert_eq!(ab.errors.len(), 1);
        assert_eq!(ab.errors[0].kind, ViolationKind::Conflict);
    }

    #[test]
    fn validation_is_deterministic() {
        let catalog = vec![
            plugin("zustand", Category::State, &[Framework::React]),
            plugin("jotai", Category::State, &[Framework::React]),
            plugin("pinia", Category::State, &[Framework::Vue]),
        ];
        let rules = RuleGenerator::generate(&catalog);
        let context = ctx(Framework::React);

        let first = CompatibilityValidator::validate(&refs(&catalog), &context, &rules);
        let second = CompatibilityValidator::validate(&refs(&catalog), &context, &rules);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn recommendations_are_suggestions_only() {
        let form = PluginDescriptor::builder()
            .named("react-hook-form", "React Hook Form", "Forms")
            .in_category(Category::Forms)
            .for_frameworks([Framework::React])
            .recommends(["zod"])
            .build()
            .unwrap();
        let rules = RuleGenerator::generate(std::slice::from_ref(&form));

        let result = CompatibilityValidator::validate(&[&form], &ctx(Framework::React), &rules);
        assert!(result.valid);
        assert!(result.warnings.is_empty());
        assert_eq!(result.suggestions, vec!["Consider adding zod alongside react-hook-form"]);
    }

    #[test]
    fn override_drops_only_overridable_violations() {
        let css = vec![
            plugin("tailwindcss", Category::Css, &[Framework::React]),
            plugin("bootstrap", Category::Css, &[Framework::React]),
            plugin("zustand", Category::State, &[Framework::React]),
            plugin("jotai", Category::State, &[Framework::React]),
        ];
        let rules = RuleGenerator::generate(&css);
        let context = ctx(Framework::React);

        let first = CompatibilityValidator::validate(&refs(&css), &context, &rules);
        let accepted: BTreeSet<ViolationKey> = first.violations().map(Violation::key).collect();

        let second =
            CompatibilityValidator::validate_with_overrides(&refs(&css), &context, &rules, &accepted);

        assert!(second.warnings.is_empty());
        assert_eq!(second.overridden.len(), 1);
        // State exclusivity cannot be overridden.
        assert_eq!(second.errors.len(), 1);
        assert!(!second.valid);
    }

    #[test]
    fn typescript_and_bundler_mismatch_warn() {
        let p = PluginDescriptor::builder()
            .named("typed-router", "Typed Router", "Typed routes")
            .in_category(Category::Routing)
            .for_frameworks([Framework::React])
            .requires_typescript()
            .for_bundlers([Bundler::Vite])
            .build()
            .unwrap();
        let context = ProjectContext::builder(Framework::React, "/project")
            .bundler(Bundler::Webpack)
            .build()
            .unwrap();

        let result = CompatibilityValidator::validate(&[&p], &context, &[]);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings.iter().all(|w| w.kind == ViolationKind::Framework));
    }

    #[test]
    fn violation_keys_parse_back() {
        let key: ViolationKey = "exclusive:bootstrap,tailwindcss".parse().unwrap();
        assert_eq!(key.as_str(), "exclusive:bootstrap,tailwindcss");
        assert!("nonsense".parse::<ViolationKey>().is_err());
        assert!("conflict:".parse::<ViolationKey>().is_err());
    }
}
