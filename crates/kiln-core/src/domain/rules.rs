//! Compatibility rule generation.
//!
//! Rules are derived from plugin metadata once per catalog and are plain data.
//! Generation is pure and deterministic: the same catalog always yields the
//! same rules in the same order (EXCLUSIVE by category order, then CONFLICT,
//! REQUIRES and RECOMMENDS in catalog order).
//!
//! Cross-references naming plugins that are not in the catalog never fail
//! generation. They are returned as [`RuleDiagnostic`]s for the caller to log.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{
    entities::PluginDescriptor,
    value_objects::{Category, Framework, Severity},
};

// ── Rule ──────────────────────────────────────────────────────────────────────

/// A declarative constraint between plugins.
///
/// Serialized as `{"type": "EXCLUSIVE" | "CONFLICT" | "REQUIRES" | "RECOMMENDS", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE", rename_all_fields = "camelCase")]
pub enum CompatibilityRule {
    /// At most one of `plugins` may be selected.
    Exclusive {
        category: Category,
        plugins: Vec<String>,
        reason: String,
        severity: Severity,
        allow_override: bool,
    },
    /// The two plugins may not be selected together. Symmetric.
    Conflict {
        plugins: [String; 2],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        framework: Option<Framework>,
        reason: String,
        severity: Severity,
        allow_override: bool,
    },
    /// Selecting `plugin` needs every name in `requires`.
    Requires {
        plugin: String,
        requires: Vec<String>,
        framework: Framework,
        reason: String,
        severity: Severity,
        allow_override: bool,
    },
    /// Advisory: `plugin` works well with `recommends`.
    Recommends {
        plugin: String,
        recommends: Vec<String>,
        framework: Framework,
        reason: String,
        severity: Severity,
        allow_override: bool,
    },
}

impl CompatibilityRule {
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Exclusive { .. } => "EXCLUSIVE",
            Self::Conflict { .. } => "CONFLICT",
            Self::Requires { .. } => "REQUIRES",
            Self::Recommends { .. } => "RECOMMENDS",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Exclusive { severity, .. }
            | Self::Conflict { severity, .. }
            | Self::Requires { severity, .. }
            | Self::Recommends { severity, .. } => *severity,
        }
    }

    pub fn allow_override(&self) -> bool {
        match self {
            Self::Exclusive { allow_override, .. }
            | Self::Conflict { allow_override, .. }
            | Self::Requires { allow_override, .. }
            | Self::Recommends { allow_override, .. } => *allow_override,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Exclusive { reason, .. }
            | Self::Conflict { reason, .. }
            | Self::Requires { reason, .. }
            | Self::Recommends { reason, .. } => reason,
        }
    }

    /// Framework scope. `None` means the rule applies to every framework.
    pub fn framework(&self) -> Option<Framework> {
        match self {
            Self::Exclusive { .. } => None,
            Self::Conflict { framework, .. } => *framework,
            Self::Requires { framework, .. } | Self::Recommends { framework, .. } => {
                Some(*framework)
            }
        }
    }

    pub fn applies_to(&self, framework: Framework) -> bool {
        self.framework().is_none_or(|fw| fw == framework)
    }

    /// Every plugin name this rule mentions.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            Self::Exclusive { plugins, .. } => plugins.iter().any(|p| p == name),
            Self::Conflict { plugins, .. } => plugins.iter().any(|p| p == name),
            Self::Requires {
                plugin, requires, ..
            } => plugin == name || requires.iter().any(|p| p == name),
            Self::Recommends {
                plugin, recommends, ..
            } => plugin == name || recommends.iter().any(|p| p == name),
        }
    }
}

impl fmt::Display for CompatibilityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclusive { plugins, .. } => write!(f, "EXCLUSIVE [{}]", plugins.join(", ")),
            Self::Conflict {
                plugins, framework, ..
            } => {
                write!(f, "CONFLICT {} <-> {}", plugins[0], plugins[1])?;
                if let Some(fw) = framework {
                    write!(f, " ({fw})")?;
                }
                Ok(())
            }
            Self::Requires {
                plugin,
                requires,
                framework,
                ..
            } => write!(f, "REQUIRES {plugin} -> [{}] ({framework})", requires.join(", ")),
            Self::Recommends {
                plugin,
                recommends,
                framework,
                ..
            } => write!(
                f,
                "RECOMMENDS {plugin} -> [{}] ({framework})",
                recommends.join(", ")
            ),
        }
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// A cross-reference to a plugin that is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDiagnostic {
    pub plugin: String,
    /// Which list held the reference: `incompatibleWith`, `requires` or `recommends`.
    pub field: String,
    pub missing: String,
}

impl fmt::Display for RuleDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "plugin '{}' lists unknown plugin '{}' in {}",
            self.plugin, self.missing, self.field
        )
    }
}

// ── Rule set ──────────────────────────────────────────────────────────────────

/// Generated rules plus the diagnostics produced while generating them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<CompatibilityRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<RuleDiagnostic>,
}

impl RuleSet {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompatibilityRule> {
        self.rules.iter()
    }

    /// Rules that apply to `framework`, including framework-agnostic ones.
    pub fn for_framework(&self, framework: Framework) -> Vec<&CompatibilityRule> {
        self.rules.iter().filter(|r| r.applies_to(framework)).collect()
    }

    /// Pretty JSON array of the rules.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.rules)
    }
}

// ── Generator ─────────────────────────────────────────────────────────────────

/// Derives [`CompatibilityRule`]s from plugin metadata.
pub struct RuleGenerator;

impl RuleGenerator {
    /// Generate the rules for a catalog.
    pub fn generate(plugins: &[PluginDescriptor]) -> Vec<CompatibilityRule> {
        Self::analyze(plugins).rules
    }

    /// Generate rules and collect dangling-reference diagnostics.
    pub fn analyze(plugins: &[PluginDescriptor]) -> RuleSet {
        let by_name: HashMap<&str, &PluginDescriptor> =
            plugins.iter().map(|p| (p.name.as_str(), p)).collect();

        let mut set = RuleSet::default();
        Self::exclusive_rules(plugins, &mut set);
        Self::conflict_rules(plugins, &by_name, &mut set);
        Self::requires_rules(plugins, &by_name, &mut set);
        Self::recommends_rules(plugins, &by_name, &mut set);
        set
    }

    fn exclusive_rules(plugins: &[PluginDescriptor], set: &mut RuleSet) {
        let mut groups: BTreeMap<Category, Vec<String>> = BTreeMap::new();
        for plugin in plugins {
            groups
                .entry(plugin.category)
                .or_default()
                .push(plugin.name.clone());
        }

        for category in Category::ALL {
            let Some((severity, allow_override)) = category.exclusivity() else {
                continue;
            };
            let Some(members) = groups.remove(&category) else {
                continue;
            };
            if members.len() < 2 {
                continue;
            }

            let reason = if allow_override {
                format!("Multiple {category} approaches can coexist but usually overlap; pick one")
            } else {
                format!("Only one {category} library can be used in a project")
            };

            set.rules.push(CompatibilityRule::Exclusive {
                category,
                plugins: members,
                reason,
                severity,
                allow_override,
            });
        }
    }

    fn conflict_rules(
        plugins: &[PluginDescriptor],
        by_name: &HashMap<&str, &PluginDescriptor>,
        set: &mut RuleSet,
    ) {
        let mut seen: BTreeSet<(String, String, Option<Framework>)> = BTreeSet::new();

        for plugin in plugins {
            for other_name in &plugin.incompatible_with {
                let Some(other) = by_name.get(other_name.as_str()) else {
                    set.diagnostics.push(RuleDiagnostic {
                        plugin: plugin.name.clone(),
                        field: "incompatibleWith".into(),
                        missing: other_name.clone(),
                    });
                    continue;
                };

                let both_css = plugin.category == Category::Css && other.category == Category::Css;
                let (severity, allow_override) = if both_css {
                    (Severity::Warning, true)
                } else {
                    (Severity::Error, false)
                };

                let pair = ordered_pair(&plugin.name, &other.name);
                let shared: Vec<Framework> = plugin
                    .frameworks
                    .intersection(&other.frameworks)
                    .copied()
                    .collect();

                let scopes: Vec<Option<Framework>> = if shared.is_empty() {
                    vec![None]
                } else {
                    shared.into_iter().map(Some).collect()
                };

                for framework in scopes {
                    if !seen.insert((pair.0.clone(), pair.1.clone(), framework)) {
                        continue;
                    }
                    set.rules.push(CompatibilityRule::Conflict {
                        plugins: [pair.0.clone(), pair.1.clone()],
                        framework,
                        reason: format!("{} and {} cannot be used together", pair.0, pair.1),
                        severity,
                        allow_override,
                    });
                }
            }
        }
    }

    fn requires_rules(
        plugins: &[PluginDescriptor],
        by_name: &HashMap<&str, &PluginDescriptor>,
        set: &mut RuleSet,
    ) {
        for plugin in plugins.iter().filter(|p| !p.requires.is_empty()) {
            note_dangling(plugin, "requires", &plugin.requires, by_name, set);
            for &framework in &plugin.frameworks {
                set.rules.push(CompatibilityRule::Requires {
                    plugin: plugin.name.clone(),
                    requires: plugin.requires.clone(),
                    framework,
                    reason: format!("{} depends on {}", plugin.name, plugin.requires.join(", ")),
                    severity: Severity::Error,
                    allow_override: false,
                });
            }
        }
    }

    fn recommends_rules(
        plugins: &[PluginDescriptor],
        by_name: &HashMap<&str, &PluginDescriptor>,
        set: &mut RuleSet,
    ) {
        for plugin in plugins.iter().filter(|p| !p.recommends.is_empty()) {
            note_dangling(plugin, "recommends", &plugin.recommends, by_name, set);
            for &framework in &plugin.frameworks {
                set.rules.push(CompatibilityRule::Recommends {
                    plugin: plugin.name.clone(),
                    recommends: plugin.recommends.clone(),
                    framework,
                    reason: format!(
                        "{} works well with {}",
                        plugin.name,
                        plugin.recommends.join(", ")
                    ),
                    severity: Severity::Info,
                    allow_override: true,
                });
            }
        }
    }
}

fn ordered_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

// REQUIRES/RECOMMENDS names may be satisfied by project dependencies, so the
// rule is still emitted; the reference is only reported.
fn note_dangling(
    plugin: &PluginDescriptor,
    field: &str,
    names: &[String],
    by_name: &HashMap<&str, &PluginDescriptor>,
    set: &mut RuleSet,
) {
    for name in names.iter().filter(|n| !by_name.contains_key(n.as_str())) {
        set.diagnostics.push(RuleDiagnostic {
            plugin: plugin.name.clone(),
            field: field.into(),
            missing: name.clone(),
        });
    }
}
