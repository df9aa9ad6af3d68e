//! Compatibility Service - checks a selection against the catalog's rules.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::catalog::Catalog;
use crate::domain::{
    CompatibilityRule, CompatibilityValidator, Framework, PluginDescriptor, ProjectContext,
    ValidationResult, ViolationKey,
};
use crate::error::KilnResult;

pub struct CompatibilityService {
    catalog: Arc<Catalog>,
}

impl CompatibilityService {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Every generated rule, in generation order.
    pub fn rules(&self) -> &[CompatibilityRule] {
        &self.catalog.rules().rules
    }

    /// Rules that apply to `framework`.
    pub fn rules_for(&self, framework: Framework) -> Vec<&CompatibilityRule> {
        self.catalog.rules().for_framework(framework)
    }

    /// Validate plugins named by the user.
    ///
    /// Unknown names are an error rather than a violation.
    #[instrument(skip_all, fields(selected = names.len(), framework = %ctx.framework))]
    pub fn check<S: AsRef<str>>(
        &self,
        names: &[S],
        ctx: &ProjectContext,
        accepted: &BTreeSet<ViolationKey>,
    ) -> KilnResult<ValidationResult> {
        let plugins = self.catalog.resolve(names)?;
        let selected: Vec<&PluginDescriptor> = plugins.iter().map(|p| p.descriptor()).collect();
        let result =
            CompatibilityValidator::validate_with_overrides(&selected, ctx, self.rules(), accepted);
        debug!(
            valid = result.valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Selection checked"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ConfigureOutcome, InstallOutcome, LifecycleEnv, Plugin};
    use crate::domain::{Category, DomainError, PackageSet, ViolationKind};
    use crate::error::KilnError;

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

    fn service() -> CompatibilityService {
        let plugin = |name: &str, category| -> Arc<dyn Plugin> {
            Arc::new(Fixed(
                PluginDescriptor::builder()
                    .named(name, name, "test plugin")
                    .in_category(category)
                    .for_frameworks([Framework::React, Framework::Vue])
                    .build()
                    .unwrap(),
            ))
        };
        CompatibilityService::new(Arc::new(Catalog::new([
            plugin("tailwindcss", Category::Css),
            plugin("unocss", Category::Css),
            plugin("axios", Category::Http),
        ])))
    }

    fn ctx() -> ProjectContext {
        ProjectContext::builder(Framework::React, "/app").build().unwrap()
    }

    #[test]
    fn css_overlap_warns_and_can_be_accepted() {
        let svc = service();
        let result = svc
            .check(&["tailwindcss", "unocss"], &ctx(), &BTreeSet::new())
            .unwrap();
        assert!(result.valid);
        assert_eq!(result.warnings[0].kind, ViolationKind::Exclusive);

        let accepted = BTreeSet::from([result.warnings[0].key()]);
        let result = svc.check(&["unocss", "tailwindcss"], &ctx(), &accepted).unwrap();
        assert!(result.warnings.is_empty());
        assert_eq!(result.overridden.len(), 1);
    }

    #[test]
    fn unknown_names_are_errors() {
        let err = service()
            .check(&["axios", "left-pad"], &ctx(), &BTreeSet::new())
            .unwrap_err();
        assert!(matches!(
            err,
            KilnError::Domain(DomainError::UnknownPlugin { ref name }) if name == "left-pad"
        ));
    }

    #[test]
    fn rules_filter_by_framework() {
        let svc = service();
        assert_eq!(svc.rules().len(), 1);
        assert_eq!(svc.rules_for(Framework::Vue).len(), 1);
    }
}
