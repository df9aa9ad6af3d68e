//! `kiln rules` - print the rules generated from the catalog.

use kiln_core::domain::{CompatibilityRule, DomainError, Severity};

use crate::{
    cli::RulesArgs,
    commands::load_catalog,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(args: RulesArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let catalog = load_catalog(&config)?;

    if let Some(plugin) = args.plugin.as_ref().filter(|p| catalog.get(p).is_none()) {
        return Err(DomainError::UnknownPlugin {
            name: plugin.clone(),
        }
        .into());
    }

    let rules: Vec<&CompatibilityRule> = catalog
        .rules()
        .iter()
        .filter(|r| args.framework.is_none_or(|fw| r.applies_to(fw)))
        .filter(|r| args.plugin.as_deref().is_none_or(|p| r.mentions(p)))
        .collect();

    if output.is_json() {
        output.json(&rules)?;
        return Ok(());
    }

    output.header(&format!("{} rule(s)", rules.len()))?;
    for rule in &rules {
        let line = format!("  {:<8} {rule}", rule.severity().as_str());
        match rule.severity() {
            Severity::Error => output.print(&line)?,
            _ => output.print(&output.dim(&line))?,
        }
        output.print(&output.dim(&format!("           {}", rule.reason())))?;
    }

    for diagnostic in &catalog.rules().diagnostics {
        output.warning(&diagnostic.to_string())?;
    }
    Ok(())
}
