//! `kiln detect` - show what Kiln sees in the project.

use crate::{
    cli::GlobalArgs,
    commands::{detect_project, load_catalog},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(global: GlobalArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let ctx = detect_project(&global.root)?;

    if output.is_json() {
        output.json(&ctx)?;
        return Ok(());
    }

    let catalog = load_catalog(&config)?;
    let installed: Vec<&str> = catalog
        .installed(&ctx)
        .into_iter()
        .map(|d| d.name.as_str())
        .collect();

    output.header(&ctx.project_name)?;
    let version = ctx.framework_version.as_deref().unwrap_or("unknown version");
    output.print(&format!("  framework        {} ({version})", ctx.framework))?;
    output.print(&format!(
        "  bundler          {}",
        ctx.bundler.map_or_else(|| "none detected".to_string(), |b| b.to_string())
    ))?;
    output.print(&format!("  package manager  {}", ctx.package_manager))?;
    output.print(&format!(
        "  language         {}",
        if ctx.typescript { "TypeScript" } else { "JavaScript" }
    ))?;
    output.print(&format!("  source dir       {}", ctx.src_dir()))?;
    output.print(&format!("  root             {}", ctx.project_root.display()))?;
    if !installed.is_empty() {
        output.print(&format!("  known plugins    {}", installed.join(", ")))?;
    }
    Ok(())
}
