//! `kiln check` - validate a selection without installing anything.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::instrument;

use kiln_core::{application::CompatibilityService, domain::ProjectContext};

use crate::{
    cli::{CheckArgs, GlobalArgs},
    commands::{detect_project, incompatible, load_catalog, print_validation},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[instrument(skip_all, fields(plugins = ?args.plugins))]
pub fn execute(
    args: CheckArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let catalog = Arc::new(load_catalog(&config)?);

    let ctx = match args.framework {
        Some(framework) => {
            let root = std::path::absolute(&global.root)?;
            ProjectContext::builder(framework, root).build()?
        }
        None => detect_project(&global.root)?,
    };

    let accepted: BTreeSet<_> = args.accept.into_iter().collect();
    let service = CompatibilityService::new(catalog);
    let result = service.check(&args.plugins, &ctx, &accepted)?;

    if output.is_json() {
        output.json(&result)?;
    } else {
        output.header(&format!(
            "Checking {} against {}",
            args.plugins.join(", "),
            ctx.framework
        ))?;
        print_validation(&result, &output)?;
        if result.valid {
            output.success("Selection is compatible")?;
        }
    }

    if result.valid {
        Ok(())
    } else {
        Err(incompatible(&result))
    }
}
