//! Implementation of the `kiln list` command.

use std::collections::HashSet;

use kiln_core::domain::PluginDescriptor;

use crate::{
    cli::{GlobalArgs, ListArgs, ListFormat},
    commands::{detect_project, load_catalog},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(
    args: ListArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let catalog = load_catalog(&config)?;

    let mut plugins: Vec<&PluginDescriptor> = match &args.search {
        Some(query) => catalog.search(query),
        None => catalog.descriptors().collect(),
    };
    if let Some(category) = args.category {
        plugins.retain(|d| d.category == category);
    }
    if let Some(framework) = args.framework {
        plugins.retain(|d| d.supports(framework));
    }

    let mut installed = HashSet::new();
    if args.compatible {
        let ctx = detect_project(&global.root)?;
        let fits: HashSet<&str> = catalog
            .compatible_with(&ctx)
            .into_iter()
            .map(|d| d.name.as_str())
            .collect();
        plugins.retain(|d| fits.contains(d.name.as_str()));
        installed.extend(catalog.installed(&ctx).into_iter().map(|d| d.name.as_str()));
    }
    plugins.sort_by(|a, b| (a.category, &a.name).cmp(&(b.category, &b.name)));

    let format = if output.is_json() {
        ListFormat::Json
    } else {
        args.format
    };

    match format {
        ListFormat::Table => {
            output.header(&format!("Available plugins ({}):", plugins.len()))?;
            for d in &plugins {
                let mark = if installed.contains(d.name.as_str()) {
                    " (installed)"
                } else {
                    ""
                };
                output.print(&format!(
                    "  {:<28} {:<10} {:<10} {}{mark}",
                    d.name,
                    d.version,
                    d.category.as_str(),
                    output.dim(&d.description)
                ))?;
            }
            if plugins.is_empty() {
                output.info("No plugins match these filters")?;
            }
        }

        // Written even in quiet mode: the list is the result.
        ListFormat::Json => output.json(&plugins)?,

        ListFormat::List => {
            for d in &plugins {
                println!("{}", d.name);
            }
        }

        ListFormat::Csv => {
            println!("name,version,category,frameworks");
            for d in &plugins {
                println!("{}", csv_row(d));
            }
        }
    }

    Ok(())
}

fn csv_row(d: &PluginDescriptor) -> String {
    let frameworks = d
        .frameworks
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(";");
    format!("{},{},{},{}", d.name, d.version, d.category, frameworks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::domain::{Category, Framework};

    #[test]
    fn csv_joins_frameworks_with_semicolons() {
        let d = PluginDescriptor::builder()
            .named("zustand", "Zustand", "state")
            .in_category(Category::State)
            .for_frameworks([Framework::React, Framework::NextJs])
            .with_version("^5.0.0")
            .build()
            .unwrap();
        assert_eq!(csv_row(&d), "zustand,^5.0.0,state,react;nextjs");
    }
}
