//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use clap::{Args, Parser, Subcommand, ValueEnum};

use kiln_core::{
    application::FailurePolicy,
    domain::{Category, Framework, PackageManager, ViolationKey},
};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "kiln",
    bin_name = "kiln",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "\u{1f525} Add libraries to front-end projects, safely",
    long_about = "Kiln installs and configures libraries in an existing front-end \
                  project. Selections are checked against compatibility rules first, \
                  and a failed install is rolled back.",
    after_help = "EXAMPLES:\n\
        \x20 kiln add zustand react-router-dom\n\
        \x20 kiln check tailwindcss unocss\n\
        \x20 kiln list --category state --compatible\n\
        \x20 kiln completions bash > /usr/share/bash-completion/completions/kiln",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate and install plugins into the project.
    #[command(
        visible_alias = "a",
        about = "Install plugins into the project",
        after_help = "EXAMPLES:\n\
            \x20 kiln add zustand\n\
            \x20 kiln add tailwindcss unocss --accept exclusive:tailwindcss,unocss\n\
            \x20 kiln add vitest --dry-run\n\
            \x20 kiln add axios --policy continue --yes"
    )]
    Add(AddArgs),

    /// Check a selection against the compatibility rules.
    #[command(
        about = "Check plugin compatibility without installing",
        after_help = "EXAMPLES:\n\
            \x20 kiln check zustand @reduxjs/toolkit\n\
            \x20 kiln check shadcn --output-format json"
    )]
    Check(CheckArgs),

    /// List catalog plugins.
    #[command(
        visible_alias = "ls",
        about = "List available plugins",
        after_help = "EXAMPLES:\n\
            \x20 kiln list\n\
            \x20 kiln list --category css\n\
            \x20 kiln list --compatible\n\
            \x20 kiln list --search query"
    )]
    List(ListArgs),

    /// Print the generated compatibility rules.
    #[command(
        about = "Show compatibility rules",
        after_help = "EXAMPLES:\n\
            \x20 kiln rules\n\
            \x20 kiln rules --framework vue --output-format json"
    )]
    Rules(RulesArgs),

    /// Show what Kiln detects about the project.
    #[command(about = "Detect the project setup")]
    Detect,

    /// Initialise a Kiln configuration file.
    #[command(
        about = "Initialise configuration",
        after_help = "EXAMPLES:\n\
            \x20 kiln init           # default location\n\
            \x20 kiln init --local   # .kiln.toml in the current directory"
    )]
    Init(InitArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 kiln completions bash > ~/.local/share/bash-completion/completions/kiln\n\
            \x20 kiln completions zsh  > ~/.zfunc/_kiln\n\
            \x20 kiln completions fish > ~/.config/fish/completions/kiln.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the Kiln configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 kiln config get install.failure_policy\n\
            \x20 kiln config list\n\
            \x20 kiln config path"
    )]
    Config(ConfigCommands),
}

// ── add ───────────────────────────────────────────────────────────────────────

/// Arguments for `kiln add`.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// Plugins to install, by catalog name.
    #[arg(value_name = "PLUGIN", required = true, num_args = 1..)]
    pub plugins: Vec<String>,

    /// Accept an overridable violation by key (repeatable).
    #[arg(
        long = "accept",
        value_name = "KEY",
        help = "Accept an overridable warning (key shown by `kiln check`)"
    )]
    pub accept: Vec<ViolationKey>,

    /// Validate and print the plan without touching the project.
    #[arg(long = "dry-run", help = "Show what would be installed without installing")]
    pub dry_run: bool,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long = "yes", help = "Skip confirmation and install immediately")]
    pub yes: bool,

    /// What to do when a plugin fails.
    #[arg(
        long = "policy",
        value_name = "POLICY",
        help = "Failure policy: continue | abort | abort-and-revert"
    )]
    pub policy: Option<FailurePolicy>,

    /// Package manager override.
    #[arg(
        long = "package-manager",
        value_name = "PM",
        help = "Use this package manager instead of the detected one"
    )]
    pub package_manager: Option<PackageManager>,

    /// Pin exact versions.
    #[arg(long = "exact", help = "Save exact versions instead of ranges")]
    pub exact: bool,

    /// Per-install time limit in seconds.
    #[arg(
        long = "timeout",
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Give each package manager call this many seconds"
    )]
    pub timeout: Option<u64>,
}

// ── check ─────────────────────────────────────────────────────────────────────

/// Arguments for `kiln check`.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Plugins to check.
    #[arg(value_name = "PLUGIN", required = true, num_args = 1..)]
    pub plugins: Vec<String>,

    /// Accept an overridable violation by key (repeatable).
    #[arg(long = "accept", value_name = "KEY")]
    pub accept: Vec<ViolationKey>,

    /// Check against this framework instead of detecting the project.
    #[arg(
        short = 'f',
        long = "framework",
        value_name = "FRAMEWORK",
        help = "Assume this framework instead of detecting the project"
    )]
    pub framework: Option<Framework>,
}

// ── list ──────────────────────────────────────────────────────────────────────

/// Arguments for `kiln list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Filter by category.
    #[arg(long = "category", value_name = "CATEGORY", help = "Filter by category")]
    pub category: Option<Category>,

    /// Filter by supported framework.
    #[arg(
        short = 'f',
        long = "framework",
        value_name = "FRAMEWORK",
        help = "Filter by framework"
    )]
    pub framework: Option<Framework>,

    /// Only plugins that fit the detected project.
    #[arg(
        long = "compatible",
        conflicts_with = "framework",
        help = "Only plugins compatible with the detected project"
    )]
    pub compatible: bool,

    /// Case-insensitive search over names and descriptions.
    #[arg(short = 's', long = "search", value_name = "QUERY")]
    pub search: Option<String>,

    /// Output format.
    #[arg(
        long = "format",
        value_enum,
        default_value = "table",
        help = "Output format"
    )]
    pub format: ListFormat,
}

/// Output format for the `list` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// Human-readable table.
    Table,
    /// One name per line.
    List,
    /// JSON array.
    Json,
    /// CSV rows.
    Csv,
}

// ── rules ─────────────────────────────────────────────────────────────────────

/// Arguments for `kiln rules`.
#[derive(Debug, Args)]
pub struct RulesArgs {
    /// Only rules that apply to this framework.
    #[arg(short = 'f', long = "framework", value_name = "FRAMEWORK")]
    pub framework: Option<Framework>,

    /// Only rules that mention this plugin.
    #[arg(short = 'p', long = "plugin", value_name = "PLUGIN")]
    pub plugin: Option<String>,
}

// ── init ──────────────────────────────────────────────────────────────────────

/// Arguments for `kiln init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Write to `.kiln.toml` in the current directory.
    #[arg(
        long = "local",
        help = "Create local configuration in current directory"
    )]
    pub local: bool,

    /// Overwrite an existing config file.
    #[arg(short = 'f', long = "force", help = "Overwrite existing configuration")]
    pub force: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `kiln completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `kiln config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `install.failure_policy`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the active configuration file.
    Path,
}

// ── tests ─────────────────────────────────────────────────────────────────────
