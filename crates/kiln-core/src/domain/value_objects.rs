//! Domain value objects: Category, Framework, Bundler, PackageManager, Severity.
//!
//! # Design
//!
//! These are pure value types: `Copy`, equality-by-value, no identity.
//! This file's only job is to define the types, their string
//! representations, and their `FromStr` parsers. Exclusivity policy for
//! categories lives here too because it is a property of the category itself.

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Severity ─────────────────────────────────────────────────────────────────

/// How strongly a compatibility rule is enforced.
///
/// Ordered from least to most severe so `max()` picks the strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Only errors block an installation.
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Category ─────────────────────────────────────────────────────────────────

/// The closed set of plugin categories.
///
/// Variant order is the order categories are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Routing,
    State,
    Http,
    Css,
    Ui,
    Forms,
    Tooling,
    Testing,
    I18n,
    Animation,
    Utils,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Self::Routing,
        Self::State,
        Self::Http,
        Self::Css,
        Self::Ui,
        Self::Forms,
        Self::Tooling,
        Self::Testing,
        Self::I18n,
        Self::Animation,
        Self::Utils,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Routing => "routing",
            Self::State => "state",
            Self::Http => "http",
            Self::Css => "css",
            Self::Ui => "ui",
            Self::Forms => "forms",
            Self::Tooling => "tooling",
            Self::Testing => "testing",
            Self::I18n => "i18n",
            Self::Animation => "animation",
            Self::Utils => "utils",
        }
    }

    /// Whether at most one plugin of this category should be installed.
    pub const fn is_exclusive(self) -> bool {
        matches!(self, Self::State | Self::Routing | Self::Css)
    }

    /// Severity and override flag for the exclusivity rule of this category.
    ///
    /// CSS approaches can coexist, so CSS exclusivity is only a warning.
    /// Returns `None` for non-exclusive categories.
    pub const fn exclusivity(self) -> Option<(Severity, bool)> {
        match self {
            Self::Css => Some((Severity::Warning, true)),
            Self::State | Self::Routing => Some((Severity::Error, false)),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| DomainError::UnknownCategory(s.to_string()))
    }
}

// ── Framework ────────────────────────────────────────────────────────────────

/// A front-end framework tag a plugin can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    React,
    Vue,
    Svelte,
    Angular,
    #[serde(rename = "nextjs")]
    NextJs,
    Nuxt,
    Solid,
    Preact,
}

impl Framework {
    pub const ALL: [Framework; 8] = [
        Self::React,
        Self::Vue,
        Self::Svelte,
        Self::Angular,
        Self::NextJs,
        Self::Nuxt,
        Self::Solid,
        Self::Preact,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::React => "react",
            Self::Vue => "vue",
            Self::Svelte => "svelte",
            Self::Angular => "angular",
            Self::NextJs => "nextjs",
            Self::Nuxt => "nuxt",
            Self::Solid => "solid",
            Self::Preact => "preact",
        }
    }

    /// The npm package whose presence identifies this framework.
    pub const fn package(&self) -> &'static str {
        match self {
            Self::React => "react",
            Self::Vue => "vue",
            Self::Svelte => "svelte",
            Self::Angular => "@angular/core",
            Self::NextJs => "next",
            Self::Nuxt => "nuxt",
            Self::Solid => "solid-js",
            Self::Preact => "preact",
        }
    }

    /// Whether components are written in JSX/TSX files.
    pub const fn uses_jsx(self) -> bool {
        matches!(self, Self::React | Self::NextJs | Self::Solid | Self::Preact)
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "react" => Ok(Self::React),
            "vue" | "vuejs" => Ok(Self::Vue),
            "svelte" | "sveltekit" => Ok(Self::Svelte),
            "angular" => Ok(Self::Angular),
            "nextjs" | "next" | "next.js" => Ok(Self::NextJs),
            "nuxt" | "nuxtjs" => Ok(Self::Nuxt),
            "solid" | "solidjs" | "solid-js" => Ok(Self::Solid),
            "preact" => Ok(Self::Preact),
            other => Err(DomainError::UnknownFramework(other.to_string())),
        }
    }
}

// ── Bundler ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bundler {
    Vite,
    Webpack,
    Turbopack,
    Rspack,
    Parcel,
    AngularCli,
}

impl Bundler {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vite => "vite",
            Self::Webpack => "webpack",
            Self::Turbopack => "turbopack",
            Self::Rspack => "rspack",
            Self::Parcel => "parcel",
            Self::AngularCli => "angular-cli",
        }
    }
}

impl fmt::Display for Bundler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bundler {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vite" => Ok(Self::Vite),
            "webpack" => Ok(Self::Webpack),
            "turbopack" => Ok(Self::Turbopack),
            "rspack" => Ok(Self::Rspack),
            "parcel" => Ok(Self::Parcel),
            "angular-cli" | "angular" => Ok(Self::AngularCli),
            other => Err(DomainError::UnknownBundler(other.to_string())),
        }
    }
}

// ── PackageManager ───────────────────────────────────────────────────────────

/// A JavaScript package manager kiln can drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Npm,
    Pnpm,
    Yarn,
    Bun,
}

impl PackageManager {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Pnpm => "pnpm",
            Self::Yarn => "yarn",
            Self::Bun => "bun",
        }
    }

    /// Executable name.
    pub const fn program(&self) -> &'static str {
        self.as_str()
    }

    /// Lockfile written by this package manager.
    pub const fn lockfile(&self) -> &'static str {
        match self {
            Self::Npm => "package-lock.json",
            Self::Pnpm => "pnpm-lock.yaml",
            Self::Yarn => "yarn.lock",
            Self::Bun => "bun.lockb",
        }
    }

    /// Arguments (excluding the program) that install `packages`.
    pub fn install_args(&self, packages: &[String], dev: bool, exact: bool, silent: bool) -> Vec<String> {
        let mut args: Vec<String> = match self {
            Self::Npm => vec!["install".into()],
            Self::Pnpm | Self::Yarn | Self::Bun => vec!["add".into()],
        };

        if dev {
            args.push(
                match self {
                    Self::Npm => "--save-dev",
                    Self::Pnpm | Self::Yarn => "-D",
                    Self::Bun => "-d",
                }
                .into(),
            );
        }

        if exact {
            args.push(
                match self {
                    Self::Npm => "--save-exact",
                    Self::Pnpm | Self::Yarn => "-E",
                    Self::Bun => "--exact",
                }
                .into(),
            );
        }

        if silent {
            args.push("--silent".into());
        }

        args.extend(packages.iter().cloned());
        args
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageManager {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "npm" => Ok(Self::Npm),
            "pnpm" => Ok(Self::Pnpm),
            "yarn" => Ok(Self::Yarn),
            "bun" => Ok(Self::Bun),
            other => Err(DomainError::UnknownPackageManager(other.to_string())),
        }
    }
}
