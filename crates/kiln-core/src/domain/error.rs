// ============================================================================
// domain/error.rs - DOMAIN ERRORS
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (for retry logic)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors (400-level equivalent)
    // ========================================================================
    #[error("Invalid plugin '{plugin}': {reason}")]
    InvalidPlugin { plugin: String, reason: String },

    #[error("Duplicate plugin in catalog: {name}")]
    DuplicatePlugin { name: String },

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown framework: {0}")]
    UnknownFramework(String),

    #[error("Unknown bundler: {0}")]
    UnknownBundler(String),

    #[error("Unknown package manager: {0}")]
    UnknownPackageManager(String),

    #[error("Invalid project context: {0}")]
    InvalidContext(String),

    // ========================================================================
    // Compatibility Errors (409-level equivalent)
    // ========================================================================
    #[error("Selection is incompatible: {0}")]
    IncompatibleSelection(String),

    // ========================================================================
    // Not Found Errors (404-level equivalent)
    // ========================================================================
    #[error("Unknown plugin: {name}")]
    UnknownPlugin { name: String },

    // ========================================================================
    // Constraint Violations
    // ========================================================================
    #[error("Required field missing: {field}")]
    MissingRequiredField { field: &'static str },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::UnknownPlugin { name } => vec![
                format!("No plugin named '{}' is in the catalog", name),
                "Try: kiln list".into(),
                format!("Or search for it: kiln list --search {}", name),
            ],
            Self::UnknownFramework(fw) => vec![
                format!("'{}' is not a supported framework", fw),
                "Supported: react, vue, svelte, angular, nextjs, nuxt, solid, preact".into(),
            ],
            Self::UnknownCategory(cat) => vec![
                format!("'{}' is not a plugin category", cat),
                "Categories: routing, state, http, css, ui, forms, tooling, testing, i18n, animation, utils".into(),
            ],
            Self::IncompatibleSelection(detail) => vec![
                "The selected plugins cannot be installed together".into(),
                format!("Details: {}", detail),
                "Try: kiln check <plugins...> to see every violation".into(),
            ],
            Self::InvalidPlugin { plugin, .. } => vec![
                format!("Plugin '{}' is malformed and was not loaded", plugin),
                "Check the plugin manifest".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidPlugin { .. }
            | Self::DuplicatePlugin { .. }
            | Self::UnknownCategory(_)
            | Self::UnknownFramework(_)
            | Self::UnknownBundler(_)
            | Self::UnknownPackageManager(_)
            | Self::InvalidContext(_) => ErrorCategory::Validation,
            Self::IncompatibleSelection(_) => ErrorCategory::Compatibility,
            Self::UnknownPlugin { .. } => ErrorCategory::NotFound,
            Self::MissingRequiredField { .. } => ErrorCategory::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Compatibility,
    NotFound,
    Internal,
}
