use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What a [`FileOperation`] did to its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperationKind {
    Create,
    Modify,
    Delete,
}

impl FileOperationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for FileOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative record of one file-system effect.
///
/// Used both to perform the effect and to report it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOperation {
    #[serde(rename = "type")]
    pub kind: FileOperationKind,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Whether prior content was captured before the effect.
    pub backup: bool,
}

impl FileOperation {
    pub fn create(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            kind: FileOperationKind::Create,
            path: path.into(),
            content: Some(content.into()),
            backup: false,
        }
    }

    pub fn modify(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            kind: FileOperationKind::Modify,
            path: path.into(),
            content: Some(content.into()),
            backup: true,
        }
    }

    pub fn delete(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: FileOperationKind::Delete,
            path: path.into(),
            content: None,
            backup: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_create(&self) -> bool {
        self.kind == FileOperationKind::Create
    }
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path.display())
    }
}
