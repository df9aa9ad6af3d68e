//! Backup store: a ledger of pre-mutation file content.
//!
//! Keys are absolute, normalized paths, so `package.json`,
//! `./package.json` and `/project/package.json` are the same entry.
//! The ledger is ordered, which makes `list_backups` and `restore_all`
//! deterministic.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::application::{ApplicationError, ports::Filesystem};
use crate::domain::{RestoreFailure, normalize_path};
use crate::error::{KilnError, KilnResult};

pub struct BackupStore {
    fs: Arc<dyn Filesystem>,
    base: PathBuf,
    entries: BTreeMap<PathBuf, String>,
}

impl BackupStore {
    /// Relative paths are resolved against `base`.
    pub fn new(fs: Arc<dyn Filesystem>, base: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            base: base.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn key(&self, path: impl AsRef<Path>) -> PathBuf {
        normalize_path(&self.base, path)
    }

    /// Capture `content` for `path`. Overwrites an existing entry.
    pub fn backup(&mut self, path: impl AsRef<Path>, content: impl Into<String>) -> PathBuf {
        let key = self.key(path);
        if self
            .entries
            .insert(key.clone(), content.into())
            .is_some()
        {
            debug!(path = %key.display(), "Backup overwritten");
        }
        key
    }

    /// Capture the current on-disk content of `path`.
    pub fn backup_from_disk(&mut self, path: impl AsRef<Path>) -> KilnResult<PathBuf> {
        let key = self.key(path);
        if !self.fs.exists(&key) {
            return Err(ApplicationError::FileNotFound { path: key }.into());
        }
        let content = self.fs.read_to_string(&key)?;
        Ok(self.backup(key, content))
    }

    /// Write the captured content of `path` back to disk.
    pub fn restore(&self, path: impl AsRef<Path>) -> KilnResult<()> {
        let key = self.key(path);
        let content = self
            .entries
            .get(&key)
            .ok_or_else(|| ApplicationError::BackupNotFound { path: key.clone() })?;
        self.fs.write_file(&key, content)?;
        debug!(path = %key.display(), "Restored");
        Ok(())
    }

    /// Restore every entry, continuing past failures.
    ///
    /// Returns the number of restored files, or `RestoreFailed` naming every
    /// path that could not be written. Restorable files are written either way.
    #[instrument(skip_all, fields(entries = self.entries.len()))]
    pub fn restore_all(&self) -> KilnResult<usize> {
        let mut restored = 0;
        let mut failures = Vec::new();

        for (path, content) in &self.entries {
            match self.fs.write_file(path, content) {
                Ok(()) => restored += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Restore failed");
                    failures.push(RestoreFailure {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(restored)
        } else {
            Err(KilnError::Application(ApplicationError::RestoreFailed {
                failures,
            }))
        }
    }

    pub fn has_backup(&self, path: impl AsRef<Path>) -> bool {
        self.entries.contains_key(&self.key(path))
    }

    pub fn get_backup(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.entries.get(&self.key(path)).map(String::as_str)
    }

    pub fn remove_backup(&mut self, path: impl AsRef<Path>) -> Option<String> {
        let key = self.key(path);
        self.entries.remove(&key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[doc(alias = "size")]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn list_backups(&self) -> Vec<PathBuf> {
        self.entries.keys().cloned().collect()
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl std::fmt::Debug for BackupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupStore")
            .field("base", &self.base)
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
