//! In-memory filesystem for core unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::application::{ApplicationError, ports::Filesystem};
use crate::error::KilnResult;

#[derive(Default)]
pub struct MemFs {
    files: RwLock<BTreeMap<PathBuf, String>>,
    fail_writes: RwLock<BTreeSet<PathBuf>>,
}

impl MemFs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_file(self: Arc<Self>, path: &str, content: &str) -> Arc<Self> {
        self.files
            .write()
            .unwrap()
            .insert(PathBuf::from(path), content.to_string());
        self
    }

    pub fn fail_writes_to(&self, path: &str) {
        self.fail_writes.write().unwrap().insert(PathBuf::from(path));
    }

    pub fn heal(&self) {
        self.fail_writes.write().unwrap().clear();
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files.read().unwrap().get(Path::new(path)).cloned()
    }
}

impl Filesystem for MemFs {
    fn read_to_string(&self, path: &Path) -> KilnResult<String> {
        self.files
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?
            .get(path)
            .cloned()
            .ok_or_else(|| {
                ApplicationError::FileNotFound {
                    path: path.to_path_buf(),
                }
                .into()
            })
    }

    fn write_file(&self, path: &Path, content: &str) -> KilnResult<()> {
        if self.fail_writes.read().unwrap().contains(path) {
            return Err(ApplicationError::filesystem(path, "injected write failure").into());
        }
        self.files
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> KilnResult<()> {
        self.files
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| {
                ApplicationError::FileNotFound {
                    path: path.to_path_buf(),
                }
                .into()
            })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    fn create_dir_all(&self, _path: &Path) -> KilnResult<()> {
        Ok(())
    }
}
