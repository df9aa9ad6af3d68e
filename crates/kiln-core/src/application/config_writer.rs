//! Config writer: file effects with implicit backups.
//!
//! Every modify or delete of an existing file is preceded by a backup into
//! the writer's own [`BackupStore`]; only the first capture per path is kept,
//! so the ledger always holds the content from before the plugin started.
//! Files that did not exist before their first touch are remembered as
//! created and removed again by [`ConfigWriter::undo`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::application::{ApplicationError, backup::BackupStore, ports::Filesystem};
use crate::domain::{FileOperation, FileOperationKind, RestoreFailure};
use crate::error::{KilnError, KilnResult};

/// Everything a writer did, handed to the orchestrator on success.
#[derive(Debug)]
pub struct WriterLedger {
    pub operations: Vec<FileOperation>,
    pub backups: BackupStore,
    pub created: BTreeSet<PathBuf>,
}

impl WriterLedger {
    /// Content a path had before the writer first touched it.
    /// `None` means the file did not exist.
    pub fn previous_content(&self, path: &Path) -> Option<String> {
        self.backups.get_backup(path).map(str::to_string)
    }

    /// Undo a finished writer's effects, as [`ConfigWriter::undo`] would have.
    pub fn revert(&mut self, fs: &dyn Filesystem) -> KilnResult<()> {
        let result = undo_effects(fs, &self.created, &mut self.backups);
        self.created.clear();
        self.operations.clear();
        result
    }
}

pub struct ConfigWriter {
    fs: Arc<dyn Filesystem>,
    backups: BackupStore,
    created: BTreeSet<PathBuf>,
    operations: Vec<FileOperation>,
}

impl ConfigWriter {
    pub fn new(fs: Arc<dyn Filesystem>, root: impl Into<PathBuf>) -> Self {
        let backups = BackupStore::new(fs.clone(), root);
        Self {
            fs,
            backups,
            created: BTreeSet::new(),
            operations: Vec::new(),
        }
    }

    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.backups.key(path)
    }

    pub fn root(&self) -> &Path {
        self.backups.base()
    }

    // ── Capture ───────────────────────────────────────────────────────────────

    /// Record the pre-mutation state of `path` once. Returns true if the file existed.
    fn capture(&mut self, path: &Path) -> KilnResult<bool> {
        if self.backups.has_backup(path) {
            return Ok(true);
        }
        if self.created.contains(path) {
            return Ok(false);
        }
        if self.fs.exists(path) {
            self.backups.backup_from_disk(path)?;
            Ok(true)
        } else {
            self.created.insert(path.to_path_buf());
            Ok(false)
        }
    }

    /// Snapshot a file some other process is about to rewrite.
    ///
    /// Used before the package manager touches `package.json` and the lockfile.
    pub fn track_external_modification(&mut self, path: impl AsRef<Path>) -> KilnResult<bool> {
        let path = self.resolve(path);
        let existed = self.capture(&path)?;
        self.operations.push(FileOperation {
            kind: if existed {
                FileOperationKind::Modify
            } else {
                FileOperationKind::Create
            },
            path,
            content: None,
            backup: existed,
        });
        Ok(existed)
    }

    // ── Effects ───────────────────────────────────────────────────────────────

    pub fn read(&self, path: impl AsRef<Path>) -> KilnResult<String> {
        self.fs.read_to_string(&self.resolve(path))
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.fs.exists(&self.resolve(path))
    }

    /// Create a new file. Fails if it already exists.
    pub fn create_file(&mut self, path: impl AsRef<Path>, content: &str) -> KilnResult<FileOperation> {
        let path = self.resolve(path);
        if self.fs.exists(&path) {
            return Err(ApplicationError::filesystem(&path, "file already exists").into());
        }
        self.write_file(path, content)
    }

    /// Create or overwrite a file, backing up any previous content.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn write_file(&mut self, path: impl AsRef<Path>, content: &str) -> KilnResult<FileOperation> {
        let path = self.resolve(path);
        let existed = self.capture(&path)?;
        if let Some(parent) = path.parent() {
            self.fs.create_dir_all(parent)?;
        }
        self.fs.write_file(&path, content)?;

        let op = if existed {
            FileOperation::modify(&path, content)
        } else {
            FileOperation::create(&path, content)
        };
        debug!(kind = %op.kind, "File written");
        self.operations.push(op.clone());
        Ok(op)
    }

    /// Rewrite an existing file through `edit`. Returns false when `edit`
    /// left the content unchanged (nothing is written or recorded).
    pub fn modify_file<F>(&mut self, path: impl AsRef<Path>, edit: F) -> KilnResult<bool>
    where
        F: FnOnce(&str) -> KilnResult<String>,
    {
        let path = self.resolve(path);
        let current = self.fs.read_to_string(&path)?;
        let updated = edit(&current)?;
        if updated == current {
            return Ok(false);
        }
        self.capture(&path)?;
        self.fs.write_file(&path, &updated)?;
        self.operations.push(FileOperation::modify(&path, updated));
        Ok(true)
    }

    /// Append `text` unless the file already contains it. Creates the file
    /// when missing.
    pub fn append(&mut self, path: impl AsRef<Path>, text: &str) -> KilnResult<bool> {
        let path = self.resolve(path);
        if !self.fs.exists(&path) {
            self.write_file(&path, text)?;
            return Ok(true);
        }
        self.modify_file(&path, |current| {
            if current.contains(text) {
                return Ok(current.to_string());
            }
            let mut out = current.to_string();
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(text);
            Ok(out)
        })
    }

    /// Insert `text` on its own line after the first line containing `anchor`.
    pub fn insert_after(&mut self, path: impl AsRef<Path>, anchor: &str, text: &str) -> KilnResult<bool> {
        self.insert_relative(path.as_ref(), anchor, text, true)
    }

    /// Insert `text` on its own line before the first line containing `anchor`.
    pub fn insert_before(&mut self, path: impl AsRef<Path>, anchor: &str, text: &str) -> KilnResult<bool> {
        self.insert_relative(path.as_ref(), anchor, text, false)
    }

    fn insert_relative(&mut self, path: &Path, anchor: &str, text: &str, after: bool) -> KilnResult<bool> {
        let resolved = self.resolve(path);
        self.modify_file(&resolved, |current| {
            if current.contains(text) {
                return Ok(current.to_string());
            }
            let Some(pos) = current.find(anchor) else {
                return Err(ApplicationError::AnchorNotFound {
                    path: resolved.clone(),
                    anchor: anchor.to_string(),
                }
                .into());
            };

            let line_start = current[..pos].rfind('\n').map_or(0, |i| i + 1);
            let line_end = current[pos..]
                .find('\n')
                .map_or(current.len(), |i| pos + i + 1);

            let mut block = text.to_string();
            if !block.ends_with('\n') {
                block.push('\n');
            }

            let mut out = String::with_capacity(current.len() + block.len() + 1);
            if after {
                out.push_str(&current[..line_end]);
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&block);
                out.push_str(&current[line_end..]);
            } else {
                out.push_str(&current[..line_start]);
                out.push_str(&block);
                out.push_str(&current[line_start..]);
            }
            Ok(out)
        })
    }

    /// Make sure `line` is present as a whole line. Creates the file when missing.
    pub fn ensure_line(&mut self, path: impl AsRef<Path>, line: &str) -> KilnResult<bool> {
        let path = self.resolve(path);
        let wanted = line.trim();
        if !self.fs.exists(&path) {
            self.write_file(&path, &format!("{wanted}\n"))?;
            return Ok(true);
        }
        self.modify_file(&path, |current| {
            if current.lines().any(|l| l.trim() == wanted) {
                return Ok(current.to_string());
            }
            let mut out = current.to_string();
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(wanted);
            out.push('\n');
            Ok(out)
        })
    }

    /// Delete a file after backing it up. Missing files are a no-op.
    pub fn delete_file(&mut self, path: impl AsRef<Path>) -> KilnResult<bool> {
        let path = self.resolve(path);
        if !self.fs.exists(&path) {
            return Ok(false);
        }
        self.capture(&path)?;
        self.fs.remove_file(&path)?;
        self.operations.push(FileOperation::delete(&path));
        Ok(true)
    }

    /// Perform a declarative [`FileOperation`].
    pub fn apply(&mut self, op: &FileOperation) -> KilnResult<()> {
        match op.kind {
            FileOperationKind::Create | FileOperationKind::Modify => {
                let content = op.content.as_deref().unwrap_or_default();
                self.write_file(&op.path, content)?;
            }
            FileOperationKind::Delete => {
                self.delete_file(&op.path)?;
            }
        }
        Ok(())
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    pub fn operations(&self) -> &[FileOperation] {
        &self.operations
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    pub fn created_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.created.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    // ── Undo ──────────────────────────────────────────────────────────────────

    /// Remove created files and restore every backed-up file.
    ///
    /// Attempts everything even after a failure. On return the writer is
    /// empty; failures are reported as one `RestoreFailed`.
    #[instrument(skip_all, fields(created = self.created.len(), backups = self.backups.len()))]
    pub fn undo(&mut self) -> KilnResult<()> {
        let result = undo_effects(self.fs.as_ref(), &self.created, &mut self.backups);
        self.created.clear();
        self.operations.clear();
        result
    }

    pub fn into_ledger(self) -> WriterLedger {
        WriterLedger {
            operations: self.operations,
            backups: self.backups,
            created: self.created,
        }
    }
}

/// Remove created files, then restore every backup. Attempts everything
/// even after a failure; leaves `backups` empty.
fn undo_effects(
    fs: &dyn Filesystem,
    created: &BTreeSet<PathBuf>,
    backups: &mut BackupStore,
) -> KilnResult<()> {
    let mut failures = Vec::new();

    for path in created {
        if !fs.exists(path) {
            continue;
        }
        if let Err(e) = fs.remove_file(path) {
            warn!(path = %path.display(), error = %e, "Could not remove created file");
            failures.push(RestoreFailure {
                path: path.clone(),
                reason: e.to_string(),
            });
        }
    }

    let restored = backups.restore_all();
    backups.clear();
    match restored {
        Ok(_) => {}
        Err(KilnError::Application(ApplicationError::RestoreFailed { failures: f })) => {
            failures.extend(f);
        }
        Err(other) => return Err(other),
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ApplicationError::RestoreFailed { failures }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::MemFs;

    fn writer(fs: &Arc<MemFs>) -> ConfigWriter {
        ConfigWriter::new(fs.clone(), "/project")
    }

    #[test]
    fn create_needs_no_backup() {
        let fs = MemFs::new();
        let mut w = writer(&fs);

        let op = w.create_file("src/store.ts", "export {}").unwrap();

        assert_eq!(op.kind, FileOperationKind::Create);
        assert!(!op.backup);
        assert!(w.backups().is_empty());
        assert_eq!(fs.get("/project/src/store.ts").unwrap(), "export {}");
    }

    #[test]
    fn create_refuses_existing_file() {
        let fs = MemFs::new().with_file("/project/a.ts", "x");
        let mut w = writer(&fs);
        assert!(w.create_file("a.ts", "y").is_err());
    }

    #[test]
    fn overwrite_backs_up_first_content_only() {
        let fs = MemFs::new().with_file("/project/vite.config.ts", "v0");
        let mut w = writer(&fs);

        w.write_file("vite.config.ts", "v1").unwrap();
        w.write_file("./vite.config.ts", "v2").unwrap();

        assert_eq!(w.backups().get_backup("vite.config.ts"), Some("v0"));
        assert_eq!(w.operations().len(), 2);
        assert!(w.operations().iter().all(|op| op.kind == FileOperationKind::Modify));
    }

    #[test]
    fn insert_after_places_text_on_next_line() {
        let fs = MemFs::new().with_file(
            "/project/src/main.ts",
            "import { createApp } from 'vue'\nimport App from './App.vue'\n\ncreateApp(App).mount('#app')\n",
        );
        let mut w = writer(&fs);

        let changed = w
            .insert_after(
                "src/main.ts",
                "import App from",
                "import router from './router'",
            )
            .unwrap();

        assert!(changed);
        assert_eq!(
            fs.get("/project/src/main.ts").unwrap(),
            "import { createApp } from 'vue'\nimport App from './App.vue'\nimport router from './router'\n\ncreateApp(App).mount('#app')\n"
        );
    }

    #[test]
    fn insert_is_idempotent() {
        let fs = MemFs::new().with_file("/project/main.ts", "a\nb\n");
        let mut w = writer(&fs);

        assert!(w.insert_before("main.ts", "b", "x").unwrap());
        assert!(!w.insert_before("main.ts", "b", "x").unwrap());
        assert_eq!(fs.get("/project/main.ts").unwrap(), "a\nx\nb\n");
    }

    #[test]
    fn missing_anchor_is_an_error() {
        let fs = MemFs::new().with_file("/project/main.ts", "a\n");
        let mut w = writer(&fs);
        let err = w.insert_after("main.ts", "nope", "x").unwrap_err();
        assert!(matches!(
            err,
            KilnError::Application(ApplicationError::AnchorNotFound { .. })
        ));
        assert!(w.backups().is_empty());
    }

    #[test]
    fn ensure_line_and_append() {
        let fs = MemFs::new().with_file("/project/.gitignore", "node_modules");
        let mut w = writer(&fs);

        assert!(w.ensure_line(".gitignore", ".env.local").unwrap());
        assert!(!w.ensure_line(".gitignore", "node_modules").unwrap());
        assert!(w.append(".prettierignore", "dist\n").unwrap());
        assert!(!w.append(".prettierignore", "dist\n").unwrap());

        assert_eq!(fs.get("/project/.gitignore").unwrap(), "node_modules\n.env.local\n");
        assert_eq!(fs.get("/project/.prettierignore").unwrap(), "dist\n");
    }

    #[test]
    fn undo_restores_and_removes_created() {
        let fs = MemFs::new()
            .with_file("/project/package.json", "{}")
            .with_file("/project/old.css", "body{}");
        let mut w = writer(&fs);

        w.write_file("package.json", "{\"x\":1}").unwrap();
        w.create_file("src/new.ts", "new").unwrap();
        w.delete_file("old.css").unwrap();

        w.undo().unwrap();

        assert_eq!(fs.get("/project/package.json").unwrap(), "{}");
        assert_eq!(fs.get("/project/old.css").unwrap(), "body{}");
        assert!(fs.get("/project/src/new.ts").is_none());
        assert!(w.is_empty());
    }

    #[test]
    fn undo_reports_every_failure() {
        let fs = MemFs::new()
            .with_file("/project/a", "a0")
            .with_file("/project/b", "b0");
        let mut w = writer(&fs);
        w.write_file("a", "a1").unwrap();
        w.write_file("b", "b1").unwrap();
        fs.fail_writes_to("/project/a");

        let err = w.undo().unwrap_err();

        assert_eq!(fs.get("/project/b").unwrap(), "b0");
        match err {
            KilnError::Application(ApplicationError::RestoreFailed { failures }) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].path, PathBuf::from("/project/a"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn external_modification_is_tracked_without_writing() {
        let fs = MemFs::new().with_file("/project/package.json", "{}");
        let mut w = writer(&fs);

        assert!(w.track_external_modification("package.json").unwrap());
        assert!(!w.track_external_modification("package-lock.json").unwrap());

        // Package manager rewrites both.
        fs.write_file(Path::new("/project/package.json"), "{\"deps\":1}").unwrap();
        fs.write_file(Path::new("/project/package-lock.json"), "lock").unwrap();

        w.undo().unwrap();
        assert_eq!(fs.get("/project/package.json").unwrap(), "{}");
        assert!(fs.get("/project/package-lock.json").is_none());
    }

    #[test]
    fn apply_performs_declarative_operations() {
        let fs = MemFs::new().with_file("/project/old.js", "x");
        let mut w = writer(&fs);

        w.apply(&FileOperation::create("/project/new.js", "n")).unwrap();
        w.apply(&FileOperation::delete("/project/old.js")).unwrap();

        assert_eq!(fs.get("/project/new.js").unwrap(), "n");
        assert!(fs.get("/project/old.js").is_none());

        let ledger = w.into_ledger();
        assert_eq!(ledger.previous_content(Path::new("/project/old.js")).as_deref(), Some("x"));
        assert!(ledger.created.contains(Path::new("/project/new.js")));
    }

    #[test]
    fn ledger_revert_undoes_a_finished_writer() {
        let fs = MemFs::new().with_file("/project/main.ts", "render()");
        let mut w = writer(&fs);
        w.write_file("main.ts", "provider()").unwrap();
        w.create_file("store.ts", "export {}").unwrap();

        let mut ledger = w.into_ledger();
        ledger.revert(fs.as_ref()).unwrap();

        assert_eq!(fs.get("/project/main.ts").unwrap(), "render()");
        assert!(fs.get("/project/store.ts").is_none());
        assert!(ledger.operations.is_empty());
        assert!(ledger.backups.is_empty());
    }
}
