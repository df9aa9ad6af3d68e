//! Transactions: named groups of tracked file operations with group rollback.
//!
//! Several transactions may be open at once; each is keyed by a
//! [`TransactionId`]. Status moves `pending → committed` or
//! `pending → rolled-back` exactly once.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::{ApplicationError, ports::Filesystem};
use crate::domain::{FileOperation, RestoreFailure};
use crate::error::KilnResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionStatus {
    Pending,
    Committed,
    RolledBack,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Committed => "committed",
            Self::RolledBack => "rolled-back",
        })
    }
}

/// A file operation plus what the file held before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedOperation {
    pub operation: FileOperation,
    /// `None` means the file did not exist; rollback removes it.
    pub previous_content: Option<String>,
}

#[derive(Debug)]
struct Transaction {
    status: TransactionStatus,
    operations: Vec<TrackedOperation>,
    started_at: DateTime<Utc>,
}

/// Registry of open and finished transactions.
pub struct TransactionManager {
    fs: Arc<dyn Filesystem>,
    transactions: RwLock<HashMap<TransactionId, Transaction>>,
}

impl TransactionManager {
    pub fn new(fs: Arc<dyn Filesystem>) -> Self {
        Self {
            fs,
            transactions: RwLock::new(HashMap::new()),
        }
    }

    pub fn begin(&self) -> KilnResult<TransactionId> {
        let id = TransactionId::new();
        self.transactions
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?
            .insert(
                id,
                Transaction {
                    status: TransactionStatus::Pending,
                    operations: Vec::new(),
                    started_at: Utc::now(),
                },
            );
        debug!(%id, "Transaction started");
        Ok(id)
    }

    pub fn track(
        &self,
        id: TransactionId,
        operation: FileOperation,
        previous_content: Option<String>,
    ) -> KilnResult<()> {
        let mut map = self
            .transactions
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;
        let txn = pending_mut(&mut map, id)?;
        txn.operations.push(TrackedOperation {
            operation,
            previous_content,
        });
        Ok(())
    }

    pub fn commit(&self, id: TransactionId) -> KilnResult<()> {
        let mut map = self
            .transactions
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;
        let txn = pending_mut(&mut map, id)?;
        txn.status = TransactionStatus::Committed;
        info!(
            %id,
            operations = txn.operations.len(),
            elapsed_ms = (Utc::now() - txn.started_at).num_milliseconds(),
            "Transaction committed"
        );
        Ok(())
    }

    /// Undo every tracked operation in reverse order.
    ///
    /// Continues past failures; the transaction is marked rolled back either
    /// way and failures are returned as one `RestoreFailed`.
    #[instrument(skip_all, fields(%id))]
    pub fn rollback(&self, id: TransactionId) -> KilnResult<usize> {
        let operations = {
            let mut map = self
                .transactions
                .write()
                .map_err(|_| ApplicationError::StoreLockError)?;
            let txn = pending_mut(&mut map, id)?;
            txn.status = TransactionStatus::RolledBack;
            std::mem::take(&mut txn.operations)
        };

        let mut undone = 0;
        let mut failures = Vec::new();

        for tracked in operations.iter().rev() {
            let path = &tracked.operation.path;
            let result = match &tracked.previous_content {
                Some(content) => self.fs.write_file(path, content),
                None if self.fs.exists(path) => self.fs.remove_file(path),
                None => Ok(()),
            };
            match result {
                Ok(()) => undone += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not undo operation");
                    failures.push(RestoreFailure {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Keep the record for inspection after rollback.
        if let Ok(mut map) = self.transactions.write() {
            if let Some(txn) = map.get_mut(&id) {
                txn.operations = operations;
            }
        }

        if failures.is_empty() {
            info!(undone, "Transaction rolled back");
            Ok(undone)
        } else {
            Err(ApplicationError::RestoreFailed { failures }.into())
        }
    }

    pub fn status(&self, id: TransactionId) -> KilnResult<TransactionStatus> {
        let map = self
            .transactions
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        map.get(&id)
            .map(|t| t.status)
            .ok_or_else(|| ApplicationError::TransactionNotFound { id }.into())
    }

    pub fn operations(&self, id: TransactionId) -> KilnResult<Vec<TrackedOperation>> {
        let map = self
            .transactions
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        map.get(&id)
            .map(|t| t.operations.clone())
            .ok_or_else(|| ApplicationError::TransactionNotFound { id }.into())
    }

    /// Paths tracked by a transaction, in tracking order.
    pub fn paths(&self, id: TransactionId) -> KilnResult<Vec<PathBuf>> {
        Ok(self
            .operations(id)?
            .into_iter()
            .map(|t| t.operation.path)
            .collect())
    }

    /// Forget a finished or abandoned transaction.
    pub fn discard(&self, id: TransactionId) -> KilnResult<()> {
        self.transactions
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ApplicationError::TransactionNotFound { id }.into())
    }
}

fn pending_mut(
    map: &mut HashMap<TransactionId, Transaction>,
    id: TransactionId,
) -> Result<&mut Transaction, ApplicationError> {
    let txn = map
        .get_mut(&id)
        .ok_or(ApplicationError::TransactionNotFound { id })?;
    if txn.status != TransactionStatus::Pending {
        return Err(ApplicationError::InvalidTransactionState {
            id,
            status: txn.status,
        });
    }
    Ok(txn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::MemFs;
    use crate::error::KilnError;
    use std::path::Path;

    #[test]
    fn rollback_restores_in_reverse_order() {
        let fs = MemFs::new().with_file("/p/a", "a1");
        let tm = TransactionManager::new(fs.clone());
        let id = tm.begin().unwrap();

        tm.track(id, FileOperation::modify("/p/a", "a1"), Some("a0".into()))
            .unwrap();
        fs.write_file(Path::new("/p/b"), "new").unwrap();
        tm.track(id, FileOperation::create("/p/b", "new"), None).unwrap();

        assert_eq!(tm.rollback(id).unwrap(), 2);
        assert_eq!(fs.get("/p/a").unwrap(), "a0");
        assert!(fs.get("/p/b").is_none());
        assert_eq!(tm.status(id).unwrap(), TransactionStatus::RolledBack);
        assert_eq!(tm.paths(id).unwrap().len(), 2);
    }

    #[test]
    fn finished_transactions_reject_changes() {
        let fs = MemFs::new();
        let tm = TransactionManager::new(fs);
        let id = tm.begin().unwrap();
        tm.commit(id).unwrap();

        let err = tm.track(id, FileOperation::delete("/p/x"), None).unwrap_err();
        assert!(matches!(
            err,
            KilnError::Application(ApplicationError::InvalidTransactionState {
                status: TransactionStatus::Committed,
                ..
            })
        ));
        assert!(tm.rollback(id).is_err());
    }

    #[test]
    fn transactions_are_independent() {
        let fs = MemFs::new().with_file("/p/a", "changed").with_file("/p/b", "changed");
        let tm = TransactionManager::new(fs.clone());
        let first = tm.begin().unwrap();
        let second = tm.begin().unwrap();

        tm.track(first, FileOperation::modify("/p/a", "changed"), Some("a".into()))
            .unwrap();
        tm.track(second, FileOperation::modify("/p/b", "changed"), Some("b".into()))
            .unwrap();

        tm.rollback(first).unwrap();
        tm.commit(second).unwrap();

        assert_eq!(fs.get("/p/a").unwrap(), "a");
        assert_eq!(fs.get("/p/b").unwrap(), "changed");
    }

    #[test]
    fn rollback_aggregates_failures() {
        let fs = MemFs::new();
        let tm = TransactionManager::new(fs.clone());
        let id = tm.begin().unwrap();
        tm.track(id, FileOperation::modify("/p/a", ""), Some("a".into()))
            .unwrap();
        tm.track(id, FileOperation::modify("/p/b", ""), Some("b".into()))
            .unwrap();
        fs.fail_writes_to("/p/b");

        let err = tm.rollback(id).unwrap_err();
        assert_eq!(fs.get("/p/a").unwrap(), "a");
        assert!(matches!(
            err,
            KilnError::Application(ApplicationError::RestoreFailed { ref failures }) if failures.len() == 1
        ));
    }

    #[test]
    fn unknown_ids_are_reported() {
        let tm = TransactionManager::new(MemFs::new());
        let id = TransactionId::new();
        assert!(matches!(
            tm.status(id),
            Err(KilnError::Application(ApplicationError::TransactionNotFound { .. }))
        ));
        let known = tm.begin().unwrap();
        tm.discard(known).unwrap();
        assert!(tm.discard(known).is_err());
    }
}
