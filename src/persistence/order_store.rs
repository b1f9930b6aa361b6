use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::domain::order::OrderRecord;

// ============================================================================
// Order Store - JSON snapshot file
// ============================================================================
//
// The whole cache is rewritten on every save. The write goes to a sibling
// temp file which is then renamed over the target, so a crash mid-write
// leaves the previous snapshot intact.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on order store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed order store {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

#[derive(Debug, Clone)]
pub struct OrderStore {
    path: PathBuf,
}

impl OrderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted orders. A missing or empty file is an empty list.
    pub fn load(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No order store yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<OrderRecord> = serde_json::from_str(&contents).map_err(|e| StoreError::Malformed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        if let Some(bad) = records.iter().find(|r| r.id != r.remote_id) {
            return Err(StoreError::Malformed {
                path: self.path.clone(),
                reason: format!("order {} has mismatched remote id {}", bad.id, bad.remote_id),
            });
        }

        tracing::debug!(path = %self.path.display(), count = records.len(), "Loaded persisted orders");

        Ok(records)
    }

    /// Replace the persisted snapshot with `records`.
    pub fn save(&self, records: &[OrderRecord]) -> Result<(), StoreError> {
        let payload = serde_json::to_vec(records).map_err(|e| StoreError::Malformed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let tmp_path = self.tmp_path();
        let written = fs::File::create(&tmp_path).and_then(|mut file| {
            file.write_all(&payload)?;
            file.sync_all()
        });

        if let Err(e) = written.and_then(|_| fs::rename(&tmp_path, &self.path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.io_error(e));
        }

        tracing::trace!(path = %self.path.display(), count = records.len(), "Saved order snapshot");

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::article::ArticleId;
    use crate::domain::order::{OperationMode, OrderId, RemoteStatus};
    use tempfile::{tempdir, TempDir};

    fn temp_store() -> (TempDir, OrderStore) {
        let dir = tempdir().unwrap();
        let store = OrderStore::new(dir.path().join("nested").join("MyOrders.dat"));
        (dir, store)
    }

    fn record(id: i32, mode: OperationMode) -> OrderRecord {
        OrderRecord {
            id: OrderId(id),
            remote_id: OrderId(id),
            article_id: ArticleId(id % 3 + 1),
            article_no: format!("{}", id % 3 + 1),
            article_desc: format!("Article {}", id % 3 + 1),
            elevator: "Sim_1".to_string(),
            tray_no: 4,
            quantity: id as f64 * 1.5,
            service_opening: 2,
            operation: mode,
            status: RemoteStatus::new("Queued"),
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let (_dir, store) = temp_store();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_empty_file_loads_empty() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "  \n").unwrap();

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_returns_same_records() {
        let (_dir, store) = temp_store();
        let records = vec![
            record(1, OperationMode::Out),
            record(2, OperationMode::In),
            record(3, OperationMode::Inv),
        ];

        store.save(&records).unwrap();
        let mut loaded = store.load().unwrap();
        loaded.sort_by_key(|r| r.id);

        assert_eq!(loaded, records);
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let (_dir, store) = temp_store();
        store.save(&[record(1, OperationMode::Out), record(2, OperationMode::Out)]).unwrap();
        store.save(&[record(2, OperationMode::Out)]).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, OrderId(2));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(store.load(), Err(StoreError::Malformed { .. })));
        // The broken file is left for inspection
        assert!(store.path().exists());
    }

    #[test]
    fn test_mismatched_ids_are_malformed() {
        let (_dir, store) = temp_store();
        let mut bad = record(1, OperationMode::Out);
        bad.remote_id = OrderId(99);
        store.save(&[bad]).unwrap();

        assert!(matches!(store.load(), Err(StoreError::Malformed { .. })));
    }
}
