//! The document database seam and its in-memory implementation.
//!
//! playerbridge doesn't ship a database engine. It talks to one through
//! the [`Database`] trait: a flat collection of encoded documents keyed
//! by string id. Production deployments implement it over their document
//! store; [`MemoryDatabase`] backs tests and single-process setups.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::StoreError;

/// A named collection of documents keyed by string id.
///
/// Every method may block on I/O. Callers on latency-sensitive threads
/// go through an executor instead of calling these directly.
///
/// ## Ordering
///
/// `iterate` and `documents_in_range` return documents in the
/// implementation's storage order. That order must be stable across
/// calls as long as nothing is written in between, so paging with
/// `documents_in_range` neither skips nor repeats documents.
pub trait Database: Send + Sync + 'static {
    /// The collection name, used in logs and errors.
    fn name(&self) -> &str;

    /// Fetches one document. `Ok(None)` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Inserts or overwrites the document stored under `key`.
    fn update(&self, key: &str, document: Vec<u8>) -> Result<(), StoreError>;

    /// Number of stored documents.
    fn count(&self) -> Result<usize, StoreError>;

    /// Calls `visitor` once per document with its key and bytes.
    fn iterate(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]),
    ) -> Result<(), StoreError>;

    /// Up to `limit` documents, skipping the first `offset`.
    fn documents_in_range(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Vec<u8>>, StoreError>;
}

impl<D: Database> Database for Arc<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn update(&self, key: &str, document: Vec<u8>) -> Result<(), StoreError> {
        (**self).update(key, document)
    }

    fn count(&self) -> Result<usize, StoreError> {
        (**self).count()
    }

    fn iterate(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]),
    ) -> Result<(), StoreError> {
        (**self).iterate(visitor)
    }

    fn documents_in_range(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        (**self).documents_in_range(offset, limit)
    }
}

// ---------------------------------------------------------------------------
// MemoryDatabase
// ---------------------------------------------------------------------------

/// An in-process [`Database`]. Storage order is insertion order; an
/// overwrite keeps the document's original position.
#[derive(Debug)]
pub struct MemoryDatabase {
    name: String,
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Keys in insertion order.
    order: Vec<String>,
    documents: HashMap<String, Vec<u8>>,
}

impl MemoryDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(Inner::default()),
        }
    }

    fn unavailable(&self) -> StoreError {
        StoreError::Unavailable(self.name.clone())
    }
}

impl Database for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let inner = self.inner.read().map_err(|_| self.unavailable())?;
        Ok(inner.documents.get(key).cloned())
    }

    fn update(&self, key: &str, document: Vec<u8>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| self.unavailable())?;
        if inner.documents.insert(key.to_string(), document).is_none() {
            inner.order.push(key.to_string());
        }
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        let inner = self.inner.read().map_err(|_| self.unavailable())?;
        Ok(inner.documents.len())
    }

    fn iterate(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]),
    ) -> Result<(), StoreError> {
        // Snapshot first so the visitor runs without the lock held and
        // may itself write to this database.
        let snapshot: Vec<(String, Vec<u8>)> = {
            let inner = self.inner.read().map_err(|_| self.unavailable())?;
            inner
                .order
                .iter()
                .filter_map(|key| {
                    inner
                        .documents
                        .get(key)
                        .map(|doc| (key.clone(), doc.clone()))
                })
                .collect()
        };
        for (key, document) in &snapshot {
            visitor(key, document);
        }
        Ok(())
    }

    fn documents_in_range(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let inner = self.inner.read().map_err(|_| self.unavailable())?;
        Ok(inner
            .order
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|key| inner.documents.get(key).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with(keys: &[&str]) -> MemoryDatabase {
        let db = MemoryDatabase::new("players");
        for key in keys {
            db.update(key, key.as_bytes().to_vec()).unwrap();
        }
        db
    }

    #[test]
    fn test_get_missing_key_returns_none() {
        let db = MemoryDatabase::new("players");

        assert_eq!(db.get("nobody").unwrap(), None);
    }

    #[test]
    fn test_update_overwrites_and_keeps_position() {
        let db = db_with(&["a", "b", "c"]);

        db.update("a", b"A2".to_vec()).unwrap();

        assert_eq!(db.count().unwrap(), 3);
        assert_eq!(db.get("a").unwrap(), Some(b"A2".to_vec()));
        assert_eq!(
            db.documents_in_range(0, 1).unwrap(),
            vec![b"A2".to_vec()]
        );
    }

    #[test]
    fn test_documents_in_range_pages_in_insertion_order() {
        let db = db_with(&["a", "b", "c", "d", "e"]);

        let page = db.documents_in_range(1, 3).unwrap();

        assert_eq!(page, vec![b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);
    }

    #[test]
    fn test_documents_in_range_past_end_is_empty() {
        let db = db_with(&["a"]);

        assert!(db.documents_in_range(5, 10).unwrap().is_empty());
    }

    #[test]
    fn test_iterate_visitor_may_write_back() {
        // The visitor runs on a snapshot, so writing doesn't deadlock.
        let db = db_with(&["a", "b"]);
        let mut seen = Vec::new();

        db.iterate(&mut |key: &str, _: &[u8]| {
            seen.push(key.to_string());
            db.update(&format!("{key}-copy"), Vec::new()).unwrap();
        })
        .unwrap();

        assert_eq!(seen, vec!["a", "b"]);
        assert_eq!(db.count().unwrap(), 4);
    }
}
