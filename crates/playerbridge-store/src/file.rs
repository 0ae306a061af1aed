//! A directory-backed [`Database`]: one `<key>.json` file per document.
//!
//! Every write is staged in its own uniquely named temporary file and
//! renamed into place, so a crash or a concurrent writer to the same key
//! leaves one whole document, never a torn file. Concurrent writers to
//! one key resolve to whichever rename lands last. Storage order is key
//! order, which keeps paging stable between writes.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{Database, StoreError};

const EXTENSION: &str = "json";

/// Stores each document as a file inside one directory.
#[derive(Debug, Clone)]
pub struct FileDatabase {
    name: String,
    directory: PathBuf,
}

impl FileDatabase {
    /// Opens (creating if needed) the collection `name` under `root`.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the directory can't be created, and
    /// [`StoreError::InvalidKey`] if `name` isn't a plain file name.
    pub fn open(
        root: impl AsRef<Path>,
        name: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let name = name.into();
        check_key(&name)?;
        let directory = root.as_ref().join(&name);
        fs::create_dir_all(&directory)?;
        tracing::info!(
            database = %name,
            path = %directory.display(),
            "file database opened"
        );
        Ok(Self { name, directory })
    }

    /// The directory holding this collection's documents.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        check_key(key)?;
        Ok(self.directory.join(format!("{key}.{EXTENSION}")))
    }

    /// All keys, sorted.
    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path_for(key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keys become file names, so only `[A-Za-z0-9_-]` is allowed.
fn check_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

impl Database for FileDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.read(key)
    }

    fn update(&self, key: &str, document: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        // Staged files are dot-prefixed without an extension, so `keys`
        // never lists them.
        let mut staged = NamedTempFile::new_in(&self.directory)?;
        staged.write_all(&document)?;
        staged.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.keys()?.len())
    }

    fn iterate(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]),
    ) -> Result<(), StoreError> {
        for key in self.keys()? {
            // A document removed between listing and reading is skipped.
            if let Some(document) = self.read(&key)? {
                visitor(&key, &document);
            }
        }
        Ok(())
    }

    fn documents_in_range(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut documents = Vec::new();
        for key in self.keys()?.into_iter().skip(offset).take(limit) {
            if let Some(document) = self.read(&key)? {
                documents.push(document);
            }
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_then_get_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = FileDatabase::open(dir.path(), "players").unwrap();

        db.update("abc-1", b"{}".to_vec()).unwrap();

        assert_eq!(db.get("abc-1").unwrap(), Some(b"{}".to_vec()));
        assert!(db.directory().join("abc-1.json").exists());
    }

    #[test]
    fn test_get_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let db = FileDatabase::open(dir.path(), "players").unwrap();

        assert_eq!(db.get("missing").unwrap(), None);
    }

    #[test]
    fn test_path_traversal_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db = FileDatabase::open(dir.path(), "players").unwrap();

        let result = db.update("../escape", Vec::new());

        assert!(matches!(result, Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_range_uses_key_order_and_ignores_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let db = FileDatabase::open(dir.path(), "players").unwrap();
        db.update("c", b"3".to_vec()).unwrap();
        db.update("a", b"1".to_vec()).unwrap();
        db.update("b", b"2".to_vec()).unwrap();
        fs::write(db.directory().join("d.json.tmp"), b"partial").unwrap();

        let page = db.documents_in_range(0, 10).unwrap();

        assert_eq!(page, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
        assert_eq!(db.count().unwrap(), 3);
    }

    #[test]
    fn test_concurrent_writers_to_one_key_leave_a_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let db = FileDatabase::open(dir.path(), "players").unwrap();
        let documents: Vec<Vec<u8>> = (0..4usize)
            .map(|writer| {
                let padding = "x".repeat(20_000 + writer * 1_000);
                format!(r#"{{"writer":{writer},"padding":"{padding}"}}"#)
                    .into_bytes()
            })
            .collect();

        for _ in 0..50 {
            std::thread::scope(|scope| {
                for document in &documents {
                    let db = &db;
                    scope.spawn(move || {
                        db.update("same-key", document.clone()).unwrap();
                    });
                }
            });

            let stored = db.get("same-key").unwrap().unwrap();
            assert!(documents.contains(&stored));
        }

        assert_eq!(db.count().unwrap(), 1);
        assert_eq!(fs::read_dir(db.directory()).unwrap().count(), 1);
    }

    #[test]
    fn test_reopen_sees_previous_documents() {
        let dir = tempfile::tempdir().unwrap();
        FileDatabase::open(dir.path(), "players")
            .unwrap()
            .update("a", b"1".to_vec())
            .unwrap();

        let reopened = FileDatabase::open(dir.path(), "players").unwrap();

        assert_eq!(reopened.count().unwrap(), 1);
    }
}
