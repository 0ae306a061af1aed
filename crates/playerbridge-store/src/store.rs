//! The offline store: typed access to every player ever seen.

use playerbridge_protocol::{
    Codec, JsonCodec, OfflinePlayerRecord, storage_key,
};
use uuid::Uuid;

use crate::{Database, StoreError};

/// Durable player records on top of a [`Database`].
///
/// Records are validated and encoded on the way in, decoded on the way
/// out. The store never deletes: it is the superset of everyone the
/// registry has ever held.
///
/// ## Undecodable documents
///
/// Point reads (`get`, `range_query`) fail with [`StoreError::Codec`] on
/// a document that doesn't decode. Bulk visits (`iterate_all`,
/// `for_each_by_name`) log a warning and skip it, so one bad document
/// can't block a fleet-wide operation.
#[derive(Debug)]
pub struct OfflineStore<D: Database, C: Codec = JsonCodec> {
    database: D,
    codec: C,
}

impl<D: Database> OfflineStore<D> {
    /// Creates a store that encodes documents as JSON.
    pub fn new(database: D) -> Self {
        Self::with_codec(database, JsonCodec)
    }
}

impl<D: Database, C: Codec> OfflineStore<D, C> {
    pub fn with_codec(database: D, codec: C) -> Self {
        Self { database, codec }
    }

    /// The underlying database.
    pub fn database(&self) -> &D {
        &self.database
    }

    /// Loads the record for `unique_id`. `Ok(None)` if never seen.
    pub fn get(
        &self,
        unique_id: &Uuid,
    ) -> Result<Option<OfflinePlayerRecord>, StoreError> {
        match self.database.get(&storage_key(unique_id))? {
            Some(document) => Ok(Some(self.codec.decode(&document)?)),
            None => Ok(None),
        }
    }

    /// Inserts or overwrites the record for `record.unique_id()`.
    ///
    /// Idempotent: writing the same record twice leaves one document.
    ///
    /// # Errors
    /// [`StoreError::Codec`] if the record fails validation (nothing is
    /// written), otherwise whatever the database reports.
    pub fn upsert(&self, record: &OfflinePlayerRecord) -> Result<(), StoreError> {
        record.validate()?;
        let document = self.codec.encode(record)?;
        self.database.update(&record.storage_key(), document)?;
        tracing::debug!(
            unique_id = %record.unique_id(),
            database = self.database.name(),
            "offline player stored"
        );
        Ok(())
    }

    /// Number of stored records.
    pub fn count_all(&self) -> Result<usize, StoreError> {
        self.database.count()
    }

    /// A page of records in storage order.
    ///
    /// The order is stable across calls as long as nothing is written in
    /// between, which is what paged administrative listings rely on.
    pub fn range_query(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<OfflinePlayerRecord>, StoreError> {
        self.database
            .documents_in_range(offset, limit)?
            .iter()
            .map(|document| self.codec.decode(document).map_err(StoreError::from))
            .collect()
    }

    /// Calls `visitor` once per stored record. Returns how many records
    /// were visited.
    pub fn iterate_all(
        &self,
        mut visitor: impl FnMut(OfflinePlayerRecord),
    ) -> Result<usize, StoreError> {
        let mut visited = 0;
        self.database.iterate(&mut |key: &str, document: &[u8]| {
            if let Some(record) = self.decode_or_warn(key, document) {
                visited += 1;
                visitor(record);
            }
        })?;
        Ok(visited)
    }

    /// Streams every record whose name equals `name` (ignoring case) to
    /// `visitor` without collecting them. Returns the match count.
    pub fn for_each_by_name(
        &self,
        name: &str,
        mut visitor: impl FnMut(OfflinePlayerRecord),
    ) -> Result<usize, StoreError> {
        let mut matched = 0;
        self.iterate_all(|record| {
            if record.identity.name_matches(name) {
                matched += 1;
                visitor(record);
            }
        })?;
        Ok(matched)
    }

    /// Every record whose name equals `name`, ignoring case.
    pub fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<OfflinePlayerRecord>, StoreError> {
        let mut found = Vec::new();
        self.for_each_by_name(name, |record| found.push(record))?;
        Ok(found)
    }

    fn decode_or_warn(
        &self,
        key: &str,
        document: &[u8],
    ) -> Option<OfflinePlayerRecord> {
        match self.codec.decode(document) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    key,
                    database = self.database.name(),
                    error = %e,
                    "skipping undecodable player document"
                );
                None
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
