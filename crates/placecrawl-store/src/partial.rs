//! Partial-output artifacts: one object per checkpoint flush.

use async_trait::async_trait;
use object_store::path::Path as ObjectPath;
use placecrawl_core::StoreRecord;
use placecrawl_scraper::{CheckpointSink, ScraperError};
use uuid::Uuid;

use crate::error::StoreError;
use crate::storage::Storage;

/// Writes checkpoint batches under `partials/<run_id>/worker_<id>/`.
#[derive(Debug, Clone)]
pub struct PartialWriter {
    storage: Storage,
    run_dir: ObjectPath,
}

impl PartialWriter {
    #[must_use]
    pub fn new(storage: Storage, run_id: Uuid) -> Self {
        let run_dir = storage.partials_dir().child(run_id.to_string());
        Self { storage, run_dir }
    }

    #[must_use]
    pub fn run_dir(&self) -> &ObjectPath {
        &self.run_dir
    }

    #[must_use]
    pub fn run_location(&self) -> String {
        self.storage.location_of(&self.run_dir)
    }

    #[must_use]
    pub fn key_for(&self, worker_id: usize, seq: usize) -> ObjectPath {
        self.run_dir
            .child(format!("worker_{worker_id}"))
            .child(format!("part_{seq:04}.json"))
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the batch cannot be stored.
    pub async fn write(
        &self,
        worker_id: usize,
        seq: usize,
        batch: &[StoreRecord],
    ) -> Result<ObjectPath, StoreError> {
        let key = self.key_for(worker_id, seq);
        self.storage.write_records(&key, batch).await?;
        Ok(key)
    }
}

#[async_trait]
impl CheckpointSink for PartialWriter {
    async fn flush(
        &self,
        worker_id: usize,
        seq: usize,
        batch: &[StoreRecord],
    ) -> Result<(), ScraperError> {
        let key = self
            .write(worker_id, seq, batch)
            .await
            .map_err(|e| ScraperError::Checkpoint {
                reason: e.to_string(),
            })?;
        tracing::debug!(
            location = %self.storage.location_of(&key),
            records = batch.len(),
            "partial written"
        );
        Ok(())
    }
}
