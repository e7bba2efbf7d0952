//! Master snapshot objects and the entity-id set loaded from them.

use chrono::{DateTime, Utc};
use object_store::path::Path as ObjectPath;
use placecrawl_core::{EntityId, MasterIdSet, StoreRecord};
use serde::Deserialize;

use crate::error::StoreError;
use crate::storage::Storage;

/// `<prefix>_<YYYYmmdd_HHMMSS_mmm>.json`; names sort in creation order.
#[must_use]
pub fn master_file_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{prefix}_{}.json", at.format("%Y%m%d_%H%M%S_%3f"))
}

/// Master snapshots for `prefix` directly in the master directory, oldest
/// first.
///
/// # Errors
///
/// Returns [`StoreError::Object`] if the directory cannot be listed.
pub async fn list_masters(storage: &Storage, prefix: &str) -> Result<Vec<ObjectPath>, StoreError> {
    let dir = storage.master_dir();
    let depth = dir.parts().count() + 1;
    let stem = format!("{prefix}_");
    Ok(storage
        .list_json(&dir)
        .await?
        .into_iter()
        .filter(|key| key.parts().count() == depth)
        .filter(|key| key.filename().is_some_and(|n| n.starts_with(&stem)))
        .collect())
}

/// # Errors
///
/// Returns [`StoreError::Object`] if the directory cannot be listed.
pub async fn latest_master(
    storage: &Storage,
    prefix: &str,
) -> Result<Option<ObjectPath>, StoreError> {
    Ok(list_masters(storage, prefix).await?.pop())
}

/// # Errors
///
/// Returns [`StoreError`] if the snapshot cannot be serialized or stored.
pub async fn write_master(
    storage: &Storage,
    prefix: &str,
    records: &[StoreRecord],
    at: DateTime<Utc>,
) -> Result<ObjectPath, StoreError> {
    let key = storage.master_dir().child(master_file_name(prefix, at));
    storage.write_records(&key, records).await?;
    Ok(key)
}

#[derive(Deserialize)]
struct IdOnly {
    entity_id: EntityId,
}

/// Entity ids in the latest master snapshot.
///
/// Never fails: no master yet, or one that cannot be read, gives an empty
/// set (the crawl then simply re-collects everything).
pub async fn load_master_ids(storage: &Storage, prefix: &str) -> MasterIdSet {
    let key = match latest_master(storage, prefix).await {
        Ok(Some(key)) => key,
        Ok(None) => {
            tracing::info!(
                dir = %storage.location_of(&storage.master_dir()),
                "no master snapshot yet"
            );
            return MasterIdSet::default();
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not list master snapshots");
            return MasterIdSet::default();
        }
    };

    match storage.read_json::<Vec<IdOnly>>(&key).await {
        Ok(rows) => {
            let ids: MasterIdSet = rows.into_iter().map(|r| r.entity_id).collect();
            tracing::info!(
                location = %storage.location_of(&key),
                ids = ids.len(),
                "master ids loaded"
            );
            ids
        }
        Err(e) => {
            tracing::warn!(error = %e, "unreadable master snapshot, starting with no known ids");
            MasterIdSet::default()
        }
    }
}
