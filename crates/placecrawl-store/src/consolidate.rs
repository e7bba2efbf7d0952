//! Offline merge of every partial artifact into a single master snapshot.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use placecrawl_core::{EntityId, StoreRecord};

use crate::error::StoreError;
use crate::master::{list_masters, write_master};
use crate::storage::Storage;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsolidationReport {
    pub files_read: usize,
    /// Partial files that could not be read or parsed.
    pub files_skipped: usize,
    pub records_in: usize,
    pub records_out: usize,
    /// Where the new master went; `None` when there was nothing to
    /// consolidate.
    pub master_location: Option<String>,
    pub masters_removed: usize,
}

/// Keep, per entity, the record with the latest `collected_at`. On equal
/// timestamps the one read later wins.
fn keep_latest(
    latest: &mut BTreeMap<EntityId, StoreRecord>,
    records: impl IntoIterator<Item = StoreRecord>,
) {
    for record in records {
        match latest.entry(record.entity_id) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if record.collected_at >= slot.get().collected_at {
                    slot.insert(record);
                }
            }
        }
    }
}

/// Merge every `*.json` below the partials directory into a new master,
/// then delete the older masters for `prefix`.
///
/// Unreadable partials are skipped with a warning. When no records are
/// found, no master is written and existing masters are left alone.
///
/// # Errors
///
/// Returns [`StoreError`] if the partials cannot be listed or the new master
/// cannot be written. Failing to delete an old master is only logged; the
/// next run cleans it up.
pub async fn consolidate(
    storage: &Storage,
    prefix: &str,
    now: DateTime<Utc>,
) -> Result<ConsolidationReport, StoreError> {
    let mut report = ConsolidationReport::default();
    let mut latest = BTreeMap::new();

    for key in storage.list_json(&storage.partials_dir()).await? {
        match storage.read_records(&key).await {
            Ok(records) => {
                report.files_read += 1;
                report.records_in += records.len();
                keep_latest(&mut latest, records);
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable partial");
                report.files_skipped += 1;
            }
        }
    }

    if report.records_in == 0 {
        tracing::info!(
            files_read = report.files_read,
            files_skipped = report.files_skipped,
            "nothing to consolidate"
        );
        return Ok(report);
    }

    let records: Vec<StoreRecord> = latest.into_values().collect();
    report.records_out = records.len();
    let master = write_master(storage, prefix, &records, now).await?;

    for old in list_masters(storage, prefix).await? {
        if old == master {
            continue;
        }
        match storage.delete(&old).await {
            Ok(()) => report.masters_removed += 1,
            Err(e) => {
                tracing::warn!(error = %e, "could not remove old master");
            }
        }
    }

    let location = storage.location_of(&master);
    tracing::info!(
        master = %location,
        files_read = report.files_read,
        files_skipped = report.files_skipped,
        records_in = report.records_in,
        records_out = report.records_out,
        masters_removed = report.masters_removed,
        "consolidation complete"
    );
    report.master_location = Some(location);
    Ok(report)
}
