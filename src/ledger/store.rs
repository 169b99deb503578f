use std::sync::{Arc, Mutex, RwLock};

use super::merge::{dashboard_order, dedup_records, merge_records, sorted_snapshot, MergeCounts};
use super::normalize::{normalize_record, normalize_state};
use super::persistence::SnapshotPersistence;
use super::StoreError;
use crate::models::{RecordStatus, RecordUpdate, WellRecord};

/// The well-record ledger: one committed snapshot behind a single writer.
///
/// Readers clone an `Arc` of the last committed snapshot without waiting on
/// writers. Writers are serialized; each builds the next snapshot, persists
/// it, and only then publishes it. A failed save leaves both the persisted
/// and the in-memory snapshot unchanged.
///
/// Index-addressed operations (`update`, `delete`) use positions in the
/// dashboard order returned by [`RecordStore::dashboard_snapshot`].
pub struct RecordStore {
    persistence: Box<dyn SnapshotPersistence>,
    committed: RwLock<Arc<Vec<WellRecord>>>,
    writer: Mutex<()>,
}

impl RecordStore {
    pub fn open(persistence: Box<dyn SnapshotPersistence>) -> Result<Self, StoreError> {
        let records = persistence.load()?;
        tracing::info!(records = records.len(), "Record store opened");
        Ok(Self {
            persistence,
            committed: RwLock::new(Arc::new(records)),
            writer: Mutex::new(()),
        })
    }

    /// Committed records in store (insertion) order.
    pub fn snapshot(&self) -> Result<Arc<Vec<WellRecord>>, StoreError> {
        let guard = self.committed.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(Arc::clone(&guard))
    }

    /// Committed records by effective date, newest first.
    pub fn dashboard_snapshot(&self) -> Result<Vec<WellRecord>, StoreError> {
        Ok(sorted_snapshot(&self.snapshot()?))
    }

    /// Dashboard snapshot restricted to one state (compared after normalization).
    pub fn records_by_state(&self, state: &str) -> Result<Vec<WellRecord>, StoreError> {
        let wanted = normalize_state(state).to_lowercase();
        Ok(self
            .dashboard_snapshot()?
            .into_iter()
            .filter(|r| {
                r.state
                    .as_deref()
                    .is_some_and(|s| normalize_state(s).to_lowercase() == wanted)
            })
            .collect())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.snapshot()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Run one serialized write. `apply` returns the next snapshot, or
    /// `None` when nothing changed (no save happens).
    fn write<T>(
        &self,
        apply: impl FnOnce(&[WellRecord]) -> Result<(Option<Vec<WellRecord>>, T), StoreError>,
    ) -> Result<T, StoreError> {
        let _writer = self.writer.lock().map_err(|_| StoreError::LockPoisoned)?;
        let current = self.snapshot()?;
        let (next, outcome) = apply(&current)?;
        if let Some(next) = next {
            self.persistence.save(&next)?;
            let mut committed = self.committed.write().map_err(|_| StoreError::LockPoisoned)?;
            *committed = Arc::new(next);
        }
        Ok(outcome)
    }

    /// Merge new records, skipping identity duplicates.
    pub fn merge(&self, incoming: Vec<WellRecord>) -> Result<MergeCounts, StoreError> {
        self.write(|current| {
            let result = merge_records(current, incoming);
            let next = (result.counts.added > 0).then_some(result.merged);
            Ok((next, result.counts))
        })
        .inspect(|counts| {
            tracing::info!(
                added = counts.added,
                duplicates_skipped = counts.duplicates_skipped,
                "Records merged into store"
            );
        })
    }

    /// Apply reviewer edits to the record at a dashboard index.
    pub fn update(&self, index: usize, update: RecordUpdate) -> Result<WellRecord, StoreError> {
        let status = update
            .status
            .as_deref()
            .map(|s| {
                s.parse::<RecordStatus>()
                    .map_err(|_| StoreError::InvalidStatus(s.to_string()))
            })
            .transpose()?;

        self.write(|current| {
            let position = resolve_index(current, index)?;
            let mut next = current.to_vec();
            let record = &mut next[position];
            if let Some(notes) = update.notes {
                record.notes = Some(notes);
            }
            if status.is_some() {
                record.status = status;
            }
            let updated = record.clone();
            let changed = updated != current[position];
            Ok((changed.then_some(next), updated))
        })
        .inspect(|_| tracing::info!(index, "Record updated"))
    }

    /// Remove and return the record at a dashboard index.
    pub fn delete(&self, index: usize) -> Result<WellRecord, StoreError> {
        self.write(|current| {
            let position = resolve_index(current, index)?;
            let mut next = current.to_vec();
            let removed = next.remove(position);
            Ok((Some(next), removed))
        })
        .inspect(|_| tracing::info!(index, "Record deleted"))
    }

    /// Standalone deduplication. Returns the number of records removed.
    pub fn dedup(&self) -> Result<usize, StoreError> {
        self.write(|current| {
            let (kept, removed) = dedup_records(current.to_vec());
            Ok(((removed > 0).then_some(kept), removed))
        })
        .inspect(|removed| tracing::info!(removed, "Store deduplicated"))
    }

    /// Re-apply field normalization to every record. Returns how many changed.
    pub fn normalize_all(&self) -> Result<usize, StoreError> {
        self.write(|current| {
            let mut next = current.to_vec();
            let changed = next
                .iter_mut()
                .map(normalize_record)
                .filter(|changed| *changed)
                .count();
            Ok(((changed > 0).then_some(next), changed))
        })
        .inspect(|changed| tracing::info!(changed, "Store renormalized"))
    }

    /// Remove every record. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, StoreError> {
        self.write(|current| {
            let removed = current.len();
            Ok(((removed > 0).then(Vec::new), removed))
        })
        .inspect(|removed| tracing::info!(removed, "Store cleared"))
    }
}

/// Map a dashboard index to a store position.
fn resolve_index(records: &[WellRecord], index: usize) -> Result<usize, StoreError> {
    dashboard_order(records)
        .get(index)
        .copied()
        .ok_or(StoreError::IndexOutOfRange {
            index,
            len: records.len(),
        })
}
