//! Dashboard entry points over the record store and the ingestion pipeline.
//!
//! Every operation returns a typed result; `ServiceError::body()` gives the
//! structured `{ error: { code, message } }` form for callers that report
//! failures as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::config::{ConfigError, LedgerConfig, StoreBackend};
use crate::ledger::{
    JsonFilePersistence, MergeCounts, RecordStore, SnapshotPersistence, SqlitePersistence,
    StoreError,
};
use crate::models::{RecordUpdate, WellRecord};
use crate::pipeline::processor::{BatchOutcome, Document, DocumentProcessor, ProcessingError};

pub use crate::ledger::state_name;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Document processing is not configured")]
    ProcessorUnavailable,

    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// Structured error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(StoreError::IndexOutOfRange { .. }) => "INDEX_OUT_OF_RANGE",
            Self::Store(StoreError::InvalidStatus(_)) => "VALIDATION_FAILED",
            Self::Store(_) => "STORAGE_FAILED",
            Self::Processing(e) => e.code(),
            Self::Config(_) => "CONFIG_INVALID",
            Self::ProcessorUnavailable => "PROCESSOR_UNAVAILABLE",
            Self::Read { .. } => "READ_FAILED",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
        }
    }
}

/// Ingestion followed by a merge of every extracted record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub batch: BatchOutcome,
    pub merge: MergeCounts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Result of consolidating a directory of legacy snapshot files.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyImportReport {
    pub files_read: usize,
    pub records_read: usize,
    pub skipped: Vec<SkippedFile>,
    pub merge: MergeCounts,
}

/// Open the configured snapshot backend.
pub fn open_store(config: &LedgerConfig) -> Result<RecordStore, StoreError> {
    let path = config.store_path();
    let persistence: Box<dyn SnapshotPersistence> = match config.store_backend {
        StoreBackend::Json => Box::new(JsonFilePersistence::new(path.clone())),
        StoreBackend::Sqlite => Box::new(SqlitePersistence::open(&path)?),
    };
    tracing::info!(backend = ?config.store_backend, path = %path.display(), "Opening record store");
    RecordStore::open(persistence)
}

pub struct LedgerService {
    store: Arc<RecordStore>,
    processor: Option<DocumentProcessor>,
}

impl LedgerService {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            processor: None,
        }
    }

    pub fn with_processor(mut self, processor: DocumentProcessor) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Store-only service for the configured backend.
    pub fn open(config: &LedgerConfig) -> Result<Self, ServiceError> {
        Ok(Self::new(Arc::new(open_store(config)?)))
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    fn processor(&self) -> Result<&DocumentProcessor, ServiceError> {
        self.processor.as_ref().ok_or(ServiceError::ProcessorUnavailable)
    }

    // ── Ingestion ──────────────────────────────────────────────

    /// Extract records from documents without storing them.
    pub fn ingest(&self, documents: &[Document]) -> Result<BatchOutcome, ServiceError> {
        Ok(self.processor()?.process_batch(documents)?)
    }

    /// Merge reviewed records into the store.
    pub fn deploy(&self, records: Vec<WellRecord>) -> Result<MergeCounts, ServiceError> {
        Ok(self.store.merge(records)?)
    }

    /// Ingest and merge every record from the successful documents.
    pub fn ingest_and_deploy(&self, documents: &[Document]) -> Result<IngestReport, ServiceError> {
        let batch = self.ingest(documents)?;
        let merge = self.deploy(batch.records())?;
        Ok(IngestReport { batch, merge })
    }

    // ── Dashboard ──────────────────────────────────────────────

    /// All records, newest effective date first.
    pub fn snapshot(&self) -> Result<Vec<WellRecord>, ServiceError> {
        Ok(self.store.dashboard_snapshot()?)
    }

    pub fn records_by_state(&self, state: &str) -> Result<Vec<WellRecord>, ServiceError> {
        Ok(self.store.records_by_state(state)?)
    }

    pub fn update(&self, index: usize, update: RecordUpdate) -> Result<WellRecord, ServiceError> {
        Ok(self.store.update(index, update)?)
    }

    pub fn delete(&self, index: usize) -> Result<WellRecord, ServiceError> {
        Ok(self.store.delete(index)?)
    }

    pub fn dedup(&self) -> Result<usize, ServiceError> {
        Ok(self.store.dedup()?)
    }

    pub fn normalize_all(&self) -> Result<usize, ServiceError> {
        Ok(self.store.normalize_all()?)
    }

    pub fn clear(&self) -> Result<usize, ServiceError> {
        Ok(self.store.clear()?)
    }

    // ── Legacy consolidation ───────────────────────────────────

    /// Merge every `*.json` snapshot in `dir` into the store.
    ///
    /// Files may hold an array of records or a single record object. Files
    /// that cannot be read or parsed are skipped and reported. Records are
    /// normalized and deduplicated by the merge.
    pub fn import_legacy_dir(&self, dir: &Path) -> Result<LegacyImportReport, ServiceError> {
        let mut files = json_files(dir)?;
        files.sort();

        let mut report = LegacyImportReport::default();
        let mut records = Vec::new();
        for path in files {
            match read_legacy_file(&path) {
                Ok(mut found) => {
                    report.files_read += 1;
                    report.records_read += found.len();
                    records.append(&mut found);
                }
                Err(reason) => {
                    tracing::warn!(path = %path.display(), reason = %reason, "Skipping legacy file");
                    report.skipped.push(SkippedFile {
                        path: path.display().to_string(),
                        reason,
                    });
                }
            }
        }

        report.merge = self.store.merge(records)?;
        tracing::info!(
            files = report.files_read,
            skipped = report.skipped.len(),
            added = report.merge.added,
            "Legacy snapshots imported"
        );
        Ok(report)
    }
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>, ServiceError> {
    let read_err = |source| ServiceError::Read {
        path: dir.display().to_string(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json && path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

fn read_legacy_file(path: &Path) -> Result<Vec<WellRecord>, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| e.to_string())?;
    match value {
        serde_json::Value::Array(_) => serde_json::from_value(value).map_err(|e| e.to_string()),
        serde_json::Value::Object(_) => serde_json::from_value(value)
            .map(|record| vec![record])
            .map_err(|e| e.to_string()),
        _ => Err("expected an array or object of records".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryPersistence;
    use crate::models::RecordStatus;

    fn record(property: &str, date: &str) -> WellRecord {
        WellRecord {
            property_name: Some(property.into()),
            operator: Some("Acme".into()),
            entity: Some("Trust".into()),
            effective_date: Some(date.into()),
            ..Default::default()
        }
    }

    fn service() -> LedgerService {
        let store = RecordStore::open(Box::new(MemoryPersistence::new())).unwrap();
        LedgerService::new(Arc::new(store))
    }

    #[test]
    fn ingest_without_processor_is_unavailable() {
        let err = service().ingest(&[]).unwrap_err();
        assert_eq!(err.code(), "PROCESSOR_UNAVAILABLE");
    }

    #[test]
    fn error_body_carries_code_and_message() {
        let svc = service();
        let err = svc.delete(3).unwrap_err();
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["error"]["code"], "INDEX_OUT_OF_RANGE");
        assert!(body["error"]["message"].as_str().unwrap().contains('3'));
    }

    #[test]
    fn invalid_status_maps_to_validation() {
        let svc = service();
        svc.deploy(vec![record("A", "2024")]).unwrap();
        let err = svc
            .update(
                0,
                RecordUpdate {
                    notes: None,
                    status: Some("Approved".into()),
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn legacy_import_reads_arrays_and_objects_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"[{"propertyName":"Well A","operator":"Acme","entity":"Trust","effectiveDate":"2023","state":"texas","decimalInterest":0.5}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"{"propertyName":"well a","operator":"ACME","entity":"trust","effectiveDate":"2023"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let svc = service();
        let report = svc.import_legacy_dir(dir.path()).unwrap();
        assert_eq!(report.files_read, 2);
        assert_eq!(report.records_read, 2);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].path.ends_with("broken.json"));
        assert_eq!(report.merge.added, 1);
        assert_eq!(report.merge.duplicates_skipped, 1);

        let stored = svc.snapshot().unwrap();
        assert_eq!(stored[0].state.as_deref(), Some("TX"));
        assert_eq!(stored[0].decimal_interest.as_deref(), Some("0.5"));
    }

    #[test]
    fn legacy_import_keeps_records_with_retired_statuses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("snapshot.json"),
            r#"[
                {"propertyName":"Well A","operator":"Acme","effectiveDate":"2023","status":"in_pay"},
                {"propertyName":"Well B","operator":"Acme","effectiveDate":"2022","status":"title_issue"}
            ]"#,
        )
        .unwrap();

        let svc = service();
        let report = svc.import_legacy_dir(dir.path()).unwrap();
        assert_eq!(report.files_read, 1);
        assert_eq!(report.records_read, 2);
        assert!(report.skipped.is_empty());
        assert_eq!(report.merge.added, 2);

        let stored = svc.snapshot().unwrap();
        assert_eq!(stored[0].property_name.as_deref(), Some("Well A"));
        assert_eq!(stored[0].status, None);
        assert_eq!(stored[1].status, Some(RecordStatus::TitleIssue));
    }

    #[test]
    fn legacy_import_missing_dir_is_error() {
        let err = service()
            .import_legacy_dir(Path::new("/nonexistent/legacy"))
            .unwrap_err();
        assert_eq!(err.code(), "READ_FAILED");
    }

    #[test]
    fn open_store_uses_configured_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LedgerConfig::with_data_dir(dir.path().to_path_buf());

        let svc = LedgerService::open(&config).unwrap();
        svc.deploy(vec![record("A", "2024")]).unwrap();
        assert!(dir.path().join("records.json").exists());

        config.store_backend = StoreBackend::Sqlite;
        let svc = LedgerService::open(&config).unwrap();
        assert!(svc.snapshot().unwrap().is_empty());
        svc.deploy(vec![record("B", "2024")]).unwrap();
        let reopened = LedgerService::open(&config).unwrap();
        assert_eq!(reopened.snapshot().unwrap().len(), 1);
    }
}
