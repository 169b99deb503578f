use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::{params, Connection};

use super::StoreError;
use crate::models::{RecordStatus, WellRecord};

/// Where the committed snapshot lives.
///
/// `save` must be all-or-nothing: after a failed save, `load` still
/// returns the previous snapshot.
pub trait SnapshotPersistence: Send + Sync {
    fn load(&self) -> Result<Vec<WellRecord>, StoreError>;
    fn save(&self, records: &[WellRecord]) -> Result<(), StoreError>;
}

// ═══════════════════════════════════════════════════════════
// JSON snapshot file
// ═══════════════════════════════════════════════════════════

/// One pretty-printed JSON array file, replaced atomically on every save.
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotPersistence for JsonFilePersistence {
    fn load(&self) -> Result<Vec<WellRecord>, StoreError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No snapshot file yet, starting empty");
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, records: &[WellRecord]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        // Temp file in the target directory so the rename stays on one filesystem.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, records)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        tracing::debug!(path = %self.path.display(), records = records.len(), "Snapshot saved");
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// SQLite
// ═══════════════════════════════════════════════════════════

/// Snapshot stored as ordered rows of `well_records`.
pub struct SqlitePersistence {
    conn: Mutex<Connection>,
}

impl SqlitePersistence {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA journal_mode=DELETE;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Run all pending migrations
fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_well_records.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| StoreError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .ok()
    .flatten()
    .unwrap_or(0)
}

impl SnapshotPersistence for SqlitePersistence {
    fn load(&self) -> Result<Vec<WellRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT operator, entity, state, county, effective_date, property_name,
                    property_description, decimal_interest, notes, status
             FROM well_records ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                WellRecord {
                    operator: row.get(0)?,
                    entity: row.get(1)?,
                    state: row.get(2)?,
                    county: row.get(3)?,
                    effective_date: row.get(4)?,
                    property_name: row.get(5)?,
                    property_description: row.get(6)?,
                    decimal_interest: row.get(7)?,
                    notes: row.get(8)?,
                    status: None,
                },
                row.get::<_, Option<String>>(9)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (mut record, status) = row?;
            record.status = status
                .map(|s| s.parse::<RecordStatus>())
                .transpose()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
            records.push(record);
        }
        Ok(records)
    }

    fn save(&self, records: &[WellRecord]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM well_records", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO well_records (position, operator, entity, state, county,
                    effective_date, property_name, property_description, decimal_interest,
                    notes, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (position, r) in records.iter().enumerate() {
                insert.execute(params![
                    position as i64,
                    r.operator,
                    r.entity,
                    r.state,
                    r.county,
                    r.effective_date,
                    r.property_name,
                    r.property_description,
                    r.decimal_interest,
                    r.notes,
                    r.status.map(|s| s.as_str()),
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(records = records.len(), "Snapshot saved to SQLite");
        Ok(())
    }
}

// ── In-memory persistence for tests ───────────────────────

/// Keeps the snapshot in memory. `fail_next_save` makes the next save
/// return an error without changing what `load` returns.
#[derive(Default)]
pub struct MemoryPersistence {
    records: Mutex<Vec<WellRecord>>,
    fail_next: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<WellRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn fail_next_save(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SnapshotPersistence for MemoryPersistence {
    fn load(&self) -> Result<Vec<WellRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.clone())
    }

    fn save(&self, records: &[WellRecord]) -> Result<(), StoreError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Persistence("simulated save failure".into()));
        }
        let mut stored = self.records.lock().map_err(|_| StoreError::LockPoisoned)?;
        *stored = records.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Shared persistence: lets tests keep a handle while the store owns another.
impl<P: SnapshotPersistence + ?Sized> SnapshotPersistence for std::sync::Arc<P> {
    fn load(&self) -> Result<Vec<WellRecord>, StoreError> {
        (**self).load()
    }

    fn save(&self, records: &[WellRecord]) -> Result<(), StoreError> {
        (**self).save(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<WellRecord> {
        vec![
            WellRecord {
                operator: Some("Acme Oil".into()),
                entity: Some("Smith Trust".into()),
                state: Some("TX".into()),
                property_name: Some("Smith 1H".into()),
                decimal_interest: Some("0.00125".into()),
                effective_date: Some("2024-01-01".into()),
                status: Some(RecordStatus::TitleIssue),
                notes: Some("needs curative".into()),
                ..Default::default()
            },
            WellRecord {
                property_name: Some("Jones 2".into()),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn json_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let p = JsonFilePersistence::new(dir.path().join("records.json"));
        assert!(p.load().unwrap().is_empty());
    }

    #[test]
    fn json_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let p = JsonFilePersistence::new(dir.path().join("nested").join("records.json"));
        p.save(&sample()).unwrap();
        assert_eq!(p.load().unwrap(), sample());

        let raw = std::fs::read_to_string(p.path()).unwrap();
        assert!(raw.contains("\"propertyName\": \"Smith 1H\""));
        assert!(raw.contains("\"status\": \"Title issue\""));
    }

    #[test]
    fn json_save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let p = JsonFilePersistence::new(dir.path().join("records.json"));
        p.save(&sample()).unwrap();
        p.save(&sample()[1..]).unwrap();
        assert_eq!(p.load().unwrap().len(), 1);
        // No temp files left behind.
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn json_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, "{not json").unwrap();
        let p = JsonFilePersistence::new(path);
        assert!(matches!(p.load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn json_failed_save_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("records.json");
        let p = JsonFilePersistence::new(&target);
        p.save(&sample()).unwrap();

        // A directory at the target path makes the rename fail.
        let blocked = JsonFilePersistence::new(dir.path().join("blocked"));
        std::fs::create_dir(dir.path().join("blocked")).unwrap();
        assert!(blocked.save(&sample()).is_err());

        assert_eq!(p.load().unwrap(), sample());
    }

    #[test]
    fn sqlite_save_then_load_preserves_order_and_status() {
        let p = SqlitePersistence::open_in_memory().unwrap();
        p.save(&sample()).unwrap();
        assert_eq!(p.load().unwrap(), sample());
    }

    #[test]
    fn sqlite_save_replaces_rows() {
        let p = SqlitePersistence::open_in_memory().unwrap();
        p.save(&sample()).unwrap();
        p.save(&[]).unwrap();
        assert!(p.load().unwrap().is_empty());
    }

    #[test]
    fn sqlite_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        SqlitePersistence::open(&path).unwrap().save(&sample()).unwrap();
        let reopened = SqlitePersistence::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap().len(), 2);
    }

    #[test]
    fn sqlite_migrations_are_idempotent() {
        let p = SqlitePersistence::open_in_memory().unwrap();
        let conn = p.conn.lock().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_current_version(&conn), 1);
    }

    #[test]
    fn memory_failed_save_keeps_previous() {
        let p = MemoryPersistence::with_records(sample());
        p.fail_next_save();
        assert!(p.save(&[]).is_err());
        assert_eq!(p.load().unwrap().len(), 2);
        p.save(&[]).unwrap();
        assert!(p.load().unwrap().is_empty());
        assert_eq!(p.save_count(), 1);
    }
}
