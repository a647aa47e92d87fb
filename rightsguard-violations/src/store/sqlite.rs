//! SQLite-backed record store.

use super::RecordStore;
use crate::error::{StoreError, StoreResult};
use crate::record::{ComplianceLogEntry, StoredViolation};
use chrono::{DateTime, SecondsFormat, Utc};
use rightsguard_license::License;
use rightsguard_types::{LicenseStatus, ResolutionStatus, ViolationId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Record store backed by a single SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!("Opened record store at {}", path.as_ref().display());
        Self::with_connection(conn)
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS licenses (
                digest TEXT PRIMARY KEY,
                license_id TEXT NOT NULL,
                record TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS violations (
                id TEXT PRIMARY KEY,
                detected_at TEXT NOT NULL,
                kind TEXT NOT NULL,
                severity TEXT NOT NULL,
                license_digest TEXT NOT NULL,
                platform TEXT NOT NULL,
                source TEXT NOT NULL,
                details TEXT NOT NULL,
                status TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS violations_by_license
                ON violations (license_digest, detected_at);

            CREATE TABLE IF NOT EXISTS compliance_log (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                license_digest TEXT NOT NULL,
                platform TEXT NOT NULL,
                purpose TEXT NOT NULL,
                source TEXT NOT NULL,
                compliant INTEGER NOT NULL,
                violations TEXT NOT NULL,
                elapsed_micros INTEGER NOT NULL,
                checked_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS compliance_log_by_license
                ON compliance_log (license_digest, seq);
            ",
        )?;
        Ok(())
    }
}

fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {raw:?}: {e}")))
}

fn corrupt<E: std::fmt::Display>(what: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::Corrupt(format!("{what}: {e}"))
}

/// Raw license row: the sealed record plus its current status.
fn decode_license(record: &str, status: &str) -> StoreResult<License> {
    let mut license: License = serde_json::from_str(record)?;
    license.status = status.parse().map_err(corrupt("license status"))?;
    Ok(license)
}

const VIOLATION_COLUMNS: &str =
    "id, detected_at, kind, severity, license_digest, platform, source, details, status, updated_at";

type ViolationRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
);

fn violation_row(row: &Row<'_>) -> rusqlite::Result<ViolationRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn decode_violation(row: ViolationRow) -> StoreResult<StoredViolation> {
    let (id, detected_at, kind, severity, license_digest, platform, source, details, status, updated_at) =
        row;
    Ok(StoredViolation {
        id: ViolationId::parse(&id).map_err(corrupt("violation id"))?,
        detected_at: parse_ts(&detected_at)?,
        kind: kind.parse().map_err(corrupt("violation kind"))?,
        severity: severity.parse().map_err(corrupt("severity"))?,
        license_digest,
        platform,
        source,
        details: serde_json::from_str(&details)?,
        status: status.parse().map_err(corrupt("resolution status"))?,
        updated_at: parse_ts(&updated_at)?,
    })
}

impl RecordStore for SqliteStore {
    fn put_license(&self, license: &License) -> StoreResult<()> {
        let record = serde_json::to_string(license)?;
        self.conn()?.execute(
            "INSERT INTO licenses (digest, license_id, record, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(digest) DO UPDATE SET record = excluded.record, status = excluded.status",
            params![
                license.digest,
                license.id.to_string(),
                record,
                license.status.as_str(),
                ts(&license.created_at),
            ],
        )?;
        Ok(())
    }

    fn license(&self, digest: &str) -> StoreResult<Option<License>> {
        let row: Option<(String, String)> = self
            .conn()?
            .query_row(
                "SELECT record, status FROM licenses WHERE digest = ?1",
                params![digest],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        row.map(|(record, status)| decode_license(&record, &status))
            .transpose()
    }

    fn licenses(&self) -> StoreResult<Vec<License>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT record, status FROM licenses ORDER BY created_at, license_id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.iter()
            .map(|(record, status)| decode_license(record, status))
            .collect()
    }

    fn set_license_status(&self, digest: &str, status: LicenseStatus) -> StoreResult<bool> {
        let changed = self.conn()?.execute(
            "UPDATE licenses SET status = ?1 WHERE digest = ?2",
            params![status.as_str(), digest],
        )?;
        Ok(changed == 1)
    }

    fn insert_violation(&self, v: &StoredViolation) -> StoreResult<bool> {
        let details = serde_json::to_string(&v.details)?;
        let inserted = self.conn()?.execute(
            "INSERT OR IGNORE INTO violations
             (id, detected_at, kind, severity, license_digest, platform, source, details, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                v.id.to_string(),
                ts(&v.detected_at),
                v.kind.as_str(),
                v.severity.as_str(),
                v.license_digest,
                v.platform,
                v.source,
                details,
                v.status.as_str(),
                ts(&v.updated_at),
            ],
        )?;
        Ok(inserted == 1)
    }

    fn violation(&self, id: ViolationId) -> StoreResult<Option<StoredViolation>> {
        let row = self
            .conn()?
            .query_row(
                &format!("SELECT {VIOLATION_COLUMNS} FROM violations WHERE id = ?1"),
                params![id.to_string()],
                violation_row,
            )
            .optional()?;
        row.map(decode_violation).transpose()
    }

    fn violations_for(&self, license_digest: &str) -> StoreResult<Vec<StoredViolation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {VIOLATION_COLUMNS} FROM violations
             WHERE license_digest = ?1 ORDER BY detected_at, id"
        ))?;
        let rows = stmt
            .query_map(params![license_digest], violation_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_violation).collect()
    }

    fn update_violation_status(
        &self,
        id: ViolationId,
        expected: ResolutionStatus,
        next: ResolutionStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let changed = self.conn()?.execute(
            "UPDATE violations SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
            params![next.as_str(), ts(&at), id.to_string(), expected.as_str()],
        )?;
        Ok(changed == 1)
    }

    fn append_compliance_log(&self, entry: &ComplianceLogEntry) -> StoreResult<()> {
        let violations = serde_json::to_string(&entry.violations)?;
        self.conn()?.execute(
            "INSERT INTO compliance_log
             (license_digest, platform, purpose, source, compliant, violations, elapsed_micros, checked_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.license_digest,
                entry.platform,
                entry.purpose,
                entry.source,
                entry.compliant,
                violations,
                i64::try_from(entry.elapsed_micros).unwrap_or(i64::MAX),
                ts(&entry.checked_at),
            ],
        )?;
        Ok(())
    }

    fn compliance_log(&self, license_digest: &str) -> StoreResult<Vec<ComplianceLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT license_digest, platform, purpose, source, compliant, violations, elapsed_micros, checked_at
             FROM compliance_log WHERE license_digest = ?1 ORDER BY seq",
        )?;
        let rows = stmt
            .query_map(params![license_digest], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(
                |(license_digest, platform, purpose, source, compliant, violations, elapsed, checked_at)|
                 -> StoreResult<ComplianceLogEntry> {
                    Ok(ComplianceLogEntry {
                        license_digest,
                        platform,
                        purpose,
                        source,
                        compliant,
                        violations: serde_json::from_str(&violations)?,
                        elapsed_micros: u64::try_from(elapsed).unwrap_or_default(),
                        checked_at: parse_ts(&checked_at)?,
                    })
                },
            )
            .collect()
    }
}
