//! Record storage behind a narrow trait.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreResult;
use crate::record::{ComplianceLogEntry, StoredViolation};
use chrono::{DateTime, Utc};
use rightsguard_license::License;
use rightsguard_types::{LicenseStatus, ResolutionStatus, ViolationId};

/// Persistence used by the pipeline, the consumer and the monitor.
///
/// Licenses are keyed by integrity digest. Violations are insert-once by
/// id; only their resolution status changes afterwards, and only through
/// [`update_violation_status`](Self::update_violation_status).
pub trait RecordStore: Send + Sync {
    /// Inserts or replaces a license.
    fn put_license(&self, license: &License) -> StoreResult<()>;

    fn license(&self, digest: &str) -> StoreResult<Option<License>>;

    /// All stored licenses, oldest first.
    fn licenses(&self) -> StoreResult<Vec<License>>;

    /// Sets a license's lifecycle status. Returns false if no such license.
    fn set_license_status(&self, digest: &str, status: LicenseStatus) -> StoreResult<bool>;

    /// Inserts a violation unless one with the same id exists. Returns
    /// true if the record was inserted.
    fn insert_violation(&self, violation: &StoredViolation) -> StoreResult<bool>;

    fn violation(&self, id: ViolationId) -> StoreResult<Option<StoredViolation>>;

    /// Violations for a license, in detection order.
    fn violations_for(&self, license_digest: &str) -> StoreResult<Vec<StoredViolation>>;

    /// Moves a violation from `expected` to `next`. Returns false if the
    /// violation is missing or its status is no longer `expected`.
    fn update_violation_status(
        &self,
        id: ViolationId,
        expected: ResolutionStatus,
        next: ResolutionStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    fn append_compliance_log(&self, entry: &ComplianceLogEntry) -> StoreResult<()>;

    /// Compliance-log entries for a license, oldest first.
    fn compliance_log(&self, license_digest: &str) -> StoreResult<Vec<ComplianceLogEntry>>;
}
