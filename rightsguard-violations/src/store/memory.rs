//! In-memory record store.

use super::RecordStore;
use crate::error::{StoreError, StoreResult};
use crate::record::{ComplianceLogEntry, StoredViolation};
use chrono::{DateTime, Utc};
use rightsguard_license::License;
use rightsguard_types::{LicenseStatus, ResolutionStatus, ViolationId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    licenses: Vec<License>,
    violations: Vec<StoredViolation>,
    violation_index: HashMap<ViolationId, usize>,
    compliance_log: Vec<ComplianceLogEntry>,
}

/// Record store kept in process memory. Contents are lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl RecordStore for MemoryStore {
    fn put_license(&self, license: &License) -> StoreResult<()> {
        let mut t = self.tables()?;
        match t.licenses.iter_mut().find(|l| l.digest == license.digest) {
            Some(existing) => *existing = license.clone(),
            None => t.licenses.push(license.clone()),
        }
        Ok(())
    }

    fn license(&self, digest: &str) -> StoreResult<Option<License>> {
        Ok(self
            .tables()?
            .licenses
            .iter()
            .find(|l| l.digest == digest)
            .cloned())
    }

    fn licenses(&self) -> StoreResult<Vec<License>> {
        Ok(self.tables()?.licenses.clone())
    }

    fn set_license_status(&self, digest: &str, status: LicenseStatus) -> StoreResult<bool> {
        let mut t = self.tables()?;
        Ok(match t.licenses.iter_mut().find(|l| l.digest == digest) {
            Some(license) => {
                license.status = status;
                true
            }
            None => false,
        })
    }

    fn insert_violation(&self, violation: &StoredViolation) -> StoreResult<bool> {
        let mut t = self.tables()?;
        if t.violation_index.contains_key(&violation.id) {
            return Ok(false);
        }
        let idx = t.violations.len();
        t.violations.push(violation.clone());
        t.violation_index.insert(violation.id, idx);
        Ok(true)
    }

    fn violation(&self, id: ViolationId) -> StoreResult<Option<StoredViolation>> {
        let t = self.tables()?;
        Ok(t.violation_index.get(&id).map(|&i| t.violations[i].clone()))
    }

    fn violations_for(&self, license_digest: &str) -> StoreResult<Vec<StoredViolation>> {
        Ok(self
            .tables()?
            .violations
            .iter()
            .filter(|v| v.license_digest == license_digest)
            .cloned()
            .collect())
    }

    fn update_violation_status(
        &self,
        id: ViolationId,
        expected: ResolutionStatus,
        next: ResolutionStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut t = self.tables()?;
        let Some(&idx) = t.violation_index.get(&id) else {
            return Ok(false);
        };
        let record = &mut t.violations[idx];
        if record.status != expected {
            return Ok(false);
        }
        record.status = next;
        record.updated_at = at;
        Ok(true)
    }

    fn append_compliance_log(&self, entry: &ComplianceLogEntry) -> StoreResult<()> {
        self.tables()?.compliance_log.push(entry.clone());
        Ok(())
    }

    fn compliance_log(&self, license_digest: &str) -> StoreResult<Vec<ComplianceLogEntry>> {
        Ok(self
            .tables()?
            .compliance_log
            .iter()
            .filter(|e| e.license_digest == license_digest)
            .cloned()
            .collect())
    }
}
