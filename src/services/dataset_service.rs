use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::record::{sample_records, KpiRecord};
use crate::services::csv_import;

/// In-memory store for the currently loaded dataset.
///
/// Mutations replace the whole record set atomically and bump a revision
/// counter, which downstream caches use as their invalidation key. A
/// failed import leaves the previous dataset untouched.
pub struct DatasetService {
    records: RwLock<Vec<KpiRecord>>,
    revision: AtomicU64,
    sample_mode: AtomicBool,
}

impl DatasetService {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            revision: AtomicU64::new(0),
            sample_mode: AtomicBool::new(false),
        }
    }

    /// Parses and installs an uploaded CSV/TSV export. Rejects uploads
    /// that produce no usable rows without touching the current data.
    pub fn import_csv(&self, text: &str) -> AppResult<usize> {
        let parsed = csv_import::parse_csv(text);
        if parsed.is_empty() {
            return Err(AppError::validation(
                "no valid data rows found in the uploaded file",
            ));
        }
        let count = parsed.len();
        self.replace(parsed, false)?;
        info!(target: "app::dataset", rows = count, "csv import installed");
        Ok(count)
    }

    /// Installs the bundled demo dataset.
    pub fn load_sample(&self) -> AppResult<usize> {
        let rows = sample_records();
        let count = rows.len();
        self.replace(rows, true)?;
        info!(target: "app::dataset", rows = count, "sample dataset installed");
        Ok(count)
    }

    pub fn clear(&self) -> AppResult<()> {
        self.replace(Vec::new(), false)?;
        info!(target: "app::dataset", "dataset cleared");
        Ok(())
    }

    /// True while the bundled demo dataset is the active one.
    pub fn is_sample_mode(&self) -> bool {
        self.sample_mode.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> AppResult<Vec<KpiRecord>> {
        Ok(self.read_guard()?.clone())
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.read_guard()?.is_empty())
    }

    /// Distinct non-blank period labels in first-appearance order.
    pub fn periods(&self) -> AppResult<Vec<String>> {
        let guard = self.read_guard()?;
        let mut seen = Vec::new();
        for record in guard.iter() {
            if !record.period.is_empty() && !seen.contains(&record.period) {
                seen.push(record.period.clone());
            }
        }
        Ok(seen)
    }

    /// Monotonic counter bumped on every mutation. Equal revisions imply
    /// an identical record set.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    fn replace(&self, rows: Vec<KpiRecord>, sample: bool) -> AppResult<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| AppError::other("dataset lock poisoned"))?;
        *guard = rows;
        self.sample_mode.store(sample, Ordering::SeqCst);
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(target: "app::dataset", revision, "dataset revision advanced");
        Ok(())
    }

    fn read_guard(&self) -> AppResult<std::sync::RwLockReadGuard<'_, Vec<KpiRecord>>> {
        self.records
            .read()
            .map_err(|_| AppError::other("dataset lock poisoned"))
    }
}

impl Default for DatasetService {
    fn default() -> Self {
        Self::new()
    }
}
