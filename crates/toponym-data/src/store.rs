use std::path::{Path, PathBuf};

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{GeoRecord, NotFound, Result, raw};

/// Options for reading a raw GeoNames dump into a [`RecordStore`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Fail on the first malformed row instead of skipping it.
    pub strict: bool,
    /// Optional `admin1CodesASCII.txt` used to fill [`GeoRecord::admin1_name`].
    pub admin1_codes: Option<PathBuf>,
}

impl LoadOptions {
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn admin1_codes(mut self, path: impl Into<PathBuf>) -> Self {
        self.admin1_codes = Some(path.into());
        self
    }
}

/// What happened while a store was loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Data rows seen in the source.
    pub rows: usize,
    /// Records kept in the store.
    pub records: usize,
    /// Rows dropped for missing or unparseable mandatory fields.
    pub skipped_rows: usize,
    /// Rows dropped because an earlier row had the same id.
    pub duplicate_ids: usize,
}

/// Immutable table of gazetteer records with id lookup.
///
/// Records are kept sorted by id, which also makes iteration order (and therefore
/// anything built from it) independent of the source row order.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<GeoRecord>,
    by_id: HashMap<u64, usize>,
    report: LoadReport,
}

impl RecordStore {
    /// Load a GeoNames dump (`.txt` or `.zip`).
    #[instrument(
        name = "Load record store",
        skip_all,
        fields(source = ?source.as_ref()),
        level = "info"
    )]
    pub fn load(source: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let t_load = std::time::Instant::now();
        let (mut records, report) = raw::read_geonames(source.as_ref(), options.strict)?;

        if let Some(admin1_path) = &options.admin1_codes {
            let admin1_names = raw::admin_codes::read_admin1_names(admin1_path)?;
            for record in &mut records {
                record.admin1_name = record
                    .admin1_key()
                    .and_then(|key| admin1_names.get(&key).cloned());
            }
        }

        let store = Self::with_report(records, report);
        info!(
            records = store.len(),
            skipped_rows = store.report.skipped_rows,
            duplicate_ids = store.report.duplicate_ids,
            elapsed = ?t_load.elapsed(),
            "Record store loaded"
        );
        Ok(store)
    }

    /// Build a store from records already in memory. Later duplicates of an id are dropped.
    pub fn from_records(records: Vec<GeoRecord>) -> Self {
        let report = LoadReport {
            rows: records.len(),
            ..LoadReport::default()
        };
        Self::with_report(records, report)
    }

    pub(crate) fn with_report(mut records: Vec<GeoRecord>, mut report: LoadReport) -> Self {
        // stable sort keeps the first occurrence of a duplicated id in front
        records.sort_by_key(|record| record.id);
        let before = records.len();
        records.dedup_by_key(|record| record.id);
        let duplicates = before - records.len();
        if duplicates > 0 {
            warn!(duplicates, "Dropped records with duplicate ids");
        }

        report.duplicate_ids += duplicates;
        report.records = records.len();

        let by_id = records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.id, position))
            .collect();

        Self {
            records,
            by_id,
            report,
        }
    }

    pub fn get(&self, id: u64) -> std::result::Result<&GeoRecord, NotFound> {
        self.by_id
            .get(&id)
            .map(|&position| &self.records[position])
            .ok_or(NotFound { id })
    }

    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &GeoRecord> {
        self.records.iter()
    }

    #[must_use]
    pub fn records(&self) -> &[GeoRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub const fn report(&self) -> &LoadReport {
        &self.report
    }
}

impl<'a> IntoIterator for &'a RecordStore {
    type Item = &'a GeoRecord;
    type IntoIter = std::slice::Iter<'a, GeoRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
