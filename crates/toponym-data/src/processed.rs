use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use itertools::izip;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{Feature, FeatureClass, GeoRecord, LoadError, LoadReport, RecordStore, Result};

pub const RECORDS_PARQUET: &str = "records.parquet";

/// Alternate names can contain commas, so the snapshot joins them with the ASCII unit separator.
const ALTERNATE_NAMES_SEPARATOR: char = '\u{1f}';

/// Metadata describing a persisted record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub format_version: u32,
    pub records: usize,
    pub skipped_rows: usize,
    pub duplicate_ids: usize,
    /// Where the records were originally loaded from, if known.
    pub source: Option<String>,
    pub built_at: DateTime<Utc>,
}

impl StoreSnapshot {
    pub const FORMAT_VERSION: u32 = 1;

    pub fn ensure_compatible(&self) -> Result<()> {
        if self.format_version == Self::FORMAT_VERSION {
            Ok(())
        } else {
            Err(LoadError::IncompatibleSnapshot {
                found: self.format_version,
                expected: Self::FORMAT_VERSION,
            })
        }
    }

    fn report(&self) -> LoadReport {
        LoadReport {
            rows: self.records + self.skipped_rows + self.duplicate_ids,
            records: self.records,
            skipped_rows: self.skipped_rows,
            duplicate_ids: self.duplicate_ids,
        }
    }
}

impl RecordStore {
    /// Describe this store for a manifest.
    pub fn snapshot(&self, source: Option<String>) -> StoreSnapshot {
        let report = self.report();
        StoreSnapshot {
            format_version: StoreSnapshot::FORMAT_VERSION,
            records: self.len(),
            skipped_rows: report.skipped_rows,
            duplicate_ids: report.duplicate_ids,
            source,
            built_at: Utc::now(),
        }
    }

    /// Write every record to `dir/records.parquet`.
    #[instrument(name = "Save record store", skip(self), level = "debug")]
    pub fn save_parquet(&self, dir: &Path) -> Result<PathBuf> {
        let sink_time = std::time::Instant::now();
        let records = self.records();

        let mut df = df!(
            "id" => records.iter().map(|r| r.id).collect::<Vec<_>>(),
            "name" => records.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            "ascii_name" => records.iter().map(|r| r.ascii_name.as_deref()).collect::<Vec<_>>(),
            "alternate_names" => records
                .iter()
                .map(|r| r.alternate_names.join(&ALTERNATE_NAMES_SEPARATOR.to_string()))
                .collect::<Vec<_>>(),
            "latitude" => records.iter().map(|r| r.latitude).collect::<Vec<_>>(),
            "longitude" => records.iter().map(|r| r.longitude).collect::<Vec<_>>(),
            "feature_class" => records.iter().map(|r| r.feature.class.code()).collect::<Vec<_>>(),
            "feature_code" => records.iter().map(|r| r.feature.code.as_deref()).collect::<Vec<_>>(),
            "population" => records.iter().map(|r| r.population).collect::<Vec<_>>(),
            "country_code" => records.iter().map(|r| r.country_code.as_deref()).collect::<Vec<_>>(),
            "admin1_code" => records.iter().map(|r| r.admin1_code.as_deref()).collect::<Vec<_>>(),
            "admin2_code" => records.iter().map(|r| r.admin2_code.as_deref()).collect::<Vec<_>>(),
            "admin1_name" => records.iter().map(|r| r.admin1_name.as_deref()).collect::<Vec<_>>(),
        )?;

        let path = dir.join(RECORDS_PARQUET);
        let mut file = std::fs::File::create(&path)?;
        ParquetWriter::new(&mut file).finish(&mut df)?;

        info!(
            path = ?path,
            records = records.len(),
            sink_time = ?sink_time.elapsed(),
            "Saved records to parquet file"
        );
        Ok(path)
    }

    /// Reopen a store written by [`RecordStore::save_parquet`].
    #[instrument(name = "Load record store snapshot", skip(snapshot), level = "debug")]
    pub fn load_parquet(dir: &Path, snapshot: &StoreSnapshot) -> Result<Self> {
        snapshot.ensure_compatible()?;
        let t_load = std::time::Instant::now();
        let df = LazyFrame::scan_parquet(dir.join(RECORDS_PARQUET), Default::default())?.collect()?;

        let columns = izip!(
            df.column("id")?.u64()?,
            df.column("name")?.str()?,
            df.column("ascii_name")?.str()?,
            df.column("alternate_names")?.str()?,
            df.column("latitude")?.f64()?,
            df.column("longitude")?.f64()?,
            df.column("feature_class")?.str()?,
        )
        .zip(izip!(
            df.column("feature_code")?.str()?,
            df.column("population")?.u64()?,
            df.column("country_code")?.str()?,
            df.column("admin1_code")?.str()?,
            df.column("admin2_code")?.str()?,
            df.column("admin1_name")?.str()?,
        ));

        let mut records = Vec::with_capacity(df.height());
        for (
            row_index,
            (
                (id, name, ascii_name, alternate_names, latitude, longitude, feature_class),
                (feature_code, population, country_code, admin1_code, admin2_code, admin1_name),
            ),
        ) in columns.enumerate()
        {
            let (Some(id), Some(name), Some(latitude), Some(longitude)) =
                (id, name, latitude, longitude)
            else {
                return Err(LoadError::MalformedRow {
                    line: row_index + 1,
                    reason: "snapshot row is missing a mandatory column".to_string(),
                });
            };
            records.push(GeoRecord {
                id,
                name: name.to_string(),
                ascii_name: ascii_name.map(ToString::to_string),
                alternate_names: alternate_names
                    .filter(|alts| !alts.is_empty())
                    .map(|alts| {
                        alts.split(ALTERNATE_NAMES_SEPARATOR)
                            .map(ToString::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                latitude,
                longitude,
                feature: Feature::new(
                    FeatureClass::from_code(feature_class.unwrap_or_default()),
                    feature_code,
                ),
                population: population.unwrap_or_default(),
                country_code: country_code.map(ToString::to_string),
                admin1_code: admin1_code.map(ToString::to_string),
                admin2_code: admin2_code.map(ToString::to_string),
                admin1_name: admin1_name.map(ToString::to_string),
            });
        }

        if records.len() != snapshot.records {
            return Err(LoadError::SnapshotMismatch {
                expected: snapshot.records,
                found: records.len(),
            });
        }

        let store = Self::with_report(records, snapshot.report());
        info!(
            records = store.len(),
            time_collected = ?t_load.elapsed(),
            "Record store snapshot loaded"
        );
        Ok(store)
    }
}
