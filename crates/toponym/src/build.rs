//! Offline index build with an all-or-nothing swap into place.
//!
//! Layout of a built index directory:
//!
//! ```text
//! <dest>/
//!   manifest.json     IndexManifest
//!   records.parquet   RecordStore snapshot
//!   tantivy/          name index
//! ```
//!
//! Everything is written into a staging directory next to `<dest>` first. `<dest>` is
//! only touched once the staging directory is complete, so a failed build leaves any
//! earlier index exactly as it was.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
pub use error::BuildError;
use error::Result;
use toponym_data::{RecordStore, StoreSnapshot};
use tracing::{info, instrument, warn};

use crate::config::BuildOptions;
use crate::index::{GazetteerIndex, IndexError};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const TANTIVY_DIR: &str = "tantivy";

const STAGING_PREFIX: &str = ".toponym-staging";
const PREVIOUS_PREFIX: &str = ".toponym-previous";
const PREVIOUS_INDEX: &str = "index";

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    /// Documents in the tantivy index; records without any indexable name have none.
    pub indexed_docs: u64,
    pub store: StoreSnapshot,
}

impl IndexManifest {
    pub const FORMAT_VERSION: u32 = 1;

    pub fn read(dir: &Path) -> std::result::Result<Self, IndexError> {
        let file = fs::File::open(dir.join(MANIFEST_FILE))?;
        let manifest: Self = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| anyhow::anyhow!("Unreadable index manifest: {e}"))?;
        if manifest.format_version != Self::FORMAT_VERSION {
            return Err(anyhow::anyhow!(
                "Index manifest format {} is not supported (expected {})",
                manifest.format_version,
                Self::FORMAT_VERSION
            )
            .into());
        }
        Ok(manifest)
    }

    fn write(&self, dir: &Path) -> Result<()> {
        let file = fs::File::create(dir.join(MANIFEST_FILE))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// What a successful [`build_index`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub dest: PathBuf,
    pub records: usize,
    pub indexed_docs: u64,
    pub skipped_rows: usize,
    pub duplicate_ids: usize,
    pub built_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Load `source`, build its index, and install the result at `dest`.
///
/// `dest` is replaced as a whole. If any step fails, the error is returned and
/// whatever was at `dest` before is still there.
#[instrument(name = "Build gazetteer index", skip(options), level = "info")]
pub fn build_index(source: &Path, dest: &Path, options: &BuildOptions) -> Result<BuildSummary> {
    let t_build = std::time::Instant::now();

    if dest.exists() && !dest.is_dir() {
        return Err(BuildError::InvalidDestination(dest.to_path_buf()));
    }
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => return Err(BuildError::InvalidDestination(dest.to_path_buf())),
    };
    fs::create_dir_all(&parent)?;

    let store = RecordStore::load(source, &options.load)?;

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&parent)?;
    info!(staging = ?staging.path(), "Writing index to staging directory");

    let manifest = write_index_files(&store, staging.path(), options, source)?;
    install(staging.path(), dest, &parent)?;

    let report = store.report();
    let summary = BuildSummary {
        dest: dest.to_path_buf(),
        records: store.len(),
        indexed_docs: manifest.indexed_docs,
        skipped_rows: report.skipped_rows,
        duplicate_ids: report.duplicate_ids,
        built_at: manifest.store.built_at,
        elapsed: t_build.elapsed(),
    };
    info!(
        records = summary.records,
        indexed_docs = summary.indexed_docs,
        skipped_rows = summary.skipped_rows,
        elapsed = ?summary.elapsed,
        "Index build complete"
    );
    Ok(summary)
}

fn write_index_files(
    store: &RecordStore,
    dir: &Path,
    options: &BuildOptions,
    source: &Path,
) -> Result<IndexManifest> {
    store.save_parquet(dir)?;

    let tantivy_dir = dir.join(TANTIVY_DIR);
    fs::create_dir(&tantivy_dir)?;
    let index = GazetteerIndex::build_in_dir(store, &tantivy_dir, &options.index)?;

    let manifest = IndexManifest {
        format_version: IndexManifest::FORMAT_VERSION,
        indexed_docs: index.num_docs(),
        store: store.snapshot(Some(source.display().to_string())),
    };
    manifest.write(dir)?;
    Ok(manifest)
}

/// Move a complete staging directory to `dest`, restoring the previous `dest` if the
/// final rename fails.
fn install(staging: &Path, dest: &Path, parent: &Path) -> Result<()> {
    if !dest.exists() {
        fs::rename(staging, dest)?;
        return Ok(());
    }

    // dropped at the end of this function, taking the previous index with it
    let previous = tempfile::Builder::new()
        .prefix(PREVIOUS_PREFIX)
        .tempdir_in(parent)?;
    fs::rename(dest, previous.path().join(PREVIOUS_INDEX))?;

    if let Err(e) = fs::rename(staging, dest) {
        warn!(error = ?e, dest = ?dest, "Installing new index failed, restoring previous one");
        restore_previous(previous, dest)?;
        return Err(e.into());
    }
    Ok(())
}

/// Move the index parked in `previous` back to `dest`. If that fails too, the parked
/// copy is kept on disk instead of being deleted with `previous`.
fn restore_previous(previous: tempfile::TempDir, dest: &Path) -> Result<()> {
    let previous_index = previous.path().join(PREVIOUS_INDEX);
    if let Err(e) = fs::rename(&previous_index, dest) {
        let kept = previous.keep().join(PREVIOUS_INDEX);
        warn!(error = ?e, kept = ?kept, "Restoring previous index failed, leaving it in place");
        return Err(e.into());
    }
    Ok(())
}

mod error {
    use std::path::PathBuf;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum BuildError {
        #[error("Load error: {0}")]
        Load(#[from] toponym_data::LoadError),
        #[error("Index error: {0}")]
        Index(#[from] crate::index::IndexError),
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Serialization error: {0}")]
        Serde(#[from] serde_json::Error),
        #[error("Invalid index destination: {0}")]
        InvalidDestination(PathBuf),
    }
    pub type Result<T> = std::result::Result<T, BuildError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use toponym_data::{TestDataConfig, create_test_data};

    fn staging_leftovers(parent: &Path) -> usize {
        fs::read_dir(parent)
            .unwrap()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(".toponym-"))
            .count()
    }

    #[test]
    fn test_build_index_writes_layout() {
        let (dump, _) = create_test_data(&TestDataConfig::minimal()).unwrap();
        let parent = tempfile::tempdir().unwrap();
        let dest = parent.path().join("index");

        let summary = build_index(dump.path(), &dest, &BuildOptions::default()).unwrap();
        assert_eq!(summary.records, TestDataConfig::minimal().expected_records());
        assert_eq!(summary.indexed_docs, summary.records as u64);

        assert!(dest.join(MANIFEST_FILE).is_file());
        assert!(dest.join(toponym_data::RECORDS_PARQUET).is_file());
        assert!(dest.join(TANTIVY_DIR).join("meta.json").is_file());

        let manifest = IndexManifest::read(&dest).unwrap();
        assert_eq!(manifest.indexed_docs, summary.indexed_docs);
        assert_eq!(manifest.store.records, summary.records);
        assert_eq!(manifest.store.built_at, summary.built_at);
        assert_eq!(staging_leftovers(parent.path()), 0);
    }

    #[test]
    fn test_failed_build_leaves_previous_index() {
        let (dump, _) = create_test_data(&TestDataConfig::minimal()).unwrap();
        let parent = tempfile::tempdir().unwrap();
        let dest = parent.path().join("index");
        build_index(dump.path(), &dest, &BuildOptions::default()).unwrap();
        let manifest_before = fs::read(dest.join(MANIFEST_FILE)).unwrap();

        let missing = parent.path().join("does-not-exist.txt");
        let result = build_index(&missing, &dest, &BuildOptions::default());
        assert!(matches!(result, Err(BuildError::Load(_))));

        assert_eq!(fs::read(dest.join(MANIFEST_FILE)).unwrap(), manifest_before);
        assert_eq!(staging_leftovers(parent.path()), 0);
    }

    #[test]
    fn test_rebuild_replaces_previous_index() {
        let parent = tempfile::tempdir().unwrap();
        let dest = parent.path().join("index");

        let (minimal, _) = create_test_data(&TestDataConfig::minimal()).unwrap();
        build_index(minimal.path(), &dest, &BuildOptions::default()).unwrap();

        let (sample, _) = create_test_data(&TestDataConfig::sample()).unwrap();
        let summary = build_index(sample.path(), &dest, &BuildOptions::default()).unwrap();

        assert_eq!(summary.records, TestDataConfig::sample().expected_records());
        assert_eq!(summary.skipped_rows, 2);
        assert_eq!(IndexManifest::read(&dest).unwrap().store.records, summary.records);
        assert_eq!(staging_leftovers(parent.path()), 0);
    }

    fn parked_index(parent: &Path) -> (tempfile::TempDir, PathBuf) {
        let previous = tempfile::Builder::new()
            .prefix(PREVIOUS_PREFIX)
            .tempdir_in(parent)
            .unwrap();
        let index = previous.path().join(PREVIOUS_INDEX);
        fs::create_dir(&index).unwrap();
        fs::write(index.join(MANIFEST_FILE), b"{}").unwrap();
        (previous, index)
    }

    #[test]
    fn test_restore_previous_moves_index_back() {
        let parent = tempfile::tempdir().unwrap();
        let dest = parent.path().join("index");
        let (previous, _) = parked_index(parent.path());

        restore_previous(previous, &dest).unwrap();
        assert_eq!(fs::read(dest.join(MANIFEST_FILE)).unwrap(), b"{}");
        assert_eq!(staging_leftovers(parent.path()), 0);
    }

    #[test]
    fn test_failed_restore_keeps_previous_index() {
        let parent = tempfile::tempdir().unwrap();
        // a non-empty directory at dest makes the rename back fail
        let dest = parent.path().join("index");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("partial"), b"new").unwrap();
        let (previous, parked) = parked_index(parent.path());

        assert!(matches!(restore_previous(previous, &dest), Err(BuildError::Io(_))));
        assert_eq!(fs::read(parked.join(MANIFEST_FILE)).unwrap(), b"{}");
        assert_eq!(staging_leftovers(parent.path()), 1);
    }

    #[test]
    fn test_destination_must_be_a_directory() {
        let (dump, _) = create_test_data(&TestDataConfig::minimal()).unwrap();
        let parent = tempfile::tempdir().unwrap();
        let dest = parent.path().join("index");
        fs::write(&dest, b"not a directory").unwrap();

        assert!(matches!(
            build_index(dump.path(), &dest, &BuildOptions::default()),
            Err(BuildError::InvalidDestination(_))
        ));
    }
}
