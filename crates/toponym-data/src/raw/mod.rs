use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

#[cfg(feature = "download_data")]
pub mod fetch;

pub(crate) mod admin_codes;
pub(crate) mod all_countries;

use crate::{GeoRecord, LoadError, LoadReport};

pub use super::error::Result;

/// A GeoNames source file ready to be read, either the original path or the data
/// file extracted from a `.zip` archive.
#[derive(Debug)]
pub enum SourceFile {
    Plain(PathBuf),
    Extracted(NamedTempFile),
}

impl SourceFile {
    /// Open a source path, extracting the first data entry when it is a `.zip` archive.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("source file {} does not exist", path.display()),
            )
            .into());
        }
        let is_zip = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if is_zip {
            extract_data_entry_from_zip(path).map(Self::Extracted)
        } else {
            Ok(Self::Plain(path.to_path_buf()))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Plain(path) => path,
            Self::Extracted(file) => file.path(),
        }
    }
}

/// Extract the dump from a GeoNames archive.
///
/// Archives such as `allCountries.zip` hold one data file, sometimes next to a
/// `readme.txt`; the first non-readme entry wins.
pub fn extract_data_entry_from_zip(zip_file_path: &Path) -> Result<NamedTempFile> {
    let zip_fs_file = fs::File::open(zip_file_path)?;
    let mut archive = ZipArchive::new(zip_fs_file)?;

    let data_index = (0..archive.len())
        .find(|&i| {
            archive.name_for_index(i).is_some_and(|name| {
                !name.ends_with('/') && !name.to_ascii_lowercase().contains("readme")
            })
        })
        .ok_or(LoadError::EmptyArchive)?;

    let mut file_in_zip = archive.by_index(data_index)?;
    debug!(entry = file_in_zip.name(), "Extracting zip entry");

    let extracted_content_temp_file = NamedTempFile::with_suffix(".txt")?;
    let mut extracted_fs_file = fs::File::create(extracted_content_temp_file.path())?;

    std::io::copy(&mut file_in_zip, &mut extracted_fs_file)?;
    info!(path = ?extracted_content_temp_file.path(), "File extracted successfully");

    Ok(extracted_content_temp_file)
}

/// Read every valid record from a GeoNames dump.
///
/// Rows missing an id, a name, or a usable coordinate are skipped and counted in the
/// returned [`LoadReport`]; with `strict` the first such row aborts the read instead.
#[instrument(name = "Read GeoNames dump", skip_all, fields(path = ?path), level = "info")]
pub fn read_geonames(path: &Path, strict: bool) -> Result<(Vec<GeoRecord>, LoadReport)> {
    let source = SourceFile::open(path)?;
    if fs::metadata(source.path())?.len() == 0 {
        warn!("GeoNames source is empty");
        return Err(LoadError::NoValidRecords { skipped: 0 });
    }

    let df = all_countries::read_all_countries_df(source.path())?;
    let (records, report) = all_countries::records_from_df(&df, strict)?;

    if records.is_empty() {
        return Err(LoadError::NoValidRecords {
            skipped: report.skipped_rows,
        });
    }
    if report.skipped_rows > 0 {
        warn!(
            skipped_rows = report.skipped_rows,
            rows = report.rows,
            "Skipped malformed rows"
        );
    }
    info!(records = records.len(), "Parsed GeoNames records");
    Ok((records, report))
}
