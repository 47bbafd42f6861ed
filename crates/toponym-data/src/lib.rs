//! GeoNames ingestion and the in-memory record store behind the `toponym` gazetteer.
//!
//! The crate turns a GeoNames dump (`allCountries.txt`, `citiesN.txt`, or their `.zip`
//! archives) into an immutable [`RecordStore`] of [`GeoRecord`]s, and persists that store
//! as a Parquet snapshot so it can be reopened next to a prebuilt search index.
use once_cell::sync::Lazy;
use std::path::PathBuf;
use tracing::debug;

mod error;
pub mod processed;
pub mod raw;
mod record;
mod store;
pub mod test_data;

pub use error::{LoadError, NotFound, Result};
pub use processed::{RECORDS_PARQUET, StoreSnapshot};
pub use record::{Feature, FeatureClass, GeoRecord};
pub use store::{LoadOptions, LoadReport, RecordStore};
pub use test_data::{TestDataConfig, create_test_data};

pub const DATA_DIR_DEFAULT: &str = "./toponym_data";

/// Environment variable overriding where downloads and built indexes are kept.
pub const DATA_DIR_ENV: &str = "TOPONYM_DATA_DIR";

/// Global data directory path.
///
/// Resolution order: `TOPONYM_DATA_DIR`, the platform data directory (with the
/// `system-dirs` feature), then `./toponym_data`.
pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    #[cfg(feature = "system-dirs")]
    if let Some(dirs) = directories::ProjectDirs::from("org", "geonames", "toponym") {
        let dir = dirs.data_dir().to_path_buf();
        debug!(dir = ?dir, "Using platform data directory");
        return dir;
    }
    debug!("Falling back to default data directory");
    PathBuf::from(DATA_DIR_DEFAULT)
});

pub fn get_data_dir() -> &'static std::path::Path {
    DATA_DIR.as_path()
}

#[cfg(test)]
pub(crate) mod tests_utils {
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub fn write_lines(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    pub fn create_test_all_countries_file() -> NamedTempFile {
        write_lines(&[
            "6252001\tUnited States\tUnited States\tUS,USA,America\t39.76\t-98.5\tA\tPCLI\tUS\t\t00\t\t\t\t327167434\t\t543\tAmerica/Chicago\t2023-01-01",
            "5332921\tCalifornia\tCalifornia\tCA,Calif\t37.25022\t-119.75126\tA\tADM1\tUS\t\tCA\t\t\t\t37691912\t\t124\tAmerica/Los_Angeles\t2023-01-01",
            "5391959\tSan Francisco\tSan Francisco\tSF,San Fran\t37.77493\t-122.41942\tP\tPPLA2\tUS\t\tCA\t075\t\t\t864816\t16\t28\tAmerica/Los_Angeles\t2023-01-01",
        ])
    }

    pub fn create_test_admin1_codes_file() -> NamedTempFile {
        write_lines(&["US.CA\tCalifornia\tCalifornia\t5332921"])
    }
}
