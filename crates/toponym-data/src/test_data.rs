use std::io::Write;

use tempfile::NamedTempFile;
use tracing::info;

use super::error::Result;

/// Configuration for fixture generation.
#[derive(Debug, Clone)]
pub struct TestDataConfig {
    /// Add the larger set of places (ambiguous names across countries, non-Latin
    /// alternates) on top of the core set.
    pub extended: bool,
    /// Number of malformed rows mixed into the dump.
    pub malformed_rows: usize,
}

impl Default for TestDataConfig {
    fn default() -> Self {
        Self::sample()
    }
}

impl TestDataConfig {
    /// Core places only, every row valid.
    pub fn minimal() -> Self {
        Self {
            extended: false,
            malformed_rows: 0,
        }
    }

    /// Core and extended places plus a couple of broken rows.
    pub fn sample() -> Self {
        Self {
            extended: true,
            malformed_rows: 2,
        }
    }

    #[must_use]
    pub fn with_malformed_rows(mut self, malformed_rows: usize) -> Self {
        self.malformed_rows = malformed_rows;
        self
    }

    /// Number of valid records the generated dump holds.
    pub fn expected_records(&self) -> usize {
        CORE_PLACES.len() + if self.extended { EXTENDED_PLACES.len() } else { 0 }
    }
}

struct Place {
    id: u64,
    name: &'static str,
    ascii_name: &'static str,
    alternate_names: &'static str,
    latitude: f64,
    longitude: f64,
    class: &'static str,
    code: &'static str,
    country: &'static str,
    admin1: &'static str,
    admin2: &'static str,
    population: u64,
}

impl Place {
    fn write_row(&self, file: &mut impl Write) -> std::io::Result<()> {
        writeln!(
            file,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t\t{}\t{}\t\t\t{}\t\t0\tUTC\t2024-01-01",
            self.id,
            self.name,
            self.ascii_name,
            self.alternate_names,
            self.latitude,
            self.longitude,
            self.class,
            self.code,
            self.country,
            self.admin1,
            self.admin2,
            self.population
        )
    }
}

#[allow(clippy::too_many_arguments)]
const fn place(
    id: u64,
    name: &'static str,
    ascii_name: &'static str,
    alternate_names: &'static str,
    (latitude, longitude): (f64, f64),
    (class, code): (&'static str, &'static str),
    (country, admin1, admin2): (&'static str, &'static str, &'static str),
    population: u64,
) -> Place {
    Place {
        id,
        name,
        ascii_name,
        alternate_names,
        latitude,
        longitude,
        class,
        code,
        country,
        admin1,
        admin2,
        population,
    }
}

#[rustfmt::skip]
const CORE_PLACES: [Place; 12] = [
    place(2988507, "Paris", "Paris", "Lutece,Paname,Ville Lumiere", (48.85341, 2.3488), ("P", "PPLC"), ("FR", "11", "75"), 2_140_000),
    place(4717560, "Paris", "Paris", "", (33.66094, -95.55551), ("P", "PPLA2"), ("US", "TX", "277"), 25_000),
    place(6252001, "United States", "United States", "US,USA,America,United States of America", (39.76, -98.5), ("A", "PCLI"), ("US", "00", ""), 327_167_434),
    place(5332921, "California", "California", "CA,Calif", (37.25022, -119.75126), ("A", "ADM1"), ("US", "CA", ""), 37_691_912),
    place(5391959, "San Francisco", "San Francisco", "SF,San Fran", (37.77493, -122.41942), ("P", "PPLA2"), ("US", "CA", "075"), 864_816),
    place(2643743, "London", "London", "Londres,Londra,Londinium", (51.50853, -0.12574), ("P", "PPLC"), ("GB", "ENG", "GLA"), 8_961_989),
    place(6058560, "London", "London", "", (42.98339, -81.23304), ("P", "PPL"), ("CA", "08", ""), 383_822),
    place(5128581, "New York City", "New York City", "NYC,New York,Big Apple", (40.71427, -74.00597), ("P", "PPL"), ("US", "NY", ""), 8_804_190),
    place(5128638, "New York", "New York", "NY,State of New York", (43.00035, -75.4999), ("A", "ADM1"), ("US", "NY", ""), 19_274_244),
    place(3448439, "São Paulo", "Sao Paulo", "Sampa", (-23.5475, -46.63611), ("P", "PPLA"), ("BR", "27", ""), 12_325_232),
    place(2657896, "Zürich", "Zurich", "Zurigo,Zuerich", (47.36667, 8.55), ("P", "PPLA"), ("CH", "ZH", "112"), 341_730),
    place(2980291, "Saint-Étienne", "Saint-Etienne", "St-Etienne", (45.43389, 4.39), ("P", "PPLA3"), ("FR", "84", "42"), 172_565),
];

#[rustfmt::skip]
const EXTENDED_PLACES: [Place; 7] = [
    place(2950159, "Berlin", "Berlin", "Berlino,Berlim", (52.52437, 13.41053), ("P", "PPLC"), ("DE", "16", ""), 3_426_354),
    place(1850147, "Tokyo", "Tokyo", "東京,Tōkyō,Tokio", (35.6895, 139.69171), ("P", "PPLC"), ("JP", "40", ""), 8_336_599),
    place(4250542, "Springfield", "Springfield", "", (39.80172, -89.64371), ("P", "PPLA"), ("US", "IL", "167"), 116_250),
    place(4951788, "Springfield", "Springfield", "", (42.10148, -72.58981), ("P", "PPLA2"), ("US", "MA", "013"), 155_929),
    place(5746545, "Portland", "Portland", "PDX", (45.52345, -122.67621), ("P", "PPLA2"), ("US", "OR", "051"), 652_503),
    place(4975802, "Portland", "Portland", "", (43.66147, -70.25533), ("P", "PPLA2"), ("US", "ME", "005"), 68_408),
    place(2147714, "Sydney", "Sydney", "Harbour City", (-33.86785, 151.20732), ("P", "PPLA"), ("AU", "02", ""), 4_627_345),
];

#[rustfmt::skip]
const MALFORMED_ROWS: [&str; 3] = [
    "not-an-id\tNowhere\tNowhere\t\t1.0\t1.0\tP\tPPL\tXX\t\t01\t\t\t\t0\t\t0\tUTC\t2024-01-01",
    "9999001\t\t\t\t1.0\t1.0\tP\tPPL\tXX\t\t01\t\t\t\t0\t\t0\tUTC\t2024-01-01",
    "9999002\tOff The Map\tOff The Map\t\t123.0\t1.0\tP\tPPL\tXX\t\t01\t\t\t\t0\t\t0\tUTC\t2024-01-01",
];

const ADMIN1_CODES: [(&str, &str, &str); 16] = [
    ("FR.11", "Île-de-France", "Ile-de-France"),
    ("FR.84", "Auvergne-Rhône-Alpes", "Auvergne-Rhone-Alpes"),
    ("US.TX", "Texas", "Texas"),
    ("US.CA", "California", "California"),
    ("US.NY", "New York", "New York"),
    ("US.IL", "Illinois", "Illinois"),
    ("US.MA", "Massachusetts", "Massachusetts"),
    ("US.OR", "Oregon", "Oregon"),
    ("US.ME", "Maine", "Maine"),
    ("GB.ENG", "England", "England"),
    ("CA.08", "Ontario", "Ontario"),
    ("BR.27", "São Paulo", "Sao Paulo"),
    ("CH.ZH", "Zurich", "Zurich"),
    ("DE.16", "Berlin", "Berlin"),
    ("JP.40", "Tokyo", "Tokyo"),
    ("AU.02", "New South Wales", "New South Wales"),
];

/// Write a GeoNames dump and a matching `admin1CodesASCII.txt` to temporary files.
///
/// Returns `(dump, admin1_codes)`.
pub fn create_test_data(config: &TestDataConfig) -> Result<(NamedTempFile, NamedTempFile)> {
    info!(config = ?config, "Creating test data");

    let mut dump = NamedTempFile::with_suffix(".txt")?;
    let extended: &[Place] = if config.extended { &EXTENDED_PLACES } else { &[] };
    let mut malformed = MALFORMED_ROWS.iter().cycle().take(config.malformed_rows);

    for (i, place) in CORE_PLACES.iter().chain(extended).enumerate() {
        place.write_row(&mut dump)?;
        // spread broken rows through the file rather than bunching them at the end
        if i % 3 == 1 {
            if let Some(line) = malformed.next() {
                writeln!(dump, "{line}")?;
            }
        }
    }
    for line in malformed {
        writeln!(dump, "{line}")?;
    }
    dump.flush()?;

    let mut admin1_codes = NamedTempFile::with_suffix(".txt")?;
    for (i, (code, name, ascii_name)) in ADMIN1_CODES.iter().enumerate() {
        writeln!(admin1_codes, "{code}\t{name}\t{ascii_name}\t{}", 1000 + i)?;
    }
    admin1_codes.flush()?;

    Ok((dump, admin1_codes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LoadError, LoadOptions, RecordStore};

    #[test]
    fn test_minimal_data_loads_strictly() {
        let config = TestDataConfig::minimal();
        let (dump, admin1) = create_test_data(&config).unwrap();
        let store = RecordStore::load(
            dump.path(),
            &LoadOptions::default().strict(true).admin1_codes(admin1.path()),
        )
        .unwrap();

        assert_eq!(store.len(), config.expected_records());
        assert_eq!(store.report().skipped_rows, 0);

        let paris = store.get(2988507).unwrap();
        assert_eq!(paris.admin1_name.as_deref(), Some("Île-de-France"));
        let zurich = store.get(2657896).unwrap();
        assert_eq!(zurich.ascii_name.as_deref(), Some("Zurich"));
    }

    #[test]
    fn test_sample_data_counts_malformed_rows() {
        let config = TestDataConfig::sample().with_malformed_rows(3);
        let (dump, _) = create_test_data(&config).unwrap();

        let store = RecordStore::load(dump.path(), &LoadOptions::default()).unwrap();
        assert_eq!(store.len(), config.expected_records());
        assert_eq!(store.report().skipped_rows, 3);

        let strict = RecordStore::load(dump.path(), &LoadOptions::default().strict(true));
        assert!(matches!(strict, Err(LoadError::MalformedRow { .. })));
    }
}
