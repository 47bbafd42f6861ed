use std::path::Path;

use itertools::izip;
use polars::prelude::*;
use tracing::trace;

use super::Result;
use crate::{Feature, FeatureClass, GeoRecord, LoadError, LoadReport};

/// Column layout of `allCountries.txt` / `citiesN.txt`.
///
/// Everything is read as text and validated row by row, so one bad coordinate skips a
/// row instead of failing the whole file.
const ALL_COUNTRIES_SCHEMA: [(PlSmallStr, DataType); 19] = [
    (PlSmallStr::from_static("geonameId"), DataType::String),
    (PlSmallStr::from_static("name"), DataType::String),
    (PlSmallStr::from_static("asciiname"), DataType::String),
    (PlSmallStr::from_static("alternatenames"), DataType::String),
    (PlSmallStr::from_static("latitude"), DataType::String),
    (PlSmallStr::from_static("longitude"), DataType::String),
    (PlSmallStr::from_static("feature_class"), DataType::String),
    (PlSmallStr::from_static("feature_code"), DataType::String),
    (PlSmallStr::from_static("country_code"), DataType::String),
    (PlSmallStr::from_static("cc2"), DataType::String),
    (PlSmallStr::from_static("admin1_code"), DataType::String),
    (PlSmallStr::from_static("admin2_code"), DataType::String),
    (PlSmallStr::from_static("admin3_code"), DataType::String),
    (PlSmallStr::from_static("admin4_code"), DataType::String),
    (PlSmallStr::from_static("population"), DataType::String),
    (PlSmallStr::from_static("elevation"), DataType::String),
    (PlSmallStr::from_static("dem"), DataType::String),
    (PlSmallStr::from_static("timezone"), DataType::String),
    (PlSmallStr::from_static("modification_date"), DataType::String),
];

pub fn read_all_countries_df(path: impl AsRef<Path>) -> Result<DataFrame> {
    Ok(LazyCsvReader::new(path)
        .with_separator(b'\t')
        .with_has_header(false)
        // GeoNames names contain bare quotes ("Hawai'i", "\"Ain\"") that are not CSV quoting
        .with_quote_char(None)
        .with_truncate_ragged_lines(true)
        .with_schema(Some(Schema::from_iter(ALL_COUNTRIES_SCHEMA).into()))
        .finish()?
        .select([
            col("geonameId"),
            col("name"),
            col("asciiname"),
            col("alternatenames"),
            col("latitude"),
            col("longitude"),
            col("feature_class"),
            col("feature_code"),
            col("country_code"),
            col("admin1_code"),
            col("admin2_code"),
            col("population"),
        ])
        .collect()?)
}

/// One row of the dump, borrowed from the DataFrame columns.
#[derive(Debug, Default)]
struct RawRow<'a> {
    id: Option<&'a str>,
    name: Option<&'a str>,
    ascii_name: Option<&'a str>,
    alternate_names: Option<&'a str>,
    latitude: Option<&'a str>,
    longitude: Option<&'a str>,
    feature_class: Option<&'a str>,
    feature_code: Option<&'a str>,
    country_code: Option<&'a str>,
    admin1_code: Option<&'a str>,
    admin2_code: Option<&'a str>,
    population: Option<&'a str>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_coordinate(
    value: Option<&str>,
    label: &str,
    limit: f64,
) -> std::result::Result<f64, String> {
    let raw = non_empty(value).ok_or_else(|| format!("missing {label}"))?;
    let parsed = raw
        .parse::<f64>()
        .map_err(|_| format!("invalid {label} '{raw}'"))?;
    if !parsed.is_finite() || parsed.abs() > limit {
        return Err(format!("{label} {parsed} out of range"));
    }
    Ok(parsed)
}

impl RawRow<'_> {
    fn into_record(self) -> std::result::Result<GeoRecord, String> {
        let id_raw = non_empty(self.id).ok_or("missing geonameId")?;
        let id = id_raw
            .parse::<u64>()
            .map_err(|_| format!("invalid geonameId '{id_raw}'"))?;
        let name = non_empty(self.name).ok_or("missing name")?;
        let latitude = parse_coordinate(self.latitude, "latitude", 90.0)?;
        let longitude = parse_coordinate(self.longitude, "longitude", 180.0)?;

        // GeoNames leaves population empty or negative for unknown values
        let population = non_empty(self.population)
            .and_then(|p| p.parse::<i64>().ok())
            .map_or(0, |p| p.max(0) as u64);

        let alternate_names = non_empty(self.alternate_names)
            .map(|alts| {
                alts.split(',')
                    .map(str::trim)
                    .filter(|alt| !alt.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(GeoRecord {
            id,
            name: name.to_string(),
            ascii_name: non_empty(self.ascii_name).map(ToString::to_string),
            alternate_names,
            latitude,
            longitude,
            feature: Feature::new(
                FeatureClass::from_code(self.feature_class.unwrap_or_default()),
                non_empty(self.feature_code),
            ),
            population,
            country_code: non_empty(self.country_code).map(ToString::to_string),
            admin1_code: non_empty(self.admin1_code).map(ToString::to_string),
            admin2_code: non_empty(self.admin2_code).map(ToString::to_string),
            admin1_name: None,
        })
    }
}

/// Validate every row of a dump DataFrame into records.
pub fn records_from_df(df: &DataFrame, strict: bool) -> Result<(Vec<GeoRecord>, LoadReport)> {
    let mut report = LoadReport {
        rows: df.height(),
        ..LoadReport::default()
    };
    let mut records = Vec::with_capacity(df.height());

    let rows = izip!(
        df.column("geonameId")?.str()?,
        df.column("name")?.str()?,
        df.column("asciiname")?.str()?,
        df.column("alternatenames")?.str()?,
        df.column("latitude")?.str()?,
        df.column("longitude")?.str()?,
        df.column("feature_class")?.str()?,
        df.column("feature_code")?.str()?,
    )
    .zip(izip!(
        df.column("country_code")?.str()?,
        df.column("admin1_code")?.str()?,
        df.column("admin2_code")?.str()?,
        df.column("population")?.str()?,
    ));

    for (
        row_index,
        (
            (
                id,
                name,
                ascii_name,
                alternate_names,
                latitude,
                longitude,
                feature_class,
                feature_code,
            ),
            (country_code, admin1_code, admin2_code, population),
        ),
    ) in rows.enumerate()
    {
        let raw = RawRow {
            id,
            name,
            ascii_name,
            alternate_names,
            latitude,
            longitude,
            feature_class,
            feature_code,
            country_code,
            admin1_code,
            admin2_code,
            population,
        };
        match raw.into_record() {
            Ok(record) => records.push(record),
            Err(reason) if strict => {
                return Err(LoadError::MalformedRow {
                    line: row_index + 1,
                    reason,
                });
            }
            Err(reason) => {
                trace!(line = row_index + 1, reason = %reason, "Skipping malformed row");
                report.skipped_rows += 1;
            }
        }
    }
    report.records = records.len();
    Ok((records, report))
}
