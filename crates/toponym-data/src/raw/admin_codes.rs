use std::path::Path;

use ahash::AHashMap as HashMap;
use itertools::izip;
use polars::prelude::*;
use tracing::{info, instrument};

use super::Result;

const ADMIN1_CODES_SCHEMA: [(PlSmallStr, DataType); 4] = [
    (PlSmallStr::from_static("code"), DataType::String),
    (PlSmallStr::from_static("name"), DataType::String),
    (PlSmallStr::from_static("asciiname"), DataType::String),
    (PlSmallStr::from_static("geonameId"), DataType::String),
];

pub fn get_admin1_codes_df(path: impl AsRef<Path>) -> Result<DataFrame> {
    Ok(LazyCsvReader::new(path)
        .with_separator(b'\t')
        .with_has_header(false)
        .with_quote_char(None)
        .with_truncate_ragged_lines(true)
        .with_schema(Some(Schema::from_iter(ADMIN1_CODES_SCHEMA).into()))
        .finish()?
        .collect()?)
}

/// Map `admin1CodesASCII.txt` keys (`US.CA`) to division names (`California`).
#[instrument(name = "Read admin1 codes", skip_all, fields(path = ?path), level = "debug")]
pub fn read_admin1_names(path: &Path) -> Result<HashMap<String, String>> {
    let df = get_admin1_codes_df(path)?;
    let names: HashMap<String, String> = izip!(df.column("code")?.str()?, df.column("name")?.str()?)
        .filter_map(|(code, name)| Some((code?.trim().to_string(), name?.trim().to_string())))
        .collect();
    info!(codes = names.len(), "Loaded admin1 names");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_utils::*;

    #[test]
    fn test_read_admin1_names() {
        let file = write_lines(&[
            "US.CA\tCalifornia\tCalifornia\t5332921",
            "FR.11\tÎle-de-France\tIle-de-France\t3012874",
            "broken-line-without-name",
        ]);
        let names = read_admin1_names(file.path()).unwrap();

        assert_eq!(names.len(), 2);
        assert_eq!(names.get("US.CA").map(String::as_str), Some("California"));
        assert_eq!(names.get("FR.11").map(String::as_str), Some("Île-de-France"));
    }
}
