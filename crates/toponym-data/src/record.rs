use std::fmt;

use serde::{Deserialize, Serialize};

/// GeoNames feature class, the single-letter top level of the feature taxonomy.
///
/// See <https://www.geonames.org/export/codes.html>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureClass {
    /// `A`: country, state, region, ...
    AdministrativeRegion,
    /// `H`: stream, lake, ...
    Hydrographic,
    /// `L`: parks, area, ...
    Area,
    /// `P`: city, village, ...
    PopulatedPlace,
    /// `R`: road, railroad
    Road,
    /// `S`: spot, building, farm
    Spot,
    /// `T`: mountain, hill, rock, ...
    Hypsographic,
    /// `U`: undersea
    Undersea,
    /// `V`: forest, heath, ...
    Vegetation,
    /// Missing or unknown class letter.
    Unclassified,
}

impl FeatureClass {
    /// Parse the single-letter GeoNames class code. Unknown or empty codes map to
    /// [`FeatureClass::Unclassified`].
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "A" => Self::AdministrativeRegion,
            "H" => Self::Hydrographic,
            "L" => Self::Area,
            "P" => Self::PopulatedPlace,
            "R" => Self::Road,
            "S" => Self::Spot,
            "T" => Self::Hypsographic,
            "U" => Self::Undersea,
            "V" => Self::Vegetation,
            _ => Self::Unclassified,
        }
    }

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::AdministrativeRegion => "A",
            Self::Hydrographic => "H",
            Self::Area => "L",
            Self::PopulatedPlace => "P",
            Self::Road => "R",
            Self::Spot => "S",
            Self::Hypsographic => "T",
            Self::Undersea => "U",
            Self::Vegetation => "V",
            Self::Unclassified => "",
        }
    }
}

impl fmt::Display for FeatureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Feature class plus the finer GeoNames feature code (`PPLC`, `ADM1`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Feature {
    pub class: FeatureClass,
    pub code: Option<String>,
}

impl Feature {
    pub fn new(class: FeatureClass, code: Option<impl Into<String>>) -> Self {
        Self {
            class,
            code: code.map(Into::into),
        }
    }

    /// Importance of the feature type when everything else about two candidates is equal.
    ///
    /// Capitals outrank countries, which outrank other populated places, which outrank
    /// administrative divisions (first order above second order above the rest).
    #[must_use]
    pub fn priority(&self) -> u8 {
        let code = self.code.as_deref().unwrap_or_default();
        match self.class {
            FeatureClass::PopulatedPlace if code == "PPLC" => 7,
            FeatureClass::AdministrativeRegion if code.starts_with("PCL") => 6,
            FeatureClass::PopulatedPlace => 5,
            FeatureClass::AdministrativeRegion if code == "ADM1" => 4,
            FeatureClass::AdministrativeRegion if code == "ADM2" => 3,
            FeatureClass::AdministrativeRegion => 2,
            FeatureClass::Unclassified => 0,
            _ => 1,
        }
    }
}

/// A single gazetteer entry.
///
/// Records are immutable once they are part of a [`RecordStore`](crate::RecordStore);
/// everything downstream refers to them by [`GeoRecord::id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    /// `GeoNames` id, stable across dumps.
    pub id: u64,
    pub name: String,
    pub ascii_name: Option<String>,
    pub alternate_names: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub feature: Feature,
    /// Zero when the source has no population figure.
    pub population: u64,
    /// ISO-3166 alpha-2 country code.
    pub country_code: Option<String>,
    pub admin1_code: Option<String>,
    pub admin2_code: Option<String>,
    /// Name of the first-order division, when an admin1 code table was supplied.
    pub admin1_name: Option<String>,
}

impl GeoRecord {
    /// Every name the record can be found under: canonical, ASCII, then alternates.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.ascii_name.as_deref())
            .chain(self.alternate_names.iter().map(String::as_str))
    }

    /// Key used by `admin1CodesASCII.txt`, e.g. `US.CA`.
    #[must_use]
    pub fn admin1_key(&self) -> Option<String> {
        match (&self.country_code, &self.admin1_code) {
            (Some(country), Some(admin1)) => Some(format!("{country}.{admin1}")),
            _ => None,
        }
    }
}

impl fmt::Display for GeoRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GeoRecord {{ id: {}, name: \"{}\", country: {}, feature: {}.{} }}",
            self.id,
            self.name,
            self.country_code.as_deref().unwrap_or("-"),
            self.feature.class,
            self.feature.code.as_deref().unwrap_or("")
        )
    }
}

#[cfg(test)]
pub(crate) fn sample_record(
    id: u64,
    name: &str,
    population: u64,
    class: &str,
    code: &str,
) -> GeoRecord {
    GeoRecord {
        id,
        name: name.to_string(),
        ascii_name: None,
        alternate_names: Vec::new(),
        latitude: 0.0,
        longitude: 0.0,
        feature: Feature::new(FeatureClass::from_code(class), Some(code)),
        population,
        country_code: None,
        admin1_code: None,
        admin2_code: None,
        admin1_name: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_class_codes() {
        for code in ["A", "H", "L", "P", "R", "S", "T", "U", "V"] {
            assert_eq!(FeatureClass::from_code(code).code(), code);
        }
        assert_eq!(FeatureClass::from_code(""), FeatureClass::Unclassified);
        assert_eq!(FeatureClass::from_code("X"), FeatureClass::Unclassified);
    }

    #[test]
    fn test_feature_priority_order() {
        let capital = Feature::new(FeatureClass::PopulatedPlace, Some("PPLC"));
        let country = Feature::new(FeatureClass::AdministrativeRegion, Some("PCLI"));
        let town = Feature::new(FeatureClass::PopulatedPlace, Some("PPL"));
        let state = Feature::new(FeatureClass::AdministrativeRegion, Some("ADM1"));
        let county = Feature::new(FeatureClass::AdministrativeRegion, Some("ADM2"));
        let district = Feature::new(FeatureClass::AdministrativeRegion, Some("ADM4"));
        let lake = Feature::new(FeatureClass::Hydrographic, Some("LK"));
        let unknown = Feature::new(FeatureClass::Unclassified, None::<String>);

        let ordered = [capital, country, town, state, county, district, lake, unknown];
        for pair in ordered.windows(2) {
            assert!(
                pair[0].priority() > pair[1].priority(),
                "{:?} should outrank {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_names_and_admin1_key() {
        let mut record = sample_record(1, "Zürich", 400_000, "P", "PPLA");
        record.ascii_name = Some("Zurich".into());
        record.alternate_names = vec!["Zurigo".into()];
        record.country_code = Some("CH".into());
        record.admin1_code = Some("ZH".into());

        assert_eq!(record.names().collect::<Vec<_>>(), ["Zürich", "Zurich", "Zurigo"]);
        assert_eq!(record.admin1_key().as_deref(), Some("CH.ZH"));
    }
}
