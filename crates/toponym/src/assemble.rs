//! Output types: [`Location`] values grouped per input name in a [`ResultSet`].
use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use ahash::AHashMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use toponym_data::GeoRecord;

use crate::error::Result;

/// A resolved place as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub geoname_id: u64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country_code: Option<String>,
    pub admin1_code: Option<String>,
    pub admin1_name: Option<String>,
    pub admin2_code: Option<String>,
    pub feature_class: String,
    pub feature_code: Option<String>,
    pub population: u64,
}

impl From<&GeoRecord> for Location {
    fn from(record: &GeoRecord) -> Self {
        Self {
            geoname_id: record.id,
            name: record.name.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            country_code: record.country_code.clone(),
            admin1_code: record.admin1_code.clone(),
            admin1_name: record.admin1_name.clone(),
            admin2_code: record.admin2_code.clone(),
            feature_class: record.feature.class.code().to_string(),
            feature_code: record.feature.code.clone(),
            population: record.population,
        }
    }
}

/// Ranked locations per input name, one entry per distinct name in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: Vec<(String, Vec<Location>)>,
    positions: AHashMap<String, usize>,
}

impl ResultSet {
    /// Add an entry unless `name` is already present.
    fn insert_first(&mut self, name: String, locations: Vec<Location>) {
        if self.positions.contains_key(&name) {
            return;
        }
        self.positions.insert(name.clone(), self.entries.len());
        self.entries.push((name, locations));
    }

    pub fn get(&self, name: &str) -> Option<&[Location]> {
        self.positions
            .get(name)
            .map(|&position| self.entries[position].1.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Location])> {
        self.entries
            .iter()
            .map(|(name, locations)| (name.as_str(), locations.as_slice()))
    }

    pub fn into_map(self) -> HashMap<String, Vec<Location>> {
        self.entries.into_iter().collect()
    }
}

impl PartialEq for ResultSet {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl IntoIterator for ResultSet {
    type Item = (String, Vec<Location>);
    type IntoIter = std::vec::IntoIter<(String, Vec<Location>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Vec<Location>)> for ResultSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Location>)>>(iter: I) -> Self {
        let mut result_set = Self::default();
        for (name, locations) in iter {
            result_set.insert_first(name, locations);
        }
        result_set
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, locations) in &self.entries {
            map.serialize_entry(name, locations)?;
        }
        map.end()
    }
}

struct ResultSetVisitor;

impl<'de> Visitor<'de> for ResultSetVisitor {
    type Value = ResultSet;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map from names to lists of locations")
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut access: A,
    ) -> std::result::Result<ResultSet, A::Error> {
        let mut result_set = ResultSet::default();
        while let Some((name, locations)) = access.next_entry::<String, Vec<Location>>()? {
            result_set.insert_first(name, locations);
        }
        Ok(result_set)
    }
}

impl<'de> Deserialize<'de> for ResultSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(ResultSetVisitor)
    }
}

/// Turn ranked records into a [`ResultSet`]. A repeated name keeps its first entry.
pub fn assemble<'a>(resolved: impl IntoIterator<Item = (String, Vec<&'a GeoRecord>)>) -> ResultSet {
    resolved
        .into_iter()
        .map(|(name, records)| {
            let locations = records.into_iter().map(Location::from).collect();
            (name, locations)
        })
        .collect()
}

/// Write `result_set` as a UTF-8 JSON object keyed by input name.
pub fn write_result_json(result_set: &ResultSet, writer: impl Write) -> Result<()> {
    serde_json::to_writer(writer, result_set).map_err(std::io::Error::from)?;
    Ok(())
}
