//! Typed rows of the weather mart and a reference implementation of the join.
//!
//! The warehouse computes `mart_final` in SQL. [`build_mart`] computes the
//! same relation in Rust so the persisted table can be checked against it
//! (see [`audit_mart`]).

use crate::surrogate_key::weather_country_key;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A row of `stg_country`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub country_id: Option<i64>,
    pub country_name: Option<String>,
    pub capital: Option<String>,
    pub population: Option<i64>,
    pub region: Option<String>,
}

/// A row of `stg_weather`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub weather_id: Option<i64>,
    pub city: Option<String>,
    pub country_name: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<i64>,
}

/// A row of `mart_final`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MartRecord {
    pub unique_key: String,
    pub weather_id: Option<i64>,
    pub city: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<i64>,
    pub country_name: Option<String>,
    pub capital: Option<String>,
    pub population: Option<i64>,
    pub region: Option<String>,
}

impl MartRecord {
    fn matched(weather: &WeatherRecord, country: &CountryRecord) -> Self {
        Self {
            unique_key: weather_country_key(weather.weather_id, country.country_id),
            weather_id: weather.weather_id,
            city: weather.city.clone(),
            temperature: weather.temperature,
            humidity: weather.humidity,
            country_name: country.country_name.clone(),
            capital: country.capital.clone(),
            population: country.population,
            region: country.region.clone(),
        }
    }

    fn unmatched(weather: &WeatherRecord) -> Self {
        Self {
            unique_key: weather_country_key(weather.weather_id, None),
            weather_id: weather.weather_id,
            city: weather.city.clone(),
            temperature: weather.temperature,
            humidity: weather.humidity,
            country_name: None,
            capital: None,
            population: None,
            region: None,
        }
    }

    /// Whether a country row was found for this weather row
    pub fn has_country(&self) -> bool {
        self.country_name.is_some()
    }
}

/// Left-join weather rows against countries on exact `country_name` equality.
///
/// Output order follows the weather input; a weather row matching several
/// countries fans out in country input order. NULL names never match.
pub fn build_mart(weather: &[WeatherRecord], countries: &[CountryRecord]) -> Vec<MartRecord> {
    let mut by_name: HashMap<&str, Vec<&CountryRecord>> = HashMap::new();
    for country in countries {
        if let Some(name) = country.country_name.as_deref() {
            by_name.entry(name).or_default().push(country);
        }
    }

    let mut mart = Vec::with_capacity(weather.len());
    for w in weather {
        let matches = w
            .country_name
            .as_deref()
            .and_then(|name| by_name.get(name));
        match matches {
            Some(found) => mart.extend(found.iter().map(|c| MartRecord::matched(w, c))),
            None => mart.push(MartRecord::unmatched(w)),
        }
    }
    mart
}

/// Country names that occur on more than one country row.
pub fn duplicated_country_names(countries: &[CountryRecord]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in countries.iter().filter_map(|c| c.country_name.as_deref()) {
        *counts.entry(name).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Outcome of comparing a persisted mart against the reference join.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MartAudit {
    /// Rows in the weather input
    pub weather_rows: usize,
    /// Rows the reference join produces
    pub expected_rows: usize,
    /// Rows found in the persisted mart
    pub actual_rows: usize,
    /// Weather rows without a country match
    pub unmatched_rows: usize,
    /// Extra rows caused by duplicated country names
    pub fan_out_rows: usize,
    /// Weather ids missing from the persisted mart
    pub missing_weather_ids: Vec<i64>,
    /// Keys the reference join produces but the mart lacks
    pub missing_keys: Vec<String>,
    /// Keys present in the mart but not produced by the reference join
    pub unexpected_keys: Vec<String>,
    /// Keys present on both sides whose row contents differ
    pub mismatched_rows: Vec<String>,
}

impl MartAudit {
    /// Whether the persisted mart agrees with the reference join
    pub fn is_consistent(&self) -> bool {
        self.expected_rows == self.actual_rows
            && self.missing_weather_ids.is_empty()
            && self.missing_keys.is_empty()
            && self.unexpected_keys.is_empty()
            && self.mismatched_rows.is_empty()
    }
}

/// Compare a persisted mart with the reference join of its inputs.
pub fn audit_mart(
    weather: &[WeatherRecord],
    countries: &[CountryRecord],
    actual: &[MartRecord],
) -> MartAudit {
    let expected = build_mart(weather, countries);

    let actual_ids: HashSet<i64> = actual.iter().filter_map(|r| r.weather_id).collect();
    let mut missing_weather_ids: Vec<i64> = weather
        .iter()
        .filter_map(|w| w.weather_id)
        .filter(|id| !actual_ids.contains(id))
        .collect();
    missing_weather_ids.sort_unstable();
    missing_weather_ids.dedup();

    let expected_keys: HashSet<&str> = expected.iter().map(|r| r.unique_key.as_str()).collect();
    let actual_keys: HashSet<&str> = actual.iter().map(|r| r.unique_key.as_str()).collect();

    let mut missing_keys: Vec<String> = expected_keys
        .difference(&actual_keys)
        .map(|k| k.to_string())
        .collect();
    missing_keys.sort();
    let mut unexpected_keys: Vec<String> = actual_keys
        .difference(&expected_keys)
        .map(|k| k.to_string())
        .collect();
    unexpected_keys.sort();

    let mismatched_rows = mismatched_keys(&expected, actual);

    MartAudit {
        weather_rows: weather.len(),
        expected_rows: expected.len(),
        actual_rows: actual.len(),
        unmatched_rows: expected.iter().filter(|r| !r.has_country()).count(),
        fan_out_rows: expected.len().saturating_sub(weather.len()),
        missing_weather_ids,
        missing_keys,
        unexpected_keys,
        mismatched_rows,
    }
}

/// Keys shared by both sides whose rows differ as multisets.
fn mismatched_keys(expected: &[MartRecord], actual: &[MartRecord]) -> Vec<String> {
    let mut by_key: BTreeMap<&str, (Vec<&MartRecord>, Vec<&MartRecord>)> = BTreeMap::new();
    for row in expected {
        by_key.entry(row.unique_key.as_str()).or_default().0.push(row);
    }
    for row in actual {
        by_key.entry(row.unique_key.as_str()).or_default().1.push(row);
    }

    by_key
        .into_iter()
        .filter(|(_, (want, got))| !want.is_empty() && !got.is_empty())
        .filter(|(_, (want, got))| {
            let mut remaining = want.clone();
            for row in got {
                match remaining.iter().position(|r| r == row) {
                    Some(idx) => {
                        remaining.swap_remove(idx);
                    }
                    None => return true,
                }
            }
            !remaining.is_empty()
        })
        .map(|(key, _)| key.to_string())
        .collect()
}

#[cfg(test)]
#[path = "records_test.rs"]
mod tests;
