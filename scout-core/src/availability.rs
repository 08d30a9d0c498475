use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

use crate::airports::AirportDirectory;
use crate::cabin::CabinClass;
use crate::route::generate_permutations;
use crate::{CoreError, CoreResult};

// ============================================================================
// Raw records (one per date / city pair / program)
// ============================================================================

/// Per-cabin slice of a raw availability record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CabinAvailability {
    pub available: bool,
    pub direct: bool,
    pub airlines: String,
    pub direct_airlines: String,
    pub mileage_cost: Option<u64>,
    pub total_taxes: Option<f64>,
    pub direct_mileage_cost: Option<u64>,
    pub direct_total_taxes: Option<f64>,
}

impl CabinAvailability {
    /// Carrier codes listed for the direct or the connecting option.
    pub fn airlines_for(&self, direct_only: bool) -> Vec<&str> {
        let raw = if direct_only { &self.direct_airlines } else { &self.airlines };
        raw.split(',').map(str::trim).filter(|a| !a.is_empty()).collect()
    }

    pub fn cost_for(&self, direct_only: bool) -> Option<u64> {
        if direct_only {
            self.direct_mileage_cost
        } else {
            self.mileage_cost
        }
    }

    pub fn taxes_for(&self, direct_only: bool) -> Option<f64> {
        if direct_only {
            self.direct_total_taxes
        } else {
            self.total_taxes
        }
    }
}

/// One availability record as returned by `availability-v2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAvailabilityRecord {
    pub id: String,
    pub date: NaiveDate,
    pub origin_airport: String,
    pub destination_airport: String,
    pub source: String,
    pub taxes_currency: Option<String>,
    pub cabins: BTreeMap<CabinClass, CabinAvailability>,
}

impl RawAvailabilityRecord {
    /// Build a record from one element of the backend payload.
    ///
    /// Top-level fields are accepted in camelCase or PascalCase; cabin fields
    /// use the backend's `{C}Available`, `{C}MileageCost`... naming. Numeric
    /// fields may arrive as numbers or numeric strings.
    pub fn from_value(value: &Value) -> CoreResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| CoreError::DataShapeError("record is not an object".to_string()))?;

        let date_raw = string_field(obj, &["date", "Date"])
            .ok_or_else(|| CoreError::DataShapeError("record has no date".to_string()))?;
        let date = parse_date(&date_raw)?;

        let origin_airport = string_field(obj, &["originAirport", "OriginAirport"])
            .ok_or_else(|| CoreError::DataShapeError("record has no origin".to_string()))?
            .to_uppercase();
        let destination_airport = string_field(obj, &["destinationAirport", "DestinationAirport"])
            .ok_or_else(|| CoreError::DataShapeError("record has no destination".to_string()))?
            .to_uppercase();

        let id = string_field(obj, &["id", "ID"]).unwrap_or_else(|| Uuid::new_v4().to_string());
        let source = string_field(obj, &["source", "Source"]).unwrap_or_default();
        let taxes_currency = string_field(obj, &["TaxesCurrency", "taxesCurrency"]);

        let cabins = CabinClass::ALL
            .into_iter()
            .map(|class| {
                let c = class.code();
                let cabin = CabinAvailability {
                    available: bool_field(obj, &format!("{c}Available")),
                    direct: bool_field(obj, &format!("{c}Direct")),
                    airlines: string_field(obj, &[&format!("{c}Airlines")]).unwrap_or_default(),
                    direct_airlines: string_field(obj, &[&format!("{c}DirectAirlines")])
                        .unwrap_or_default(),
                    mileage_cost: number_field(obj, &format!("{c}MileageCost")).map(|n| n as u64),
                    total_taxes: number_field(obj, &format!("{c}TotalTaxes")),
                    direct_mileage_cost: number_field(obj, &format!("{c}DirectMileageCost"))
                        .map(|n| n as u64),
                    direct_total_taxes: number_field(obj, &format!("{c}DirectTotalTaxes")),
                };
                (class, cabin)
            })
            .collect();

        Ok(Self {
            id,
            date,
            origin_airport,
            destination_airport,
            source,
            taxes_currency,
            cabins,
        })
    }

    pub fn route(&self) -> String {
        format!("{}-{}", self.origin_airport, self.destination_airport)
    }

    pub fn cabin(&self, class: CabinClass) -> Option<&CabinAvailability> {
        self.cabins.get(&class)
    }
}

fn parse_date(raw: &str) -> CoreResult<NaiveDate> {
    // tolerate full timestamps, only the calendar day matters
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| CoreError::DataShapeError(format!("bad date {}: {}", raw, e)))
}

fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    }
}

fn number_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
}

/// Parse an `availability-v2` payload. Anything that is not an array yields
/// no records; malformed elements are skipped.
pub fn parse_records(payload: &Value) -> Vec<RawAvailabilityRecord> {
    let Some(items) = payload.as_array() else {
        tracing::warn!("Availability payload is not an array, treating as empty");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match RawAvailabilityRecord::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping malformed availability record: {}", e);
                None
            }
        })
        .collect()
}

// ============================================================================
// Aggregation by (date, route)
// ============================================================================

/// Pointer back to a contributing raw record, used for detail lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRef {
    pub source: String,
    pub direct: bool,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub available: bool,
    pub direct: bool,
    pub sources: BTreeSet<String>,
    pub flights: Vec<FlightRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDayRoute {
    pub date: NaiveDate,
    pub route: String,
    pub classes: BTreeMap<CabinClass, ClassSummary>,
}

impl AggregatedDayRoute {
    fn new(date: NaiveDate, route: String) -> Self {
        Self {
            date,
            route,
            classes: CabinClass::ALL
                .into_iter()
                .map(|c| (c, ClassSummary::default()))
                .collect(),
        }
    }

    pub fn class(&self, class: CabinClass) -> Option<&ClassSummary> {
        self.classes.get(&class)
    }

    /// Fold one record into the summary.
    ///
    /// `available` and `direct` are OR'd independently: a record that only
    /// reports `Direct` still marks the class direct. A record contributes a
    /// source and a flight reference only where its class is available.
    fn fold(&mut self, record: &RawAvailabilityRecord) {
        for (class, cabin) in &record.cabins {
            let summary = self.classes.entry(*class).or_default();
            summary.available |= cabin.available;
            summary.direct |= cabin.direct;

            if cabin.available {
                if !record.source.is_empty() {
                    summary.sources.insert(record.source.clone());
                }
                summary.flights.push(FlightRef {
                    source: record.source.clone(),
                    direct: cabin.direct,
                    id: record.id.clone(),
                });
            }
        }
    }
}

pub type AggregatedAvailability = BTreeMap<NaiveDate, BTreeMap<String, AggregatedDayRoute>>;

/// Group records by date and route, keeping only routes the path implies.
pub fn aggregate(
    records: &[RawAvailabilityRecord],
    segments: &[String],
    directory: &AirportDirectory,
) -> AggregatedAvailability {
    let valid_routes = generate_permutations(&segments.join("-"), directory);
    aggregate_routes(records, &valid_routes)
}

pub fn aggregate_routes(
    records: &[RawAvailabilityRecord],
    valid_routes: &BTreeSet<String>,
) -> AggregatedAvailability {
    let mut result: AggregatedAvailability = BTreeMap::new();
    let mut discarded = 0usize;

    for record in records {
        let route = record.route();
        if !valid_routes.contains(&route) {
            discarded += 1;
            continue;
        }
        result
            .entry(record.date)
            .or_default()
            .entry(route.clone())
            .or_insert_with(|| AggregatedDayRoute::new(record.date, route))
            .fold(record);
    }

    if discarded > 0 {
        tracing::debug!(discarded, "Dropped records for routes outside the search path");
    }
    result
}

/// Lookup of raw records by id for flight-level detail.
#[derive(Debug, Default)]
pub struct RecordIndex<'a> {
    by_id: HashMap<&'a str, &'a RawAvailabilityRecord>,
}

impl<'a> RecordIndex<'a> {
    pub fn new(records: &'a [RawAvailabilityRecord]) -> Self {
        Self {
            by_id: records.iter().map(|r| (r.id.as_str(), r)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&'a RawAvailabilityRecord> {
        self.by_id.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn directory() -> AirportDirectory {
        AirportDirectory::new(Vec::new(), Default::default())
    }

    fn segments(path: &str) -> Vec<String> {
        path.split('-').map(str::to_string).collect()
    }

    #[test]
    fn test_single_record_scenario() {
        let payload = json!([{
            "date": "2025-03-28",
            "originAirport": "LHR",
            "destinationAirport": "EWR",
            "source": "aeroplan",
            "YAvailable": true,
            "YDirect": true,
            "YMileageCost": "40000"
        }]);
        let records = parse_records(&payload);
        let aggregated = aggregate(&records, &segments("LHR-EWR"), &directory());

        let date = NaiveDate::from_ymd_opt(2025, 3, 28).unwrap();
        let entry = &aggregated[&date]["LHR-EWR"];
        let economy = entry.class(CabinClass::Economy).unwrap();
        assert!(economy.available);
        assert!(economy.direct);
        assert_eq!(economy.sources.iter().collect::<Vec<_>>(), vec!["aeroplan"]);
        assert_eq!(records[0].cabin(CabinClass::Economy).unwrap().mileage_cost, Some(40000));
    }

    #[test]
    fn test_available_and_direct_are_ored_independently() {
        let payload = json!([
            { "ID": "a", "Date": "2025-03-28", "OriginAirport": "LHR", "DestinationAirport": "EWR",
              "Source": "aeroplan", "YAvailable": true, "YDirect": false },
            { "ID": "b", "Date": "2025-03-28", "OriginAirport": "LHR", "DestinationAirport": "EWR",
              "Source": "united", "YAvailable": false, "YDirect": true }
        ]);
        let records = parse_records(&payload);
        let aggregated = aggregate(&records, &segments("LHR-EWR"), &directory());

        let date = NaiveDate::from_ymd_opt(2025, 3, 28).unwrap();
        let economy = aggregated[&date]["LHR-EWR"].class(CabinClass::Economy).unwrap().clone();
        assert!(economy.available);
        assert!(economy.direct);
        assert_eq!(economy.flights.len(), 1);
        assert_eq!(economy.flights[0].id, "a");
    }

    #[test]
    fn test_off_route_records_are_discarded() {
        let payload = json!([
            { "date": "2025-03-28", "originAirport": "SFO", "destinationAirport": "EWR",
              "source": "aeroplan", "JAvailable": true }
        ]);
        let records = parse_records(&payload);
        assert!(aggregate(&records, &segments("LHR-EWR"), &directory()).is_empty());
    }

    #[test]
    fn test_empty_and_non_array_payloads() {
        assert!(aggregate(&[], &segments("LHR-EWR"), &directory()).is_empty());
        assert!(parse_records(&json!({"error": "unauthorized"})).is_empty());
        assert!(parse_records(&Value::Null).is_empty());
    }

    #[test]
    fn test_malformed_elements_are_skipped() {
        let payload = json!([
            "garbage",
            { "originAirport": "LHR", "destinationAirport": "EWR" },
            { "date": "2025-03-28T00:00:00Z", "originAirport": "lhr", "destinationAirport": "ewr",
              "source": "", "FAvailable": "true", "FMileageCost": 120000 }
        ]);
        let records = parse_records(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].route(), "LHR-EWR");
        assert!(!records[0].id.is_empty());

        let aggregated = aggregate(&records, &segments("LHR-EWR"), &directory());
        let first = aggregated.values().next().unwrap()["LHR-EWR"]
            .class(CabinClass::First)
            .unwrap()
            .clone();
        assert!(first.available);
        assert!(first.sources.is_empty());
    }

    #[test]
    fn test_airline_list_selection() {
        let cabin = CabinAvailability {
            airlines: "AA, BA".to_string(),
            direct_airlines: "BA".to_string(),
            ..Default::default()
        };
        assert_eq!(cabin.airlines_for(false), vec!["AA", "BA"]);
        assert_eq!(cabin.airlines_for(true), vec!["BA"]);
    }
}
