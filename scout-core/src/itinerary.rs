//! Results table for the UA route-search endpoint: one flat row per
//! bookable trip, with derived seat, layover and cash-price columns.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::cabin::CabinClass;
use crate::calendar::{paginate, Page};
use crate::pricing::{round_cents, RateConfig};

// ============================================================================
// Wire shape (route-search response)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ItineraryWire {
    #[serde(rename = "ID", deserialize_with = "null_as_default")]
    id: String,
    #[serde(rename = "Date", deserialize_with = "null_as_default")]
    date: String,
    #[serde(rename = "Route", deserialize_with = "null_as_default")]
    route: RouteWire,
    #[serde(rename = "AvailabilityTrips")]
    trips: Option<Vec<TripWire>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RouteWire {
    #[serde(deserialize_with = "null_as_default")]
    origin_airport: String,
    #[serde(deserialize_with = "null_as_default")]
    destination_airport: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct TripWire {
    #[serde(rename = "ID", deserialize_with = "null_as_default")]
    id: String,
    #[serde(deserialize_with = "null_as_default")]
    cabin: String,
    #[serde(deserialize_with = "lenient_u64")]
    mileage_cost: u64,
    #[serde(deserialize_with = "lenient_u64")]
    total_taxes: u64,
    #[serde(deserialize_with = "null_as_default")]
    taxes_currency: String,
    #[serde(deserialize_with = "lenient_u64")]
    remaining_seats: u64,
    #[serde(deserialize_with = "lenient_u64")]
    stops: u64,
    #[serde(deserialize_with = "lenient_u64")]
    total_duration: u64,
    #[serde(deserialize_with = "null_as_default")]
    carriers: String,
    #[serde(deserialize_with = "null_as_default")]
    flight_numbers: String,
    #[serde(deserialize_with = "null_as_default")]
    departs_at: String,
    #[serde(deserialize_with = "null_as_default")]
    arrives_at: String,
    availability_segments: Option<Vec<SegmentWire>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct SegmentWire {
    #[serde(deserialize_with = "null_as_default")]
    flight_number: String,
    #[serde(deserialize_with = "null_as_default")]
    origin_airport: String,
    #[serde(deserialize_with = "null_as_default")]
    destination_airport: String,
    #[serde(deserialize_with = "null_as_default")]
    departs_at: String,
    #[serde(deserialize_with = "null_as_default")]
    arrives_at: String,
    #[serde(deserialize_with = "null_as_default")]
    fare_class: String,
    #[serde(deserialize_with = "null_as_default")]
    aircraft_name: String,
}

/// `null` reads as the field's default, the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().map(|f| f.max(0.0) as u64).unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(|f| f.max(0.0) as u64).unwrap_or(0),
        _ => 0,
    })
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    // keep the wall-clock time; layovers compare times at the same airport
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok())
}

// ============================================================================
// Flat rows
// ============================================================================

/// Fare buckets United sells as saver awards.
const SAVER_FARE_CLASSES: [&str; 4] = ["X", "XN", "I", "IN"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRow {
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departs_at: Option<NaiveDateTime>,
    pub arrives_at: Option<NaiveDateTime>,
    pub fare_class: String,
    pub aircraft: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryRow {
    pub id: String,
    pub date: Option<NaiveDate>,
    pub origin: String,
    pub destination: String,
    pub cabin: Option<CabinClass>,
    pub mileage_cost: u64,
    /// Taxes in major currency units.
    pub taxes: f64,
    pub taxes_currency: String,
    pub seats: u64,
    pub stops: u64,
    pub duration_minutes: u64,
    pub carriers: String,
    pub flight_numbers: String,
    pub departs_at: Option<NaiveDateTime>,
    pub arrives_at: Option<NaiveDateTime>,
    pub layovers: Vec<i64>,
    pub segments: Vec<SegmentRow>,
    pub cash_price: Option<f64>,
}

impl ItineraryRow {
    pub fn layover_minutes(&self) -> i64 {
        self.layovers.iter().sum()
    }

    /// Price the miles with the promotion model and add converted taxes.
    pub fn with_cash_price(mut self, rate: &RateConfig, today: NaiveDate, taxes_usd: f64) -> Self {
        self.cash_price = Some(round_cents(rate.cash_value(self.mileage_cost, today) + taxes_usd));
        self
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.origin,
            self.destination,
            self.carriers,
            self.flight_numbers,
            self.cabin.map(|c| c.label()).unwrap_or_default()
        )
        .to_lowercase()
    }
}

/// Seats reported by the backend, or one seat when every segment books a
/// saver bucket and the count was left blank.
fn estimate_seats(remaining: u64, segments: &[SegmentRow]) -> u64 {
    if remaining > 0 {
        return remaining;
    }
    let all_saver = !segments.is_empty()
        && segments
            .iter()
            .all(|s| SAVER_FARE_CLASSES.contains(&s.fare_class.trim().to_uppercase().as_str()));
    u64::from(all_saver)
}

/// Minutes on the ground between consecutive segments.
fn layovers(segments: &[SegmentRow]) -> Vec<i64> {
    segments
        .windows(2)
        .filter_map(|pair| {
            let arrived = pair[0].arrives_at?;
            let departs = pair[1].departs_at?;
            Some((departs - arrived).num_minutes())
        })
        .collect()
}

/// Flatten a route-search payload into one row per trip.
pub fn flatten_itineraries(payload: &Value) -> Vec<ItineraryRow> {
    let Some(items) = payload.as_array() else {
        tracing::warn!("Route-search payload is not an array, treating as empty");
        return Vec::new();
    };

    let mut rows = Vec::new();
    for item in items {
        let itinerary: ItineraryWire = match serde_json::from_value(item.clone()) {
            Ok(it) => it,
            Err(e) => {
                tracing::warn!("Skipping malformed itinerary: {}", e);
                continue;
            }
        };
        let day = itinerary.date.get(..10).unwrap_or_default();
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok();

        for trip in itinerary.trips.unwrap_or_default() {
            let segments: Vec<SegmentRow> = trip
                .availability_segments
                .unwrap_or_default()
                .into_iter()
                .map(|s| SegmentRow {
                    flight_number: s.flight_number,
                    origin: s.origin_airport.to_uppercase(),
                    destination: s.destination_airport.to_uppercase(),
                    departs_at: parse_timestamp(&s.departs_at),
                    arrives_at: parse_timestamp(&s.arrives_at),
                    fare_class: s.fare_class,
                    aircraft: s.aircraft_name,
                })
                .collect();

            let origin = segments
                .first()
                .map(|s| s.origin.clone())
                .unwrap_or_else(|| itinerary.route.origin_airport.to_uppercase());
            let destination = segments
                .last()
                .map(|s| s.destination.clone())
                .unwrap_or_else(|| itinerary.route.destination_airport.to_uppercase());

            rows.push(ItineraryRow {
                id: if trip.id.is_empty() { itinerary.id.clone() } else { trip.id },
                date,
                origin,
                destination,
                cabin: trip.cabin.parse().ok(),
                mileage_cost: trip.mileage_cost,
                taxes: trip.total_taxes as f64 / 100.0,
                taxes_currency: trip.taxes_currency,
                seats: estimate_seats(trip.remaining_seats, &segments),
                stops: trip.stops,
                duration_minutes: trip.total_duration,
                carriers: trip.carriers,
                flight_numbers: trip.flight_numbers,
                departs_at: parse_timestamp(&trip.departs_at),
                arrives_at: parse_timestamp(&trip.arrives_at),
                layovers: layovers(&segments),
                segments,
                cash_price: None,
            });
        }
    }
    rows
}

// ============================================================================
// Search / sort / paginate
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Departure,
    Miles,
    Cash,
    Seats,
    Stops,
    Duration,
    Layover,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableQuery {
    pub search: String,
    pub sort: SortKey,
    pub direction: SortDirection,
    pub page: usize,
    pub per_page: usize,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort: SortKey::default(),
            direction: SortDirection::default(),
            page: 0,
            per_page: 25,
        }
    }
}

fn compare(a: &ItineraryRow, b: &ItineraryRow, key: SortKey) -> Ordering {
    match key {
        SortKey::Departure => a.departs_at.cmp(&b.departs_at).then(a.date.cmp(&b.date)),
        SortKey::Miles => a.mileage_cost.cmp(&b.mileage_cost),
        SortKey::Cash => a
            .cash_price
            .partial_cmp(&b.cash_price)
            .unwrap_or(Ordering::Equal),
        SortKey::Seats => a.seats.cmp(&b.seats),
        SortKey::Stops => a.stops.cmp(&b.stops),
        SortKey::Duration => a.duration_minutes.cmp(&b.duration_minutes),
        SortKey::Layover => a.layover_minutes().cmp(&b.layover_minutes()),
    }
}

pub fn query_table(rows: &[ItineraryRow], query: &TableQuery) -> Page<ItineraryRow> {
    let needle = query.search.trim().to_lowercase();
    let mut matched: Vec<ItineraryRow> = rows
        .iter()
        .filter(|row| needle.is_empty() || row.search_text().contains(&needle))
        .cloned()
        .collect();

    matched.sort_by(|a, b| {
        let ord = compare(a, b, query.sort);
        match query.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    paginate(&matched, query.page, query.per_page)
}
