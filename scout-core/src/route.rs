use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::airports::{collapse_to_path, AirportDirectory};
use crate::CoreError;

/// A directed city pair, rendered as `ORIGIN-DEST`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

impl Route {
    pub fn new(origin: &str, destination: &str) -> Self {
        Self {
            origin: origin.trim().to_uppercase(),
            destination: destination.trim().to_uppercase(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin, self.destination)
    }
}

impl FromStr for Route {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((origin, destination))
                if !origin.trim().is_empty()
                    && !destination.trim().is_empty()
                    && !destination.contains('-') =>
            {
                Ok(Route::new(origin, destination))
            }
            _ => Err(CoreError::ValidationError(format!("Invalid route: {}", s))),
        }
    }
}

/// Split a hyphen-separated path into trimmed, non-empty segments.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('-')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Every `ORIGIN-DEST` pair implied by a path such as `NYC-EUR-ASA/DOH-HND/NRT`.
///
/// Adjacent segments are expanded (slash lists and group codes) and crossed;
/// self-pairs are dropped. A single-segment path yields nothing.
pub fn generate_permutations(path: &str, directory: &AirportDirectory) -> BTreeSet<String> {
    let expanded: Vec<BTreeSet<String>> = split_path(path)
        .iter()
        .map(|segment| directory.expand_segment(segment))
        .collect();

    let mut routes = BTreeSet::new();
    for pair in expanded.windows(2) {
        for from in &pair[0] {
            for to in &pair[1] {
                if from != to {
                    routes.insert(format!("{}-{}", from, to));
                }
            }
        }
    }
    routes
}

/// Reverse the segment order of a path for the return trip.
/// `NRT/HND-OAK` becomes `OAK-NRT/HND`; applying it twice restores the input.
pub fn reverse_path(path: &str) -> String {
    path.split('-').rev().collect::<Vec<_>>().join("-")
}

/// Replace every group code with its concrete members, keeping segment order.
pub fn expand_path(path: &str, directory: &AirportDirectory) -> String {
    split_path(path)
        .iter()
        .map(|segment| collapse_to_path(&directory.expand_segment(segment)))
        .collect::<Vec<_>>()
        .join("-")
}

/// Whether any segment references a group code.
pub fn contains_group(path: &str, directory: &AirportDirectory) -> bool {
    split_path(path).iter().any(|segment| segment_has_group(segment, directory))
}

/// Whether a group appears strictly between the first and last segment.
pub fn contains_interior_group(path: &str, directory: &AirportDirectory) -> bool {
    let segments = split_path(path);
    if segments.len() < 3 {
        return false;
    }
    segments[1..segments.len() - 1]
        .iter()
        .any(|segment| segment_has_group(segment, directory))
}

fn segment_has_group(segment: &str, directory: &AirportDirectory) -> bool {
    segment.split('/').any(|code| directory.is_group(code))
}
