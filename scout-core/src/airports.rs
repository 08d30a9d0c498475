use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::CoreResult;

const BUILTIN_AIRPORTS: &str = include_str!("../data/airports.json");
const BUILTIN_GROUPS: &str = include_str!("../data/airport_groups.json");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Airport {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Static reference data: airports by IATA code and multi-airport groups.
///
/// Group members are stored slash-separated exactly as the dataset ships them.
/// A member may itself be a group code, and a group may list its own code
/// (e.g. `LAX` groups `LAX/BUR/SNA/LGB`).
#[derive(Debug, Clone, Default)]
pub struct AirportDirectory {
    airports: HashMap<String, Airport>,
    groups: HashMap<String, String>,
}

impl AirportDirectory {
    pub fn new(airports: Vec<Airport>, groups: HashMap<String, String>) -> Self {
        let airports = airports
            .into_iter()
            .map(|a| (a.code.to_uppercase(), a))
            .collect();
        let groups = groups
            .into_iter()
            .map(|(code, members)| (code.to_uppercase(), members.to_uppercase()))
            .collect();
        Self { airports, groups }
    }

    /// Load the datasets embedded in the crate.
    pub fn builtin() -> CoreResult<Self> {
        Self::from_json(BUILTIN_AIRPORTS, BUILTIN_GROUPS)
    }

    pub fn from_json(airports_json: &str, groups_json: &str) -> CoreResult<Self> {
        let airports: Vec<Airport> = serde_json::from_str(airports_json)?;
        let groups: HashMap<String, String> = serde_json::from_str(groups_json)?;
        tracing::debug!(
            airports = airports.len(),
            groups = groups.len(),
            "Loaded airport reference data"
        );
        Ok(Self::new(airports, groups))
    }

    pub fn airport(&self, code: &str) -> Option<&Airport> {
        self.airports.get(&code.trim().to_uppercase())
    }

    pub fn is_group(&self, code: &str) -> bool {
        self.groups.contains_key(&code.trim().to_uppercase())
    }

    /// Raw slash-separated member list of a group.
    pub fn group_members(&self, code: &str) -> Option<&str> {
        self.groups.get(&code.trim().to_uppercase()).map(String::as_str)
    }

    /// Expand a code into the set of concrete airport codes it stands for.
    ///
    /// Works off a stack rather than recursion. A group already expanded once
    /// is emitted as a literal code the next time it is reached, so
    /// self-referential and mutually-referential groups terminate.
    pub fn expand_group(&self, code: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut work: Vec<String> = split_codes(code).collect();

        while let Some(item) = work.pop() {
            match self.groups.get(&item) {
                Some(members) if visited.insert(item.clone()) => {
                    work.extend(split_codes(members));
                }
                _ => {
                    result.insert(item);
                }
            }
        }

        result
    }

    /// Expand a path segment such as `NYC/BOS` into concrete codes.
    pub fn expand_segment(&self, segment: &str) -> BTreeSet<String> {
        split_codes(segment)
            .flat_map(|code| self.expand_group(&code))
            .collect()
    }
}

fn split_codes(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split('/')
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
}

/// Render a code set as a slash-joined segment.
pub fn collapse_to_path<'a, I>(codes: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    codes.into_iter().map(String::as_str).collect::<Vec<_>>().join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(groups: &[(&str, &str)]) -> AirportDirectory {
        AirportDirectory::new(
            Vec::new(),
            groups
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn set(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_unknown_code_passes_through() {
        let dir = directory(&[("NYC", "JFK/EWR/LGA")]);
        assert_eq!(dir.expand_group("SFO"), set(&["SFO"]));
    }

    #[test]
    fn test_nested_groups_expand_transitively() {
        let dir = directory(&[("LON", "LHR/LGW"), ("EUR", "LON/CDG")]);
        assert_eq!(dir.expand_group("EUR"), set(&["CDG", "LGW", "LHR"]));
    }

    #[test]
    fn test_self_referential_group_terminates() {
        let dir = directory(&[("LAX", "LAX/BUR")]);
        assert_eq!(dir.expand_group("LAX"), set(&["BUR", "LAX"]));
    }

    #[test]
    fn test_mutually_referential_groups_terminate() {
        let dir = directory(&[("AAA", "BBB/XXX"), ("BBB", "AAA/YYY")]);
        let expanded = dir.expand_group("AAA");
        assert!(expanded.contains("XXX"));
        assert!(expanded.contains("YYY"));
        assert!(expanded.contains("AAA"));
    }

    #[test]
    fn test_expand_segment_unions_slash_members() {
        let dir = directory(&[("TYO", "HND/NRT")]);
        assert_eq!(dir.expand_segment("TYO/kix"), set(&["HND", "KIX", "NRT"]));
    }

    #[test]
    fn test_builtin_directory_loads() {
        let dir = AirportDirectory::builtin().expect("embedded data parses");
        assert!(dir.is_group("NYC"));
        assert_eq!(dir.airport("hnd").map(|a| a.city.as_str()), Some("Tokyo"));
        let europe = dir.expand_group("EUR");
        assert!(europe.contains("LHR"));
        assert!(europe.contains("CDG"));
        assert!(!europe.contains("LON"));
    }

    #[test]
    fn test_collapse_to_path() {
        let codes = set(&["HND", "NRT"]);
        assert_eq!(collapse_to_path(&codes), "HND/NRT");
    }
}
