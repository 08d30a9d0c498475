use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Cabin class as reported by the availability backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CabinClass {
    #[serde(rename = "Y", alias = "Economy")]
    Economy,
    #[serde(rename = "W", alias = "Premium")]
    PremiumEconomy,
    #[serde(rename = "J", alias = "Business")]
    Business,
    #[serde(rename = "F", alias = "First")]
    First,
}

impl CabinClass {
    pub const ALL: [CabinClass; 4] = [
        CabinClass::Economy,
        CabinClass::PremiumEconomy,
        CabinClass::Business,
        CabinClass::First,
    ];

    /// Single-letter code used as the field prefix in raw records.
    pub fn code(&self) -> &'static str {
        match self {
            CabinClass::Economy => "Y",
            CabinClass::PremiumEconomy => "W",
            CabinClass::Business => "J",
            CabinClass::First => "F",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CabinClass::Economy => "Economy",
            CabinClass::PremiumEconomy => "Premium",
            CabinClass::Business => "Business",
            CabinClass::First => "First",
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CabinClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        CabinClass::ALL
            .into_iter()
            .find(|c| {
                c.code().eq_ignore_ascii_case(trimmed) || c.label().eq_ignore_ascii_case(trimmed)
            })
            .or_else(|| {
                // the backend also spells these out in lowercase on itinerary trips
                match trimmed.to_ascii_lowercase().as_str() {
                    "economy" => Some(CabinClass::Economy),
                    "premium economy" | "premium_economy" => Some(CabinClass::PremiumEconomy),
                    "business" => Some(CabinClass::Business),
                    "first" => Some(CabinClass::First),
                    _ => None,
                }
            })
            .ok_or_else(|| CoreError::ValidationError(format!("Unknown cabin class: {}", s)))
    }
}
