use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// How a promotion tier modifies the base price of miles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionKind {
    /// Percentage off the per-mile price.
    Discount,
    /// Percentage of extra miles, which lowers the effective per-mile price.
    Bonus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTier {
    #[serde(rename = "minMiles")]
    pub min_miles: u64,
    #[serde(rename = "maxMiles")]
    pub max_miles: u64,
    #[serde(rename = "Percentage")]
    pub percentage: f64,
}

/// Buy-miles pricing model, as published in `rate.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateConfig {
    /// USD per mile outside any promotion
    #[serde(rename = "basePrice")]
    pub base_price: f64,
    #[serde(rename = "type")]
    pub kind: PromotionKind,
    /// Last day of the promotion; a timestamp counts for its whole day.
    #[serde(rename = "endDate", default, deserialize_with = "lenient_end_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub tiers: Vec<RateTier>,
}

/// Accepts a bare date, an RFC 3339 timestamp or a naive timestamp.
fn lenient_end_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid endDate: {}", raw)))
}

impl RateConfig {
    pub fn is_promotion_active(&self, today: NaiveDate) -> bool {
        self.end_date.map_or(true, |end| today <= end)
    }

    pub fn tier_for(&self, miles: u64) -> Option<&RateTier> {
        self.tiers
            .iter()
            .find(|t| t.min_miles <= miles && miles <= t.max_miles)
    }

    /// Effective price of one mile when buying `miles` on `today`.
    pub fn price_per_mile(&self, miles: u64, today: NaiveDate) -> f64 {
        if !self.is_promotion_active(today) {
            return self.base_price;
        }
        match self.tier_for(miles) {
            Some(tier) => match self.kind {
                PromotionKind::Discount => self.base_price * (1.0 - tier.percentage / 100.0),
                PromotionKind::Bonus => self.base_price / (1.0 + tier.percentage / 100.0),
            },
            None => self.base_price,
        }
    }

    /// Cash value of an award's mileage cost, rounded to cents.
    pub fn cash_value(&self, miles: u64, today: NaiveDate) -> f64 {
        round_cents(miles as f64 * self.price_per_mile(miles, today))
    }
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: PromotionKind) -> RateConfig {
        serde_json::from_value(serde_json::json!({
            "basePrice": 0.035,
            "type": kind,
            "endDate": "2025-06-30",
            "tiers": [
                { "minMiles": 0, "maxMiles": 29999, "Percentage": 0 },
                { "minMiles": 30000, "maxMiles": 79999, "Percentage": 20 },
                { "minMiles": 80000, "maxMiles": 200000, "Percentage": 40 }
            ]
        }))
        .expect("rate config parses")
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn test_discount_tier() {
        let rate = config(PromotionKind::Discount);
        assert_eq!(rate.cash_value(50000, day(5, 1)), 1400.0);
        assert_eq!(rate.cash_value(10000, day(5, 1)), 350.0);
    }

    #[test]
    fn test_bonus_tier() {
        let rate = config(PromotionKind::Bonus);
        assert_eq!(rate.cash_value(100000, day(5, 1)), 2500.0);
    }

    #[test]
    fn test_expired_promotion_uses_base_price() {
        let rate = config(PromotionKind::Discount);
        assert_eq!(rate.cash_value(50000, day(7, 1)), 1750.0);
        assert!(rate.is_promotion_active(day(6, 30)));
    }

    #[test]
    fn test_end_date_accepts_dates_and_timestamps() {
        let parse = |end: serde_json::Value| -> RateConfig {
            serde_json::from_value(serde_json::json!({
                "basePrice": 0.01, "type": "bonus", "endDate": end, "tiers": []
            }))
            .expect("rate config parses")
        };

        assert_eq!(parse(serde_json::json!("2025-06-30")).end_date, Some(day(6, 30)));
        assert_eq!(parse(serde_json::json!("2025-06-30T23:59:59Z")).end_date, Some(day(6, 30)));
        assert_eq!(parse(serde_json::json!("2025-06-30T10:00:00")).end_date, Some(day(6, 30)));
        assert_eq!(parse(serde_json::Value::Null).end_date, None);

        let missing: RateConfig =
            serde_json::from_str(r#"{"basePrice": 0.01, "type": "discount"}"#).unwrap();
        assert_eq!(missing.end_date, None);
        assert!(serde_json::from_str::<RateConfig>(
            r#"{"basePrice": 0.01, "type": "discount", "endDate": "soon"}"#
        )
        .is_err());
    }

    #[test]
    fn test_miles_outside_every_tier() {
        let rate = config(PromotionKind::Discount);
        assert_eq!(rate.price_per_mile(500000, day(5, 1)), 0.035);
    }
}
