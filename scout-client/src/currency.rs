use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use scout_core::itinerary::ItineraryRow;
use scout_core::pricing::RateConfig;
use serde::Deserialize;
use std::collections::HashMap;

use crate::api::read_json;
use crate::{ClientError, ClientResult};

#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    async fn convert(&self, amount: f64, from: &str, to: &str) -> ClientResult<f64>;
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    rates: HashMap<String, f64>,
}

/// Exchange-rate service client: `GET {base}/latest?base=FROM`.
pub struct HttpCurrencyConverter {
    client: Client,
    base_url: String,
}

impl HttpCurrencyConverter {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CurrencyConverter for HttpCurrencyConverter {
    async fn convert(&self, amount: f64, from: &str, to: &str) -> ClientResult<f64> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(amount);
        }
        let url = format!("{}/latest", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("base", from.to_uppercase())])
            .send()
            .await?;
        let latest: LatestRates = serde_json::from_value(read_json(response).await?)?;
        let rate = latest
            .rates
            .get(&to.to_uppercase())
            .copied()
            .ok_or_else(|| ClientError::MissingRate {
                from: from.to_uppercase(),
                to: to.to_uppercase(),
            })?;
        Ok(amount * rate)
    }
}

/// Fill the cash-price column: miles through the promotion model plus taxes
/// converted to USD. Each currency is converted once per call.
pub async fn price_itineraries(
    rows: Vec<ItineraryRow>,
    rate: &RateConfig,
    converter: &dyn CurrencyConverter,
    today: NaiveDate,
) -> ClientResult<Vec<ItineraryRow>> {
    let mut usd_per_unit: HashMap<String, f64> = HashMap::new();
    let mut priced = Vec::with_capacity(rows.len());

    for row in rows {
        let currency = if row.taxes_currency.is_empty() {
            "USD".to_string()
        } else {
            row.taxes_currency.to_uppercase()
        };
        let factor = match usd_per_unit.get(&currency) {
            Some(f) => *f,
            None => {
                let f = converter.convert(1.0, &currency, "USD").await?;
                usd_per_unit.insert(currency, f);
                f
            }
        };
        let taxes_usd = row.taxes * factor;
        priced.push(row.with_cash_price(rate, today, taxes_usd));
    }
    Ok(priced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedRates {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CurrencyConverter for FixedRates {
        async fn convert(&self, amount: f64, from: &str, _to: &str) -> ClientResult<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match from {
                "USD" => Ok(amount),
                "EUR" => Ok(amount * 2.0),
                other => Err(ClientError::MissingRate {
                    from: other.to_string(),
                    to: "USD".to_string(),
                }),
            }
        }
    }

    fn row(currency: &str, taxes: f64) -> ItineraryRow {
        ItineraryRow {
            id: "t".to_string(),
            date: None,
            origin: "SFO".to_string(),
            destination: "NRT".to_string(),
            cabin: None,
            mileage_cost: 10000,
            taxes,
            taxes_currency: currency.to_string(),
            seats: 1,
            stops: 0,
            duration_minutes: 600,
            carriers: "UA".to_string(),
            flight_numbers: "UA 837".to_string(),
            departs_at: None,
            arrives_at: None,
            layovers: Vec::new(),
            segments: Vec::new(),
            cash_price: None,
        }
    }

    #[tokio::test]
    async fn test_price_itineraries_converts_once_per_currency() {
        let rate: RateConfig = serde_json::from_value(serde_json::json!({
            "basePrice": 0.01, "type": "bonus", "endDate": null, "tiers": []
        }))
        .unwrap();
        let converter = FixedRates { calls: AtomicUsize::new(0) };
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        let rows = vec![row("EUR", 10.0), row("eur", 5.0), row("", 1.0)];
        let priced = price_itineraries(rows, &rate, &converter, today).await.unwrap();

        assert_eq!(priced[0].cash_price, Some(120.0));
        assert_eq!(priced[1].cash_price, Some(110.0));
        assert_eq!(priced[2].cash_price, Some(101.0));
        assert_eq!(converter.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_currency_fails() {
        let rate: RateConfig = serde_json::from_value(serde_json::json!({
            "basePrice": 0.01, "type": "discount", "endDate": null
        }))
        .unwrap();
        let converter = FixedRates { calls: AtomicUsize::new(0) };
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let result = price_itineraries(vec![row("XXX", 1.0)], &rate, &converter, today).await;
        assert!(matches!(result, Err(ClientError::MissingRate { .. })));
    }
}
