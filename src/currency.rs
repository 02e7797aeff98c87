//! Currency support and the collaborators used for USD conversion.
//!
//! The provider only prices checkouts in a fixed set of currencies. Anything
//! else is converted to USD using the latest rates from a [`RateSource`].

use crate::errors::{PayProError, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

/// Currency every unsupported checkout is converted to.
pub const FALLBACK_CURRENCY: &str = "USD";

/// ISO 4217 codes the provider accepts as checkout pricing currency.
pub const SUPPORTED_CURRENCIES: &[&str] = &[
    "AED", "ALL", "AMD", "ARS", "AUD", "AZN", "BAM", "BDT", "BGN", "BHD", "BOB", "BRL", "BYN",
    "CAD", "CHF", "CLP", "CNY", "COP", "CRC", "CZK", "DKK", "DOP", "DZD", "EGP", "EUR", "GBP",
    "GEL", "GHS", "GTQ", "HKD", "HNL", "HRK", "HUF", "IDR", "ILS", "INR", "IQD", "ISK", "JMD",
    "JOD", "JPY", "KES", "KGS", "KRW", "KWD", "KZT", "LBP", "LKR", "MAD", "MDL", "MKD", "MMK",
    "MNT", "MUR", "MXN", "MYR", "NGN", "NIO", "NOK", "NPR", "NZD", "OMR", "PAB", "PEN", "PHP",
    "PKR", "PLN", "PYG", "QAR", "RON", "RSD", "SAR", "SEK", "SGD", "THB", "TND", "TRY", "TTD",
    "TWD", "TZS", "UAH", "UGX", "USD", "UYU", "UZS", "VND", "XAF", "XOF", "ZAR", "ZMW", "BND",
    "BWP", "ETB", "FJD", "KHR", "LAK", "MOP", "MZN", "NAD", "RWF",
];

/// Returns true if the provider can price a checkout in `currency` directly.
///
/// # Examples
///
/// ```
/// use payproglobal_rs::currency::is_supported_currency;
///
/// assert!(is_supported_currency("EUR"));
/// assert!(is_supported_currency("eur"));
/// assert!(!is_supported_currency("XYZ"));
/// ```
pub fn is_supported_currency(currency: &str) -> bool {
    SUPPORTED_CURRENCIES
        .iter()
        .any(|c| c.eq_ignore_ascii_case(currency))
}

/// Source of currency conversion rates.
///
/// Rates are keyed by ISO code and expressed as units of that currency per one
/// unit of `base`.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetches the latest rates relative to `base`.
    async fn get_latest_rates(&self, base: &str) -> Result<HashMap<String, String>>;
}

/// Fire-and-forget sink for noteworthy but non-fatal conditions.
pub trait ErrorReporter: Send + Sync {
    /// Reports `message`. Must not fail or block.
    fn report_error(&self, message: &str);
}

/// [`ErrorReporter`] that writes to the `tracing` error stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report_error(&self, message: &str) {
        tracing::error!(target: "payproglobal::report", "{}", message);
    }
}

/// [`RateSource`] backed by an HTTP rates API answering
/// `GET {base_url}/latest?base=USD` with `{"rates": {"EUR": 0.92, ...}}`.
#[derive(Clone, Debug)]
pub struct HttpRateSource {
    base_url: String,
    http_client: Client,
}

#[derive(Deserialize)]
struct RatesResponse {
    rates: HashMap<String, serde_json::Value>,
}

impl HttpRateSource {
    /// Creates a rate source for the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: Client::new(),
        }
    }

    /// Sets a custom HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn get_latest_rates(&self, base: &str) -> Result<HashMap<String, String>> {
        let url = format!("{}/latest", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("base", base)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PayProError::TransportError { status, body });
        }

        let payload: RatesResponse = response.json().await?;
        let rates = payload
            .rates
            .into_iter()
            .map(|(code, rate)| {
                let rate = match rate {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (code, rate)
            })
            .collect();

        Ok(rates)
    }
}

/// Converts `price` in `currency` to USD using a rate table based on USD.
///
/// The result is rounded to cents. A missing, unparseable or zero rate is a
/// configuration error: the checkout cannot be priced.
///
/// # Examples
///
/// ```
/// use payproglobal_rs::currency::convert_to_usd;
/// use rust_decimal::Decimal;
/// use std::collections::HashMap;
///
/// let rates = HashMap::from([("XYZ".to_string(), "4".to_string())]);
/// let usd = convert_to_usd(Decimal::new(1000, 2), "XYZ", &rates).unwrap();
/// assert_eq!(usd, Decimal::new(250, 2));
/// ```
pub fn convert_to_usd(
    price: Decimal,
    currency: &str,
    rates: &HashMap<String, String>,
) -> Result<Decimal> {
    let missing = || PayProError::MissingConversionRate(currency.to_string());

    let raw = rates
        .get(currency)
        .or_else(|| rates.get(&currency.to_ascii_uppercase()))
        .ok_or_else(missing)?;

    let rate = Decimal::from_str(raw.trim())
        .or_else(|_| Decimal::from_scientific(raw.trim()))
        .map_err(|_| missing())?;

    if rate <= Decimal::ZERO {
        return Err(missing());
    }

    let converted = price.checked_div(rate).ok_or_else(missing)?;
    Ok(converted.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_supported_currencies() {
        assert!(SUPPORTED_CURRENCIES.len() >= 100);
        assert!(is_supported_currency("USD"));
        assert!(is_supported_currency("JPY"));
        assert!(!is_supported_currency("VES"));
        assert!(!is_supported_currency(""));
    }

    #[test]
    fn test_convert_to_usd() {
        let table = rates(&[("VES", "36.5"), ("SOS", "571.0")]);
        let usd = convert_to_usd(Decimal::new(7300, 2), "VES", &table).unwrap();
        assert_eq!(usd, Decimal::new(200, 2));

        let usd = convert_to_usd(Decimal::from(1000), "SOS", &table).unwrap();
        assert_eq!(usd, Decimal::new(175, 2));
    }

    #[test]
    fn test_convert_scientific_rate() {
        let table = rates(&[("IRR", "4.2e4")]);
        let usd = convert_to_usd(Decimal::from(84000), "IRR", &table).unwrap();
        assert_eq!(usd, Decimal::from(2));
    }

    #[test]
    fn test_convert_missing_rate() {
        let table = rates(&[("VES", "36.5")]);
        let err = convert_to_usd(Decimal::ONE, "XYZ", &table).unwrap_err();
        assert!(matches!(err, PayProError::MissingConversionRate(ref c) if c == "XYZ"));
    }

    #[test]
    fn test_convert_rejects_zero_and_garbage_rates() {
        let table = rates(&[("AAA", "0"), ("BBB", "n/a")]);
        assert!(convert_to_usd(Decimal::ONE, "AAA", &table).is_err());
        assert!(convert_to_usd(Decimal::ONE, "BBB", &table).is_err());
    }
}
