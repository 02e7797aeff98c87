//! Checkout link generation.
//!
//! A checkout link carries informational query parameters plus one encrypted
//! `products[1][data]` blob holding the authoritative price. Prices in
//! currencies the provider does not accept are converted to USD first.

use crate::config::PayProConfig;
use crate::crypto::{encrypt_product_params, product_params_plaintext};
use crate::currency::{
    convert_to_usd, is_supported_currency, ErrorReporter, RateSource, TracingErrorReporter,
    FALLBACK_CURRENCY,
};
use crate::errors::{PayProError, Result};
use crate::types::CheckoutRequest;
use rust_decimal::Decimal;
use std::sync::Arc;
use url::Url;

/// Path of the hosted checkout page under the provider base URL.
pub const CHECKOUT_PATH: &str = "checkout";

/// Builds provider checkout URLs.
///
/// Cheap to clone and safe to share between tasks: it only holds immutable
/// configuration and shared collaborators.
#[derive(Clone)]
pub struct CheckoutLinkBuilder {
    config: PayProConfig,
    rate_source: Arc<dyn RateSource>,
    error_reporter: Arc<dyn ErrorReporter>,
}

impl CheckoutLinkBuilder {
    /// Creates a builder that reports unsupported-currency checkouts through
    /// `tracing`.
    pub fn new(config: PayProConfig, rate_source: Arc<dyn RateSource>) -> Self {
        Self {
            config,
            rate_source,
            error_reporter: Arc::new(TracingErrorReporter),
        }
    }

    /// Sets the sink for unsupported-currency reports.
    pub fn with_error_reporter(mut self, error_reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = error_reporter;
        self
    }

    /// Builds the checkout URL for `request`.
    ///
    /// # Errors
    ///
    /// - `UnsupportedSku` if the SKU has no provider product; nothing else is
    ///   attempted in that case
    /// - `MissingConversionRate` if the currency is unsupported and no USD rate
    ///   can be found for it
    /// - `CryptoError` if the configured key or IV is unusable
    pub async fn build_checkout_url(&self, request: &CheckoutRequest) -> Result<Url> {
        let product_id = request
            .sku
            .product_id()
            .ok_or_else(|| PayProError::UnsupportedSku(request.sku.to_string()))?;

        let (price_currency, amount) = self.resolve_price(request).await?;

        let plaintext = product_params_plaintext(&price_currency, amount);
        let data = encrypt_product_params(
            &plaintext,
            &self.config.product_params_key,
            &self.config.product_params_iv,
        )?;

        let mut url = Url::parse(&self.config.endpoint(CHECKOUT_PATH))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("currency", &request.currency);
            if let Some(email) = &request.email {
                query.append_pair("billing-email", email);
            }
            if let Some(country) = &request.country_code {
                query.append_pair("billing-country", country);
            }
            query.append_pair("x-source", &request.source);
            if let Some(passthrough) = &request.passthrough {
                query.append_pair("x-passthrough", passthrough);
            }
            if let Some(return_url) = &request.return_url {
                query.append_pair("x-return-url", return_url);
            }
            query.append_pair("products[1][id]", &product_id.to_string());
            if let Some(quantity) = request.quantity {
                query.append_pair("products[1][qty]", &quantity.to_string());
            }
            query.append_pair("products[1][data]", &data);
        }

        tracing::debug!(
            sku = %request.sku,
            product_id,
            currency = %price_currency,
            "built checkout url"
        );

        Ok(url)
    }

    /// Currency and amount the encrypted blob is priced in.
    async fn resolve_price(&self, request: &CheckoutRequest) -> Result<(String, Decimal)> {
        if is_supported_currency(&request.currency) {
            return Ok((request.currency.to_ascii_uppercase(), request.price));
        }

        tracing::warn!(
            currency = %request.currency,
            sku = %request.sku,
            "checkout currency not supported by provider, converting to USD"
        );
        self.error_reporter.report_error(&format!(
            "Checkout attempted with unsupported currency {} for {}",
            request.currency, request.sku
        ));

        let rates = self.rate_source.get_latest_rates(FALLBACK_CURRENCY).await?;
        let amount = convert_to_usd(request.price, &request.currency, &rates)?;

        Ok((FALLBACK_CURRENCY.to_string(), amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::decrypt_product_params;
    use crate::types::Sku;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const KEY: &str = "0123456789abcdef0123456789abcdef";
    const IV: &str = "abcdef9876543210";

    #[derive(Default)]
    struct StaticRates {
        rates: HashMap<String, String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateSource for StaticRates {
        async fn get_latest_rates(&self, base: &str) -> Result<HashMap<String, String>> {
            assert_eq!(base, "USD");
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rates.clone())
        }
    }

    #[derive(Default)]
    struct CountingReporter {
        calls: AtomicUsize,
    }

    impl ErrorReporter for CountingReporter {
        fn report_error(&self, _message: &str) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config() -> PayProConfig {
        PayProConfig::new("1", "secret", KEY, IV, "validation")
    }

    fn builder(rates: &[(&str, &str)]) -> (CheckoutLinkBuilder, Arc<StaticRates>, Arc<CountingReporter>) {
        let source = Arc::new(StaticRates {
            rates: rates
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        });
        let reporter = Arc::new(CountingReporter::default());
        let builder = CheckoutLinkBuilder::new(config(), source.clone())
            .with_error_reporter(reporter.clone());
        (builder, source, reporter)
    }

    fn query(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    fn decrypted_price(url: &Url) -> HashMap<String, String> {
        let data = query(url).remove("products[1][data]").unwrap();
        let plaintext = decrypt_product_params(&data, KEY, IV).unwrap();
        url::form_urlencoded::parse(plaintext.as_bytes())
            .into_owned()
            .collect()
    }

    #[tokio::test]
    async fn test_supported_currency_is_used_verbatim() {
        let (builder, source, reporter) = builder(&[]);
        let request = CheckoutRequest::new(Sku::Pro, "EUR", Decimal::new(1999, 2), "pricing");

        let url = builder.build_checkout_url(&request).await.unwrap();

        assert_eq!(url.path(), "/checkout");
        let price = decrypted_price(&url);
        assert_eq!(price.get("price[EUR][Amount]").unwrap(), "19.99");
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(reporter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_currency_converted_to_usd() {
        let (builder, source, reporter) = builder(&[("VES", "40")]);
        let request = CheckoutRequest::new(Sku::Starter, "VES", Decimal::from(400), "app");

        let url = builder.build_checkout_url(&request).await.unwrap();

        let price = decrypted_price(&url);
        assert_eq!(price.len(), 1);
        let amount: Decimal = price.get("price[USD][Amount]").unwrap().parse().unwrap();
        assert_eq!(amount, Decimal::from(10));
        assert_eq!(query(&url).get("currency").unwrap(), "VES");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(reporter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsupported_currency_without_rate() {
        let (builder, _, reporter) = builder(&[("VES", "40")]);
        let request = CheckoutRequest::new(Sku::Starter, "XYZ", Decimal::from(5), "app");

        let err = builder.build_checkout_url(&request).await.unwrap_err();

        assert!(matches!(err, PayProError::MissingConversionRate(_)));
        assert!(err.is_configuration_error());
        assert_eq!(reporter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsupported_sku_fails_before_any_work() {
        let (builder, source, reporter) = builder(&[("VES", "40")]);
        let request = CheckoutRequest::new(Sku::Enterprise, "VES", Decimal::from(5), "app");

        let err = builder.build_checkout_url(&request).await.unwrap_err();

        assert!(matches!(err, PayProError::UnsupportedSku(ref s) if s == "enterprise"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(reporter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_optional_parameters() {
        let (builder, _, _) = builder(&[]);

        let bare = CheckoutRequest::new(Sku::Business, "USD", Decimal::from(99), "web");
        let url = builder.build_checkout_url(&bare).await.unwrap();
        let params = query(&url);
        assert_eq!(params.get("x-source").unwrap(), "web");
        assert_eq!(params.get("products[1][id]").unwrap(), "84013");
        for absent in [
            "billing-email",
            "billing-country",
            "x-passthrough",
            "x-return-url",
            "products[1][qty]",
        ] {
            assert!(!params.contains_key(absent), "{} should be omitted", absent);
        }

        let full = bare
            .with_email("jane@example.com")
            .with_country_code("DE")
            .with_quantity(3)
            .with_passthrough(r#"{"userId":"u_1"}"#)
            .with_return_url("https://app.example.com/thanks?plan=business");
        let url = builder.build_checkout_url(&full).await.unwrap();
        let params = query(&url);
        assert_eq!(params.get("billing-email").unwrap(), "jane@example.com");
        assert_eq!(params.get("billing-country").unwrap(), "DE");
        assert_eq!(params.get("products[1][qty]").unwrap(), "3");
        assert_eq!(params.get("x-passthrough").unwrap(), r#"{"userId":"u_1"}"#);
        assert_eq!(
            params.get("x-return-url").unwrap(),
            "https://app.example.com/thanks?plan=business"
        );
    }

    #[tokio::test]
    async fn test_query_parameter_order() {
        let (builder, _, _) = builder(&[]);
        let request = CheckoutRequest::new(Sku::Pro, "GBP", Decimal::from(10), "web")
            .with_email("a@b.co")
            .with_quantity(1);

        let url = builder.build_checkout_url(&request).await.unwrap();
        let keys: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();

        assert_eq!(
            keys,
            vec![
                "currency",
                "billing-email",
                "x-source",
                "products[1][id]",
                "products[1][qty]",
                "products[1][data]",
            ]
        );
    }

    #[tokio::test]
    async fn test_custom_base_url() {
        let source = Arc::new(StaticRates::default());
        let builder =
            CheckoutLinkBuilder::new(config().with_base_url("https://sandbox.example.com"), source);
        let request = CheckoutRequest::new(Sku::Pro, "USD", Decimal::from(1), "web");

        let url = builder.build_checkout_url(&request).await.unwrap();
        assert!(url.as_str().starts_with("https://sandbox.example.com/checkout?"));
    }
}
