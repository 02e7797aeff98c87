//! # payproglobal-rs
//!
//! PayPro Global integration core: tamper-resistant checkout links, IPN
//! (webhook) validation and subscription cancellation.
//!
//! ## Features
//!
//! - **Checkout links**: visible query parameters plus an AES-256-CBC encrypted
//!   `products[1][data]` blob that carries the authoritative price
//! - **Currency fallback**: prices in currencies the provider does not accept
//!   are converted to USD through a pluggable [`currency::RateSource`]
//! - **IPN validation**: SHA-256 signature check over the provider's protected
//!   field subset, with a distinct 403-mapped authentication error
//! - **Custom fields**: decoding of the provider's ambiguous
//!   `x-key=value,...` blob
//! - **Cancellation**: authenticated subscription termination with the
//!   provider's `{isSuccess, errors}` envelope interpreted
//!
//! ## Quick Start
//!
//! ### Checkout link
//!
//! ```rust,no_run
//! use payproglobal_rs::checkout::CheckoutLinkBuilder;
//! use payproglobal_rs::config::PayProConfig;
//! use payproglobal_rs::currency::HttpRateSource;
//! use payproglobal_rs::types::{CheckoutRequest, Sku};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PayProConfig::from_env()?;
//! let rates = Arc::new(HttpRateSource::new("https://rates.example.com"));
//! let builder = CheckoutLinkBuilder::new(config, rates);
//!
//! let request = CheckoutRequest::new(Sku::Pro, "EUR", Decimal::new(1999, 2), "pricing-page")
//!     .with_email("jane@example.com");
//! let url = builder.build_checkout_url(&request).await?;
//! println!("{}", url);
//! # Ok(())
//! # }
//! ```
//!
//! ### IPN validation
//!
//! ```rust
//! use payproglobal_rs::types::WebhookNotification;
//! use payproglobal_rs::webhook::WebhookValidator;
//!
//! let validator = WebhookValidator::new("ipn-validation-key");
//! let notification = WebhookNotification::from_form_body(
//!     "IPN_TYPE_NAME=OrderCharged&SIGNATURE=forged&TEST_MODE=0&CUSTOMER_EMAIL=a%40b.co\
//!      &ORDER_ID=1&ORDER_STATUS=Processed&ORDER_TOTAL_AMOUNT=9.99",
//! ).unwrap();
//!
//! let err = validator.validate(&notification).unwrap_err();
//! assert_eq!(err.status_code().as_u16(), 403);
//! ```
//!
//! ## Security
//!
//! - The encrypted product blob, not the visible query string, is what the
//!   provider charges; visible parameters are informational
//! - The IPN signature covers only `ORDER_ID`, `ORDER_STATUS`,
//!   `ORDER_TOTAL_AMOUNT`, `CUSTOMER_EMAIL`, `TEST_MODE` and `IPN_TYPE_NAME`;
//!   other fields are not integrity protected by the provider
//! - Signatures are compared in constant time

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod checkout;
pub mod config;
pub mod crypto;
pub mod currency;
pub mod errors;
pub mod subscription;
pub mod transport;
pub mod types;
pub mod webhook;

// Re-export commonly used items
pub use checkout::CheckoutLinkBuilder;
pub use config::PayProConfig;
pub use errors::{PayProError, Result};
pub use subscription::SubscriptionCanceller;
pub use types::{CheckoutRequest, IpnType, Sku, SubscriptionId, WebhookNotification};
pub use webhook::{parse_custom_fields, DecodedNotification, WebhookValidator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_accessibility() {
        let config = PayProConfig::new(
            "1",
            "secret",
            "0123456789abcdef0123456789abcdef",
            "abcdef9876543210",
            "validation",
        );
        let _ = SubscriptionCanceller::new(config.clone());
        let _ = WebhookValidator::new(config.validation_key.clone());
        let _ = CheckoutLinkBuilder::new(
            config,
            std::sync::Arc::new(currency::HttpRateSource::new("https://rates.test")),
        );
    }
}
