//! IPN (webhook) validation and decoding.
//!
//! The provider signs only a fixed subset of the notification: `ORDER_ID`,
//! `ORDER_STATUS`, `ORDER_TOTAL_AMOUNT`, `CUSTOMER_EMAIL`, the shared
//! validation key, `TEST_MODE` and `IPN_TYPE_NAME`, concatenated without
//! separators and hashed with SHA-256. Every other field arrives unprotected;
//! that is a property of the provider and is kept as is for interoperability.

use crate::errors::{PayProError, Result};
use crate::types::{
    parse_amount, IpnType, RenewalType, SubscriptionStatus, WebhookNotification,
};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use subtle::ConstantTimeEq;

/// Start of a custom field: `x-<word>=`.
static FIELD_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"x-([A-Za-z0-9_]+)=").expect("valid custom field pattern"));

/// Boundary that ends a custom field value: `,x-<word>=`.
static FIELD_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",x-[A-Za-z0-9_]+=").expect("valid custom field pattern"));

/// Validates IPN signatures with the shared validation key.
#[derive(Clone)]
pub struct WebhookValidator {
    validation_key: String,
}

impl WebhookValidator {
    /// Creates a validator for the given validation key.
    pub fn new(validation_key: impl Into<String>) -> Self {
        Self {
            validation_key: validation_key.into(),
        }
    }

    /// Accepts the notification if its `SIGNATURE` matches, otherwise fails
    /// with `AuthenticationFailed` (HTTP 403 via `status_code()`).
    pub fn validate(&self, notification: &WebhookNotification) -> Result<()> {
        let expected = compute_signature(
            &notification.order_id,
            &notification.order_status,
            &notification.order_total_amount,
            &notification.customer_email,
            &self.validation_key,
            &notification.test_mode,
            &notification.ipn_type_name,
        );

        let supplied = notification.signature.as_bytes();
        let matches = expected.len() == supplied.len()
            && bool::from(expected.as_bytes().ct_eq(supplied));

        if !matches {
            tracing::warn!(
                order_id = %notification.order_id,
                ipn_type = %notification.ipn_type_name,
                "rejected IPN with invalid signature"
            );
            return Err(PayProError::AuthenticationFailed(
                "IPN signature mismatch".to_string(),
            ));
        }

        tracing::debug!(
            order_id = %notification.order_id,
            ipn_type = %notification.ipn_type_name,
            "IPN signature verified"
        );
        Ok(())
    }

    /// Validates the notification and, only if it is authentic, decodes it.
    pub fn validate_and_decode(
        &self,
        notification: &WebhookNotification,
    ) -> Result<DecodedNotification> {
        self.validate(notification)?;
        DecodedNotification::try_from(notification)
    }
}

/// Computes the lowercase hex SHA-256 signature of an IPN.
///
/// Arguments are concatenated in the order given, with no separators.
///
/// # Examples
///
/// ```
/// use payproglobal_rs::webhook::compute_signature;
///
/// let signature = compute_signature("1", "Processed", "9.99", "a@b.co", "key", "1", "OrderCharged");
/// assert_eq!(signature.len(), 64);
/// ```
pub fn compute_signature(
    order_id: &str,
    order_status: &str,
    order_total_amount: &str,
    customer_email: &str,
    validation_key: &str,
    test_mode: &str,
    ipn_type_name: &str,
) -> String {
    let mut hasher = Sha256::new();
    for part in [
        order_id,
        order_status,
        order_total_amount,
        customer_email,
        validation_key,
        test_mode,
        ipn_type_name,
    ] {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Decodes the `ORDER_CUSTOM_FIELDS` blob (`x-key1=value1,x-key2=value2,...`).
///
/// Values may contain commas, so a value runs lazily up to the next
/// `,x-<word>=` or the end of the input; the last value runs to the end.
/// Values never span a line break. A literal `,x-word=` inside a value is
/// read as a field boundary. Later duplicate keys overwrite earlier ones.
/// Never fails: input without any field yields an empty map.
///
/// # Examples
///
/// ```
/// use payproglobal_rs::webhook::parse_custom_fields;
///
/// let fields = parse_custom_fields("x-passthrough={\"id\":1,\"tier\":2},x-source=web");
/// assert_eq!(fields["passthrough"], "{\"id\":1,\"tier\":2}");
/// assert_eq!(fields["source"], "web");
/// assert!(parse_custom_fields("").is_empty());
/// ```
pub fn parse_custom_fields(blob: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let mut pos = 0;

    while pos <= blob.len() {
        let Some(start) = FIELD_START.captures_at(blob, pos) else {
            break;
        };
        let (Some(whole), Some(key)) = (start.get(0), start.get(1)) else {
            break;
        };

        let value_start = whole.end();
        let line_end = blob[value_start..]
            .find(is_line_terminator)
            .map(|i| value_start + i);
        let boundary = FIELD_BOUNDARY
            .find_at(blob, value_start)
            .map(|m| m.start());

        let value_end = match (boundary, line_end) {
            (Some(b), Some(nl)) if b < nl => Some(b),
            (Some(b), None) => Some(b),
            (None, None) => Some(blob.len()),
            // A line break comes first: no match from this start.
            _ => None,
        };

        match value_end {
            Some(end) => {
                fields.insert(key.as_str().to_string(), blob[value_start..end].to_string());
                pos = end;
            }
            None => pos = next_char_boundary(blob, whole.start()),
        }
    }

    fields
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn next_char_boundary(s: &str, index: usize) -> usize {
    s[index..]
        .chars()
        .next()
        .map(|c| index + c.len_utf8())
        .unwrap_or(s.len() + 1)
}

/// Typed view of an authenticated IPN, handed to subscription-update logic.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedNotification {
    /// Event kind
    pub ipn_type: IpnType,
    /// Test order flag
    pub test_mode: bool,
    pub order_id: String,
    pub order_status: String,
    pub order_total: Decimal,
    pub currency: String,
    pub customer_id: String,
    pub customer_email: String,
    pub product_id: String,
    pub order_item_sku: String,
    pub quantity: Option<u32>,
    pub subscription_id: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub renewal_type: Option<RenewalType>,
    /// `ORDER_PLACED_TIME_UTC`, when present
    pub order_placed_at: Option<NaiveDateTime>,
    /// `None` once the subscription has ended
    pub next_charge_at: Option<NaiveDateTime>,
    pub invoice_link: Option<String>,
    /// Decoded `ORDER_CUSTOM_FIELDS`
    pub custom_fields: HashMap<String, String>,
}

impl DecodedNotification {
    /// The `x-passthrough` value round-tripped from the checkout link, if any.
    pub fn passthrough(&self) -> Option<&str> {
        self.custom_fields.get("passthrough").map(String::as_str)
    }
}

impl TryFrom<&WebhookNotification> for DecodedNotification {
    type Error = PayProError;

    fn try_from(n: &WebhookNotification) -> Result<Self> {
        let quantity = match n.product_quantity.trim() {
            "" => None,
            q => Some(q.parse::<u32>().map_err(|e| {
                PayProError::InvalidNotification(format!("PRODUCT_QUANTITY '{}': {}", q, e))
            })?),
        };

        let order_placed_at = if n.order_placed_time_utc.trim().is_empty() {
            None
        } else {
            Some(n.order_placed_time()?)
        };

        let subscription_id = Some(n.subscription_id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Ok(Self {
            ipn_type: n.ipn_type()?,
            test_mode: n.is_test_mode(),
            order_id: n.order_id.clone(),
            order_status: n.order_status.clone(),
            order_total: parse_amount("ORDER_TOTAL_AMOUNT", &n.order_total_amount)?,
            currency: n.order_currency_code.clone(),
            customer_id: n.customer_id.clone(),
            customer_email: n.customer_email.clone(),
            product_id: n.product_id.clone(),
            order_item_sku: n.order_item_sku.clone(),
            quantity,
            subscription_id,
            subscription_status: n.subscription_status()?,
            renewal_type: n.renewal_type()?,
            order_placed_at,
            next_charge_at: n.next_charge_date()?,
            invoice_link: n.invoice_link.clone().filter(|l| !l.is_empty()),
            custom_fields: parse_custom_fields(&n.order_custom_fields),
        })
    }
}
