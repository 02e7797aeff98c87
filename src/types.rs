//! Core type definitions for the PayPro Global integration.
//!
//! This module contains the checkout request model, the raw IPN notification
//! with its typed accessors, and the subscription API wire types.

use crate::errors::{PayProError, Result};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Format of `ORDER_PLACED_TIME_UTC`, e.g. `03/07/2024 14:05:09`.
pub const ORDER_PLACED_TIME_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Format of `SUBSCRIPTION_NEXT_CHARGE_DATE`, e.g. `3/7/2024 2:05 PM`.
pub const NEXT_CHARGE_DATE_FORMAT: &str = "%m/%d/%Y %I:%M %p";

/// Internal product identifiers sold through the provider.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sku {
    /// Entry plan
    Starter,
    /// Professional plan
    Pro,
    /// Business plan
    Business,
    /// Sales-led plan with no self-serve provider product
    Enterprise,
}

impl Sku {
    /// Provider product id for this SKU, or `None` when the SKU cannot be sold
    /// through a checkout link.
    pub fn product_id(self) -> Option<u64> {
        match self {
            Sku::Starter => Some(84011),
            Sku::Pro => Some(84012),
            Sku::Business => Some(84013),
            Sku::Enterprise => None,
        }
    }

    /// Lowercase identifier as used in serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Sku::Starter => "starter",
            Sku::Pro => "pro",
            Sku::Business => "business",
            Sku::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sku {
    type Err = PayProError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "starter" => Ok(Sku::Starter),
            "pro" => Ok(Sku::Pro),
            "business" => Ok(Sku::Business),
            "enterprise" => Ok(Sku::Enterprise),
            other => Err(PayProError::UnsupportedSku(other.to_string())),
        }
    }
}

/// Everything needed to build one checkout link.
///
/// # Examples
///
/// ```
/// use payproglobal_rs::types::{CheckoutRequest, Sku};
/// use rust_decimal::Decimal;
///
/// let request = CheckoutRequest::new(Sku::Pro, "EUR", Decimal::new(1999, 2), "pricing-page")
///     .with_email("jane@example.com")
///     .with_quantity(2);
/// assert_eq!(request.quantity, Some(2));
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CheckoutRequest {
    /// Product being bought
    pub sku: Sku,

    /// Prefilled billing email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Number of units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,

    /// Prefilled billing country (ISO 3166 alpha-2)
    #[serde(rename = "countryCode", skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    /// ISO 4217 currency `price` is denominated in
    pub currency: String,

    /// Unit price in `currency`
    pub price: Decimal,

    /// Where the checkout was started from (sent as `x-source`)
    pub source: String,

    /// Where the provider sends the customer after payment
    #[serde(rename = "returnUrl", skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,

    /// Opaque caller data echoed back in the IPN custom fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passthrough: Option<String>,
}

impl CheckoutRequest {
    /// Creates a request with only the mandatory fields set.
    pub fn new(
        sku: Sku,
        currency: impl Into<String>,
        price: Decimal,
        source: impl Into<String>,
    ) -> Self {
        Self {
            sku,
            email: None,
            quantity: None,
            country_code: None,
            currency: currency.into(),
            price,
            source: source.into(),
            return_url: None,
            passthrough: None,
        }
    }

    /// Sets the billing email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the quantity.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Sets the billing country.
    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        self
    }

    /// Sets the return URL.
    pub fn with_return_url(mut self, return_url: impl Into<String>) -> Self {
        self.return_url = Some(return_url.into());
        self
    }

    /// Sets the passthrough payload.
    pub fn with_passthrough(mut self, passthrough: impl Into<String>) -> Self {
        self.passthrough = Some(passthrough.into());
        self
    }
}

/// Kind of event an IPN describes (`IPN_TYPE_NAME`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpnType {
    /// First successful charge of an order
    OrderCharged,
    /// Order fully refunded
    OrderRefunded,
    /// Payment disputed by the card holder
    OrderChargedBack,
    /// Payment declined
    OrderDeclined,
    /// Recurring charge succeeded
    SubscriptionChargeSucceed,
    /// Recurring charge failed
    SubscriptionChargeFailed,
    /// Subscription suspended
    SubscriptionSuspended,
    /// Subscription renewed
    SubscriptionRenewed,
    /// Subscription terminated
    SubscriptionTerminated,
}

impl FromStr for IpnType {
    type Err = PayProError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OrderCharged" => Ok(IpnType::OrderCharged),
            "OrderRefunded" => Ok(IpnType::OrderRefunded),
            "OrderChargedBack" => Ok(IpnType::OrderChargedBack),
            "OrderDeclined" => Ok(IpnType::OrderDeclined),
            "SubscriptionChargeSucceed" => Ok(IpnType::SubscriptionChargeSucceed),
            "SubscriptionChargeFailed" => Ok(IpnType::SubscriptionChargeFailed),
            "SubscriptionSuspended" => Ok(IpnType::SubscriptionSuspended),
            "SubscriptionRenewed" => Ok(IpnType::SubscriptionRenewed),
            "SubscriptionTerminated" => Ok(IpnType::SubscriptionTerminated),
            other => Err(PayProError::InvalidNotification(format!(
                "unknown IPN_TYPE_NAME '{}'",
                other
            ))),
        }
    }
}

/// Subscription state reported in `SUBSCRIPTION_STATUS_NAME`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// Charging normally
    Active,
    /// Charges paused
    Suspended,
    /// Cancelled before its natural end
    Terminated,
    /// Ran through all billing cycles
    Finished,
}

impl FromStr for SubscriptionStatus {
    type Err = PayProError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Active" => Ok(SubscriptionStatus::Active),
            "Suspended" => Ok(SubscriptionStatus::Suspended),
            "Terminated" => Ok(SubscriptionStatus::Terminated),
            "Finished" => Ok(SubscriptionStatus::Finished),
            other => Err(PayProError::InvalidNotification(format!(
                "unknown SUBSCRIPTION_STATUS_NAME '{}'",
                other
            ))),
        }
    }
}

/// `SUBSCRIPTION_RENEWAL_TYPE`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalType {
    /// Renews automatically
    Auto,
    /// Customer renews by hand
    Manual,
}

impl FromStr for RenewalType {
    type Err = PayProError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Auto" => Ok(RenewalType::Auto),
            "Manual" => Ok(RenewalType::Manual),
            other => Err(PayProError::InvalidNotification(format!(
                "unknown SUBSCRIPTION_RENEWAL_TYPE '{}'",
                other
            ))),
        }
    }
}

/// Raw IPN notification as posted by the provider (form-encoded).
///
/// Every field is kept as the provider sent it; nothing here is trusted until
/// [`WebhookValidator::validate`](crate::webhook::WebhookValidator::validate)
/// has accepted the signature.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WebhookNotification {
    /// Event kind
    #[serde(rename = "IPN_TYPE_NAME")]
    pub ipn_type_name: String,

    /// Provider hash field (not used for validation)
    #[serde(rename = "HASH", default)]
    pub hash: String,

    /// Signature over the protected field subset
    #[serde(rename = "SIGNATURE")]
    pub signature: String,

    /// `1` for test orders, `0` otherwise
    #[serde(rename = "TEST_MODE")]
    pub test_mode: String,

    #[serde(rename = "CUSTOMER_EMAIL")]
    pub customer_email: String,

    #[serde(rename = "PRODUCT_ID", default)]
    pub product_id: String,

    #[serde(rename = "ORDER_ITEM_SKU", default)]
    pub order_item_sku: String,

    #[serde(rename = "PRODUCT_QUANTITY", default)]
    pub product_quantity: String,

    #[serde(rename = "ORDER_ITEM_TOTAL_AMOUNT", default)]
    pub order_item_total_amount: String,

    #[serde(rename = "CUSTOMER_ID", default)]
    pub customer_id: String,

    #[serde(rename = "SUBSCRIPTION_ID", default)]
    pub subscription_id: String,

    /// `MM/DD/YYYY HH:mm:ss`, UTC
    #[serde(rename = "ORDER_PLACED_TIME_UTC", default)]
    pub order_placed_time_utc: String,

    #[serde(rename = "INVOICE_LINK", default, skip_serializing_if = "Option::is_none")]
    pub invoice_link: Option<String>,

    #[serde(rename = "SUBSCRIPTION_STATUS_NAME", default)]
    pub subscription_status_name: String,

    /// `M/D/YYYY h:mm A`; empty once the subscription has ended
    #[serde(rename = "SUBSCRIPTION_NEXT_CHARGE_DATE", default)]
    pub subscription_next_charge_date: String,

    #[serde(rename = "SUBSCRIPTION_RENEWAL_TYPE", default)]
    pub subscription_renewal_type: String,

    #[serde(rename = "ORDER_ID")]
    pub order_id: String,

    #[serde(rename = "ORDER_STATUS")]
    pub order_status: String,

    #[serde(rename = "ORDER_TOTAL_AMOUNT")]
    pub order_total_amount: String,

    #[serde(rename = "ORDER_CURRENCY_CODE", default)]
    pub order_currency_code: String,

    /// Ambiguous `x-key=value,...` blob
    #[serde(rename = "ORDER_CUSTOM_FIELDS", default)]
    pub order_custom_fields: String,
}

impl WebhookNotification {
    /// Parses an `application/x-www-form-urlencoded` IPN body.
    ///
    /// # Examples
    ///
    /// ```
    /// use payproglobal_rs::types::WebhookNotification;
    ///
    /// let body = "IPN_TYPE_NAME=OrderCharged&SIGNATURE=abc&TEST_MODE=1\
    ///             &CUSTOMER_EMAIL=jane%40example.com&ORDER_ID=1&ORDER_STATUS=Processed\
    ///             &ORDER_TOTAL_AMOUNT=19.99";
    /// let notification = WebhookNotification::from_form_body(body).unwrap();
    /// assert_eq!(notification.customer_email, "jane@example.com");
    /// ```
    pub fn from_form_body(body: &str) -> Result<Self> {
        let fields: serde_json::Map<String, serde_json::Value> =
            url::form_urlencoded::parse(body.as_bytes())
                .map(|(k, v)| (k.into_owned(), serde_json::Value::String(v.into_owned())))
                .collect();

        serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|e| PayProError::InvalidNotification(e.to_string()))
    }

    /// Parsed `IPN_TYPE_NAME`.
    pub fn ipn_type(&self) -> Result<IpnType> {
        self.ipn_type_name.parse()
    }

    /// Whether the provider flagged this as a test order.
    pub fn is_test_mode(&self) -> bool {
        self.test_mode == "1"
    }

    /// Parsed `ORDER_TOTAL_AMOUNT`.
    pub fn order_total(&self) -> Result<Decimal> {
        parse_amount("ORDER_TOTAL_AMOUNT", &self.order_total_amount)
    }

    /// Parsed `ORDER_PLACED_TIME_UTC`.
    pub fn order_placed_time(&self) -> Result<NaiveDateTime> {
        parse_date(
            "ORDER_PLACED_TIME_UTC",
            &self.order_placed_time_utc,
            ORDER_PLACED_TIME_FORMAT,
        )
    }

    /// Parsed `SUBSCRIPTION_NEXT_CHARGE_DATE`; `None` once the subscription ended.
    pub fn next_charge_date(&self) -> Result<Option<NaiveDateTime>> {
        if self.subscription_next_charge_date.trim().is_empty() {
            return Ok(None);
        }
        parse_date(
            "SUBSCRIPTION_NEXT_CHARGE_DATE",
            &self.subscription_next_charge_date,
            NEXT_CHARGE_DATE_FORMAT,
        )
        .map(Some)
    }

    /// Parsed `SUBSCRIPTION_STATUS_NAME`, if any.
    pub fn subscription_status(&self) -> Result<Option<SubscriptionStatus>> {
        non_empty(&self.subscription_status_name)
            .map(str::parse)
            .transpose()
    }

    /// Parsed `SUBSCRIPTION_RENEWAL_TYPE`, if any.
    pub fn renewal_type(&self) -> Result<Option<RenewalType>> {
        non_empty(&self.subscription_renewal_type)
            .map(str::parse)
            .transpose()
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

pub(crate) fn parse_amount(field: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|e| PayProError::InvalidNotification(format!("{} '{}': {}", field, value, e)))
}

fn parse_date(field: &str, value: &str, format: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), format)
        .map_err(|e| PayProError::InvalidNotification(format!("{} '{}': {}", field, value, e)))
}

/// Subscription identifier; the provider accepts numeric and string ids.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SubscriptionId {
    /// Numeric id
    Numeric(u64),
    /// Id as text
    Text(String),
}

impl From<u64> for SubscriptionId {
    fn from(id: u64) -> Self {
        SubscriptionId::Numeric(id)
    }
}

impl From<&str> for SubscriptionId {
    fn from(id: &str) -> Self {
        SubscriptionId::Text(id.to_string())
    }
}

impl From<String> for SubscriptionId {
    fn from(id: String) -> Self {
        SubscriptionId::Text(id)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionId::Numeric(id) => write!(f, "{}", id),
            SubscriptionId::Text(id) => f.write_str(id),
        }
    }
}

/// Body of the subscription termination API call.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CancellationRequest {
    #[serde(rename = "vendorAccountId")]
    pub vendor_account_id: String,

    #[serde(rename = "apiSecretKey")]
    pub api_secret_key: String,

    /// Reason shown in the provider's back office
    #[serde(rename = "reasonText")]
    pub reason_text: String,

    /// Ask the provider to email the customer
    #[serde(rename = "sendCustomerNotification")]
    pub send_customer_notification: bool,

    #[serde(rename = "subscriptionId")]
    pub subscription_id: SubscriptionId,
}

/// Response envelope of the provider API.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CancellationResponse {
    /// Whether the provider accepted the request
    #[serde(rename = "isSuccess")]
    pub is_success: bool,

    /// Provider error list, present on failure
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

impl CancellationResponse {
    /// Provider errors rendered as plain strings.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| match e {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Object(map) => map
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| e.to_string()),
                other => other.to_string(),
            })
            .collect()
    }
}
