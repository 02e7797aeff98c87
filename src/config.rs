//! Process-wide configuration for the PayPro Global integration.
//!
//! Values are loaded once at startup and never change afterwards. The product
//! parameter key and IV are static secrets shared with the provider, not
//! per-call nonces.

use crate::errors::{PayProError, Result};
use std::fmt;

/// Default provider base URL.
pub const DEFAULT_BASE_URL: &str = "https://store.payproglobal.com";

/// Required length of the AES-256 product parameter key, in bytes.
pub const PRODUCT_PARAMS_KEY_LEN: usize = 32;

/// Required length of the AES-CBC initialization vector, in bytes.
pub const PRODUCT_PARAMS_IV_LEN: usize = 16;

/// Configuration shared by all provider components.
#[derive(Clone)]
pub struct PayProConfig {
    /// Provider base URL (checkout and API live under it)
    pub base_url: String,

    /// Vendor account id used to authenticate API calls
    pub vendor_account_id: String,

    /// API secret key used to authenticate API calls
    pub api_secret_key: String,

    /// AES key for the encrypted `products[1][data]` parameter
    pub product_params_key: String,

    /// AES IV for the encrypted `products[1][data]` parameter
    pub product_params_iv: String,

    /// Secret mixed into IPN signatures
    pub validation_key: String,
}

impl PayProConfig {
    /// Creates a new configuration pointing at the default provider URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use payproglobal_rs::config::PayProConfig;
    ///
    /// let config = PayProConfig::new(
    ///     "12345",
    ///     "api-secret",
    ///     "0123456789abcdef0123456789abcdef",
    ///     "abcdef9876543210",
    ///     "ipn-validation-key",
    /// );
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(
        vendor_account_id: impl Into<String>,
        api_secret_key: impl Into<String>,
        product_params_key: impl Into<String>,
        product_params_iv: impl Into<String>,
        validation_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            vendor_account_id: vendor_account_id.into(),
            api_secret_key: api_secret_key.into(),
            product_params_key: product_params_key.into(),
            product_params_iv: product_params_iv.into(),
            validation_key: validation_key.into(),
        }
    }

    /// Overrides the provider base URL (e.g. for a sandbox or a local mock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Loads the configuration from `PAYPRO_*` environment variables.
    ///
    /// `PAYPRO_BASE_URL` is optional; every other variable is required.
    pub fn from_env() -> Result<Self> {
        let config = Self::new(
            required_env("PAYPRO_VENDOR_ACCOUNT_ID")?,
            required_env("PAYPRO_API_SECRET_KEY")?,
            required_env("PAYPRO_PRODUCT_PARAMS_KEY")?,
            required_env("PAYPRO_PRODUCT_PARAMS_IV")?,
            required_env("PAYPRO_VALIDATION_KEY")?,
        );

        let config = match std::env::var("PAYPRO_BASE_URL") {
            Ok(url) if !url.is_empty() => config.with_base_url(url),
            _ => config,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("base_url", &self.base_url),
            ("vendor_account_id", &self.vendor_account_id),
            ("api_secret_key", &self.api_secret_key),
            ("product_params_key", &self.product_params_key),
            ("product_params_iv", &self.product_params_iv),
            ("validation_key", &self.validation_key),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(PayProError::ConfigError(format!("{} must not be empty", name)));
            }
        }

        if self.product_params_key.len() != PRODUCT_PARAMS_KEY_LEN {
            return Err(PayProError::ConfigError(format!(
                "product_params_key must be {} bytes, got {}",
                PRODUCT_PARAMS_KEY_LEN,
                self.product_params_key.len()
            )));
        }
        if self.product_params_iv.len() != PRODUCT_PARAMS_IV_LEN {
            return Err(PayProError::ConfigError(format!(
                "product_params_iv must be {} bytes, got {}",
                PRODUCT_PARAMS_IV_LEN,
                self.product_params_iv.len()
            )));
        }

        url::Url::parse(&self.base_url)?;
        Ok(())
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl fmt::Debug for PayProConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayProConfig")
            .field("base_url", &self.base_url)
            .field("vendor_account_id", &self.vendor_account_id)
            .field("api_secret_key", &"[REDACTED]")
            .field("product_params_key", &"[REDACTED]")
            .field("product_params_iv", &"[REDACTED]")
            .field("validation_key", &"[REDACTED]")
            .finish()
    }
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(PayProError::MissingField(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PayProConfig {
        PayProConfig::new(
            "12345",
            "secret",
            "0123456789abcdef0123456789abcdef",
            "abcdef9876543210",
            "validation",
        )
    }

    #[test]
    fn test_config_creation() {
        let config = test_config();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.vendor_account_id, "12345");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let config = test_config().with_base_url("http://127.0.0.1:8080/");
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(
            config.endpoint("/api/Subscriptions/Terminate"),
            "http://127.0.0.1:8080/api/Subscriptions/Terminate"
        );
    }

    #[test]
    fn test_validation_rejects_wrong_key_length() {
        let mut config = test_config();
        config.product_params_key = "short".to_string();
        assert!(matches!(config.validate(), Err(PayProError::ConfigError(_))));
    }

    #[test]
    fn test_validation_rejects_wrong_iv_length() {
        let mut config = test_config();
        config.product_params_iv = "0123456789abcdef0".to_string();
        assert!(matches!(config.validate(), Err(PayProError::ConfigError(_))));
    }

    #[test]
    fn test_validation_rejects_empty_secret() {
        let mut config = test_config();
        config.validation_key = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let output = format!("{:?}", test_config());
        assert!(output.contains("12345"));
        assert!(!output.contains("0123456789abcdef0123456789abcdef"));
        assert!(!output.contains("validation\""));
    }
}
