//! Subscription cancellation against the provider API.
//!
//! Cancellation is fire-and-forget: the provider is the system of record and
//! nothing is persisted locally. No retries happen here; callers own retry
//! policy and timeouts.

use crate::config::PayProConfig;
use crate::errors::{PayProError, Result};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{CancellationRequest, CancellationResponse, SubscriptionId};
use std::sync::Arc;

/// Path of the termination endpoint under the provider base URL.
pub const TERMINATE_PATH: &str = "api/Subscriptions/Terminate";

/// Reason sent to the provider unless overridden.
pub const DEFAULT_CANCELLATION_REASON: &str = "Subscription cancelled by the customer";

/// Issues subscription cancellation requests.
#[derive(Clone)]
pub struct SubscriptionCanceller {
    config: PayProConfig,
    transport: Arc<dyn HttpTransport>,
    reason_text: String,
}

impl SubscriptionCanceller {
    /// Creates a canceller that talks to the provider with `reqwest`.
    pub fn new(config: PayProConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Creates a canceller using a custom transport.
    pub fn with_transport(config: PayProConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config,
            transport,
            reason_text: DEFAULT_CANCELLATION_REASON.to_string(),
        }
    }

    /// Overrides the reason shown in the provider back office.
    pub fn with_reason_text(mut self, reason_text: impl Into<String>) -> Self {
        self.reason_text = reason_text.into();
        self
    }

    /// Terminates the subscription and asks the provider to notify the customer.
    ///
    /// # Errors
    ///
    /// - `TransportError` if the provider answers with a non-2xx status
    /// - `ProviderRejected` if it answers 2xx with `isSuccess: false`
    /// - `HttpError` / `JsonError` if the call or the body cannot be completed
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use payproglobal_rs::config::PayProConfig;
    /// use payproglobal_rs::subscription::SubscriptionCanceller;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = PayProConfig::from_env()?;
    /// let canceller = SubscriptionCanceller::new(config);
    /// canceller.cancel_subscription(123456u64).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn cancel_subscription(
        &self,
        subscription_id: impl Into<SubscriptionId>,
    ) -> Result<()> {
        let subscription_id = subscription_id.into();
        let request = CancellationRequest {
            vendor_account_id: self.config.vendor_account_id.clone(),
            api_secret_key: self.config.api_secret_key.clone(),
            reason_text: self.reason_text.clone(),
            send_customer_notification: true,
            subscription_id: subscription_id.clone(),
        };

        let url = self.config.endpoint(TERMINATE_PATH);
        let body = serde_json::to_value(&request)?;
        let response = self.transport.post_json(&url, &body).await?;

        if !response.is_success() {
            tracing::error!(
                subscription_id = %subscription_id,
                status = response.status.as_u16(),
                headers = ?response.headers,
                body = %response.body,
                "subscription cancellation request failed"
            );
            return Err(PayProError::TransportError {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let envelope: CancellationResponse = serde_json::from_str(&response.body)?;
        if !envelope.is_success {
            let errors = envelope.error_messages();
            tracing::error!(
                subscription_id = %subscription_id,
                errors = ?errors,
                "provider rejected subscription cancellation"
            );
            return Err(PayProError::ProviderRejected { errors });
        }

        tracing::info!(subscription_id = %subscription_id, "subscription cancelled");
        Ok(())
    }
}
