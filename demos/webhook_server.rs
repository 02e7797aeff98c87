//! Example IPN receiver using Axum.
//!
//! This example demonstrates how to accept PayPro Global IPN notifications,
//! reject forged ones with 403, and cancel a subscription on request.
//!
//! Run with:
//! ```bash
//! cargo run --example webhook_server
//! ```
//!
//! Environment variables (a `.env` file is honoured):
//! - PAYPRO_VENDOR_ACCOUNT_ID, PAYPRO_API_SECRET_KEY
//! - PAYPRO_PRODUCT_PARAMS_KEY, PAYPRO_PRODUCT_PARAMS_IV
//! - PAYPRO_VALIDATION_KEY
//! - PAYPRO_BASE_URL (optional)
//! - PORT: Server port (default: 3000)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use payproglobal_rs::{
    PayProConfig, PayProError, SubscriptionCanceller, WebhookNotification, WebhookValidator,
};
use serde_json::json;
use std::sync::Arc;

struct AppState {
    validator: WebhookValidator,
    canceller: SubscriptionCanceller,
}

/// Receives IPN notifications (form-encoded body).
async fn ipn_handler(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Response, AppError> {
    let notification = WebhookNotification::from_form_body(&body)?;
    let decoded = state.validator.validate_and_decode(&notification)?;

    tracing::info!(
        ipn_type = ?decoded.ipn_type,
        order_id = %decoded.order_id,
        subscription_id = ?decoded.subscription_id,
        passthrough = ?decoded.passthrough(),
        "accepted IPN"
    );

    // Subscription-update logic would run here.
    Ok((StatusCode::OK, "OK").into_response())
}

/// Cancels a subscription at the provider.
async fn cancel_handler(
    State(state): State<Arc<AppState>>,
    Path(subscription_id): Path<u64>,
) -> Result<Response, AppError> {
    state.canceller.cancel_subscription(subscription_id).await?;
    Ok(Json(json!({ "cancelled": subscription_id })).into_response())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = PayProConfig::from_env()?;
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()?;

    let state = Arc::new(AppState {
        validator: WebhookValidator::new(config.validation_key.clone()),
        canceller: SubscriptionCanceller::new(config),
    });

    let app = Router::new()
        .route("/ipn", post(ipn_handler))
        .route("/subscriptions/:id/cancel", post(cancel_handler))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "IPN receiver listening");

    axum::serve(listener, app).await?;

    Ok(())
}

// Error handling
struct AppError(PayProError);

impl From<PayProError> for AppError {
    fn from(err: PayProError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code().as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        tracing::warn!(error = %self.0, %status, "request failed");

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
