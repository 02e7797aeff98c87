//! Example checkout link generator.
//!
//! Builds a checkout URL for a SKU, price and currency given on the command
//! line and prints it along with the decrypted price blob.
//!
//! Run with:
//! ```bash
//! cargo run --example checkout_link -- pro 19.99 EUR
//! ```
//!
//! Environment variables (a `.env` file is honoured):
//! - PAYPRO_* as for the webhook server
//! - RATES_URL: rates API used for unsupported currencies

use anyhow::Context;
use payproglobal_rs::{
    crypto::decrypt_product_params, currency::HttpRateSource, CheckoutLinkBuilder,
    CheckoutRequest, PayProConfig, Sku,
};
use rust_decimal::Decimal;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let sku: Sku = args.next().unwrap_or_else(|| "pro".to_string()).parse()?;
    let price: Decimal = args
        .next()
        .unwrap_or_else(|| "19.99".to_string())
        .parse()
        .context("price must be a decimal number")?;
    let currency = args.next().unwrap_or_else(|| "USD".to_string());

    let config = PayProConfig::from_env()?;
    let rates_url =
        std::env::var("RATES_URL").unwrap_or_else(|_| "https://api.exchangerate.host".to_string());

    let builder = CheckoutLinkBuilder::new(config.clone(), Arc::new(HttpRateSource::new(rates_url)));
    let request = CheckoutRequest::new(sku, currency, price, "cli")
        .with_return_url("https://example.com/thanks");

    let url = builder.build_checkout_url(&request).await?;
    println!("{}", url);

    let data = url
        .query_pairs()
        .find(|(k, _)| k == "products[1][data]")
        .map(|(_, v)| v.into_owned())
        .context("checkout url has no product data")?;
    let plaintext = decrypt_product_params(
        &data,
        &config.product_params_key,
        &config.product_params_iv,
    )?;
    println!("encrypted price: {}", plaintext);

    Ok(())
}
