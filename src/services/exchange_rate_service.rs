use chrono::Duration;
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ExchangeConfig;
use crate::services::cache::{Clock, Lookup, TtlCache};

const RATE_CACHE_HOURS: i64 = 12;

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

#[derive(Debug)]
pub enum ExchangeRateError {
    HttpError(reqwest::Error),
    ResponseError(String),
}

impl fmt::Display for ExchangeRateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeRateError::HttpError(err) => write!(f, "HTTP error: {}", err),
            ExchangeRateError::ResponseError(msg) => write!(f, "Response error: {}", msg),
        }
    }
}

impl std::error::Error for ExchangeRateError {}

impl From<reqwest::Error> for ExchangeRateError {
    fn from(err: reqwest::Error) -> Self {
        ExchangeRateError::HttpError(err)
    }
}

/// USD → local currency conversion, refreshed at most every 12 hours.
pub struct ExchangeRateProvider {
    client: Client,
    base_url: String,
    currency: String,
    fallback_rate: f64,
    cache: TtlCache<String, f64>,
}

impl ExchangeRateProvider {
    pub fn new(config: &ExchangeConfig, clock: Arc<dyn Clock>) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.base_url.clone(),
            currency: config.currency.clone(),
            fallback_rate: config.fallback_rate,
            cache: TtlCache::new(Duration::hours(RATE_CACHE_HOURS), clock),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Never fails: a failed refresh yields the last known rate, then the
    /// configured fallback.
    pub async fn get_exchange_rate(&self) -> f64 {
        let lookup = self
            .cache
            .get_or_fetch(&self.currency, || self.fetch_rate())
            .await;

        match lookup {
            Lookup::Cached(rate) => rate,
            Lookup::Fetched(rate) => {
                info!("Fetched USD/{} exchange rate: {}", self.currency, rate);
                rate
            }
            Lookup::Failed { error, stale } => {
                let rate = stale.unwrap_or(self.fallback_rate);
                warn!(
                    "Exchange rate fetch failed ({}), using {} for USD/{}",
                    error, rate, self.currency
                );
                rate
            }
        }
    }

    async fn fetch_rate(&self) -> Result<f64, ExchangeRateError> {
        let url = format!("{}/v6/latest/USD", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeRateError::ResponseError(format!(
                "Rate request failed with status {}",
                status
            )));
        }

        let body: RatesResponse = response.json().await?;
        body.rates
            .get(&self.currency)
            .copied()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .ok_or_else(|| {
                ExchangeRateError::ResponseError(format!("No rate for {} in response", self.currency))
            })
    }
}
