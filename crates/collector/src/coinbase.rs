//! Candle client for the Coinbase Exchange REST API.
//!
//! Fetches one UTC day of fixed-granularity candles per request through
//! `GET /products/{coin}/candles`, throttled by a `governor` rate limiter.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use coin_forecast_core::{Candle, ExchangeConfig};
use governor::{Quota, RateLimiter};

use crate::source::CandleSource;

const USER_AGENT: &str = concat!("coin-forecast/", env!("CARGO_PKG_VERSION"));

/// Candle client for one exchange API endpoint.
pub struct CoinbaseClient {
    client: reqwest::Client,
    base_url: String,
    granularity_secs: i64,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl CoinbaseClient {
    /// Creates a client from the exchange configuration.
    ///
    /// # Errors
    /// Returns an error if the rate limit is zero or the HTTP client cannot be built.
    pub fn with_config(config: &ExchangeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        let per_second = NonZeroU32::new(config.requests_per_second)
            .ok_or_else(|| anyhow!("Rate limit must be > 0"))?;
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            granularity_secs: config.granularity_secs,
            rate_limiter,
        })
    }

    /// Fetches the candles of `coin` opening on `day`, oldest first.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body is not a candle array.
    pub async fn fetch_candles(&self, coin: &str, day: NaiveDate) -> Result<Vec<Candle>> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/products/{}/candles", self.base_url, coin);
        let (start, end) = day_bounds(day, self.granularity_secs);
        let granularity = self.granularity_secs.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("granularity", granularity.as_str()),
            ])
            .send()
            .await
            .context("Failed to send request to exchange API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Exchange API error ({}): {}", status, error_text));
        }

        let data: Vec<Vec<serde_json::Value>> = response
            .json()
            .await
            .context("Failed to parse exchange API response")?;

        let mut candles: Vec<Candle> = data
            .iter()
            .filter_map(|row| parse_candle(row, coin))
            .collect();
        candles.sort_by_key(|c| c.time);

        tracing::debug!(coin, %day, candles = candles.len(), "Fetched candles");
        Ok(candles)
    }
}

#[async_trait]
impl CandleSource for CoinbaseClient {
    async fn fetch_day(&self, coin: &str, day: NaiveDate) -> Result<Vec<Candle>> {
        self.fetch_candles(coin, day).await
    }
}

/// First and last candle opening times of a day, e.g. `00:00:00` to `23:55:00`.
fn day_bounds(day: NaiveDate, granularity_secs: i64) -> (String, String) {
    let start = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    let end = start + chrono::Duration::seconds(86_400 - granularity_secs);
    (
        start.format("%Y-%m-%dT%H:%M:%S").to_string(),
        end.format("%Y-%m-%dT%H:%M:%S").to_string(),
    )
}

/// Parses a single candle of the API response.
///
/// Candle format:
/// ```text
/// [
///   1704067200,   // 0: Open time (unix seconds)
///   42100.5,      // 1: Low
///   42350.0,      // 2: High
///   42200.1,      // 3: Open
///   42310.9,      // 4: Close
///   12.4481       // 5: Volume
/// ]
/// ```
fn parse_candle(row: &[serde_json::Value], coin: &str) -> Option<Candle> {
    if row.len() < 6 {
        return None;
    }

    Some(Candle {
        coin: coin.to_string(),
        time: row[0].as_i64()?,
        low: parse_f64(&row[1])?,
        high: parse_f64(&row[2])?,
        open: parse_f64(&row[3])?,
        close: parse_f64(&row[4])?,
        volume: parse_f64(&row[5])?,
    })
}

/// Parses a number that may be sent as a JSON number or a string.
fn parse_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
