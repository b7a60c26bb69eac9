use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use coin_forecast_core::Candle;

/// Supplier of one UTC day of candles for a coin.
///
/// An empty vector means the upstream had nothing for that day.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_day(&self, coin: &str, day: NaiveDate) -> Result<Vec<Candle>>;
}
