//! Day-bucketed candle ingestion.
//!
//! Walks every UTC day from the configured start date to today, skipping
//! stored days whose candle count is plausible and replacing the others with
//! a fresh fetch. Each day commits on its own, so an interrupted or failed
//! run keeps everything committed before it.

use anyhow::Result;
use chrono::NaiveDate;
use coin_forecast_core::{Candle, ExchangeConfig, PipelineError};
use coin_forecast_data::CandleRepository;
use tokio::sync::watch;

use crate::source::CandleSource;

const PROGRESS_EVERY_DAYS: usize = 10;

/// Statistics for an ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    /// Days between start date and today, inclusive
    pub days_total: u64,
    /// Stored days accepted without refetching
    pub days_skipped: u64,
    /// Days replaced with fetched candles
    pub days_fetched: u64,
    /// Fetches that returned no candles of the requested day
    pub days_empty: u64,
    pub candles_inserted: u64,
    pub requests: u64,
}

impl IngestStats {
    /// Formats a summary report.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Days: {} ({} skipped, {} fetched, {} empty), Candles inserted: {}, Requests: {}",
            self.days_total,
            self.days_skipped,
            self.days_fetched,
            self.days_empty,
            self.candles_inserted,
            self.requests
        )
    }
}

/// How an ingestion run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Completed(IngestStats),
    /// Stopped by the operator; the in-flight day was not written.
    Interrupted(IngestStats),
}

impl IngestOutcome {
    #[must_use]
    pub fn stats(&self) -> &IngestStats {
        match self {
            IngestOutcome::Completed(stats) | IngestOutcome::Interrupted(stats) => stats,
        }
    }

    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, IngestOutcome::Interrupted(_))
    }
}

pub struct Ingestor<S> {
    source: S,
    candles: CandleRepository,
    config: ExchangeConfig,
}

impl<S: CandleSource> Ingestor<S> {
    #[must_use]
    pub fn new(source: S, candles: CandleRepository, config: ExchangeConfig) -> Self {
        Self {
            source,
            candles,
            config,
        }
    }

    /// Ingests every day from the configured start date through `today`.
    ///
    /// `today` is always refetched. Setting `shutdown` to `true` stops the
    /// run between days or abandons the day being fetched.
    ///
    /// # Errors
    /// Returns `PipelineError::UpstreamOutage` after `max_consecutive_empty`
    /// empty responses in a row, or any fetch or database error.
    pub async fn run(
        &self,
        coin: &str,
        today: NaiveDate,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<IngestOutcome> {
        let report = self.candles.day_report(coin).await?;
        let days = days_inclusive(self.config.start_date, today);

        let mut stats = IngestStats {
            days_total: days.len() as u64,
            ..IngestStats::default()
        };
        let mut consecutive_empty = 0u32;

        tracing::info!(
            coin,
            from = %self.config.start_date,
            to = %today,
            stored_days = report.len(),
            "Starting ingestion"
        );

        for (index, day) in days.into_iter().enumerate() {
            if *shutdown.borrow() {
                tracing::warn!(coin, %day, "Ingestion interrupted");
                return Ok(IngestOutcome::Interrupted(stats));
            }

            let acceptable = report.is_acceptable(
                day,
                self.config.min_day_candles,
                self.config.max_day_candles,
            );

            if day < today && acceptable {
                stats.days_skipped += 1;
            } else {
                let fetched = tokio::select! {
                    biased;
                    () = shutdown_requested(&mut shutdown) => {
                        tracing::warn!(coin, %day, "Ingestion interrupted, abandoning day");
                        return Ok(IngestOutcome::Interrupted(stats));
                    }
                    result = self.source.fetch_day(coin, day) => result?,
                };
                stats.requests += 1;

                // candles stamped outside the day count as no answer
                let fetched: Vec<Candle> =
                    fetched.into_iter().filter(|c| c.day() == day).collect();

                if fetched.is_empty() {
                    stats.days_empty += 1;
                    consecutive_empty += 1;
                    tracing::warn!(coin, %day, consecutive_empty, "Exchange returned no candles");

                    if consecutive_empty >= self.config.max_consecutive_empty {
                        return Err(PipelineError::UpstreamOutage {
                            coin: coin.to_string(),
                            consecutive: consecutive_empty,
                        }
                        .into());
                    }
                } else {
                    consecutive_empty = 0;
                    let inserted = self.candles.replace_day(coin, day, &fetched).await?;
                    stats.days_fetched += 1;
                    stats.candles_inserted += inserted;
                    tracing::debug!(coin, %day, inserted, "Replaced day");
                }
            }

            if (index + 1) % PROGRESS_EVERY_DAYS == 0 {
                tracing::info!(coin, %day, "Progress: {}", stats.summary());
            }
        }

        tracing::info!(coin, "Ingestion complete: {}", stats.summary());
        Ok(IngestOutcome::Completed(stats))
    }
}

/// Resolves once the shutdown flag is `true`. Never resolves if the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn days_inclusive(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|day| *day <= end).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coin_forecast_core::day_start;
    use coin_forecast_data::Store;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory source: days not in `candles` come back empty, days in
    /// `hang` never resolve.
    #[derive(Default, Clone)]
    struct FakeSource {
        candles: HashMap<NaiveDate, Vec<Candle>>,
        hang: HashSet<NaiveDate>,
        calls: Arc<Mutex<Vec<NaiveDate>>>,
    }

    impl FakeSource {
        fn with_full_days(days: &[NaiveDate]) -> Self {
            let mut source = Self::default();
            for day in days {
                source.candles.insert(*day, full_day(*day));
            }
            source
        }

        fn calls(&self) -> Vec<NaiveDate> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CandleSource for FakeSource {
        async fn fetch_day(&self, _coin: &str, day: NaiveDate) -> Result<Vec<Candle>> {
            self.calls.lock().unwrap().push(day);
            if self.hang.contains(&day) {
                std::future::pending::<()>().await;
            }
            Ok(self.candles.get(&day).cloned().unwrap_or_default())
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn full_day(day: NaiveDate) -> Vec<Candle> {
        (0..288)
            .map(|i| Candle {
                coin: "BTC-USD".to_string(),
                time: day_start(day) + i * 300,
                low: 99.0,
                high: 101.0,
                open: 100.0,
                close: 100.0,
                volume: 1.0,
            })
            .collect()
    }

    fn config(start: NaiveDate) -> ExchangeConfig {
        ExchangeConfig {
            start_date: start,
            ..ExchangeConfig::default()
        }
    }

    fn no_shutdown() -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        // a dropped sender must not read as a shutdown request
        drop(tx);
        rx
    }

    #[test]
    fn test_days_inclusive() {
        assert_eq!(days_inclusive(day(1), day(3)), vec![day(1), day(2), day(3)]);
        assert_eq!(days_inclusive(day(3), day(3)), vec![day(3)]);
        assert!(days_inclusive(day(4), day(3)).is_empty());
    }

    #[tokio::test]
    async fn test_fetches_missing_days() {
        let store = Store::new_in_memory().await.unwrap();
        let source = FakeSource::with_full_days(&[day(1), day(2), day(3)]);
        let ingestor = Ingestor::new(source.clone(), store.repositories().candles, config(day(1)));

        let outcome = ingestor.run("BTC-USD", day(3), no_shutdown()).await.unwrap();

        let stats = outcome.stats();
        assert!(!outcome.is_interrupted());
        assert_eq!(stats.days_total, 3);
        assert_eq!(stats.days_fetched, 3);
        assert_eq!(stats.candles_inserted, 864);
        assert_eq!(store.repositories().candles.count("BTC-USD").await.unwrap(), 864);
    }

    #[tokio::test]
    async fn test_complete_days_skipped_but_today_refetched() {
        let store = Store::new_in_memory().await.unwrap();
        let repo = store.repositories().candles;
        for d in [day(1), day(2), day(3)] {
            repo.replace_day("BTC-USD", d, &full_day(d)).await.unwrap();
        }

        let source = FakeSource::with_full_days(&[day(1), day(2), day(3)]);
        let ingestor = Ingestor::new(source.clone(), repo.clone(), config(day(1)));
        let outcome = ingestor.run("BTC-USD", day(3), no_shutdown()).await.unwrap();

        assert_eq!(source.calls(), vec![day(3)]);
        assert_eq!(outcome.stats().days_skipped, 2);
        assert_eq!(repo.count("BTC-USD").await.unwrap(), 864);

        // a second run changes nothing
        ingestor.run("BTC-USD", day(3), no_shutdown()).await.unwrap();
        assert_eq!(repo.count("BTC-USD").await.unwrap(), 864);
    }

    #[tokio::test]
    async fn test_incomplete_day_is_replaced() {
        let store = Store::new_in_memory().await.unwrap();
        let repo = store.repositories().candles;
        repo.replace_day("BTC-USD", day(1), &full_day(day(1))[..150])
            .await
            .unwrap();

        let source = FakeSource::with_full_days(&[day(1), day(2)]);
        let ingestor = Ingestor::new(source.clone(), repo.clone(), config(day(1)));
        ingestor.run("BTC-USD", day(2), no_shutdown()).await.unwrap();

        assert_eq!(source.calls(), vec![day(1), day(2)]);
        let report = repo.day_report("BTC-USD").await.unwrap();
        assert_eq!(report.get(day(1)).unwrap().candles, 288);
    }

    #[tokio::test]
    async fn test_empty_day_left_untouched() {
        let store = Store::new_in_memory().await.unwrap();
        let repo = store.repositories().candles;
        repo.replace_day("BTC-USD", day(1), &full_day(day(1))[..100])
            .await
            .unwrap();

        // day 1 comes back empty, day 2 resets the counter
        let source = FakeSource::with_full_days(&[day(2)]);
        let ingestor = Ingestor::new(source, repo.clone(), config(day(1)));
        let outcome = ingestor.run("BTC-USD", day(2), no_shutdown()).await.unwrap();

        assert_eq!(outcome.stats().days_empty, 1);
        assert_eq!(repo.day_report("BTC-USD").await.unwrap().get(day(1)).unwrap().candles, 100);
    }

    #[tokio::test]
    async fn test_out_of_day_candles_count_as_empty() {
        let store = Store::new_in_memory().await.unwrap();
        let repo = store.repositories().candles;
        repo.replace_day("BTC-USD", day(1), &full_day(day(1))[..100])
            .await
            .unwrap();

        // day 1 answers with day 2's candles
        let mut source = FakeSource::default();
        source.candles.insert(day(1), full_day(day(2)));
        let ingestor = Ingestor::new(source, repo.clone(), config(day(1)));
        let outcome = ingestor.run("BTC-USD", day(1), no_shutdown()).await.unwrap();

        assert_eq!(outcome.stats().days_empty, 1);
        assert_eq!(outcome.stats().days_fetched, 0);
        let report = repo.day_report("BTC-USD").await.unwrap();
        assert_eq!(report.get(day(1)).unwrap().candles, 100);
        assert!(report.get(day(2)).is_none());
    }

    #[tokio::test]
    async fn test_out_of_day_candles_feed_outage_streak() {
        let store = Store::new_in_memory().await.unwrap();
        let mut source = FakeSource::default();
        for d in 1..=5 {
            source.candles.insert(day(d), full_day(day(d + 10)));
        }
        let ingestor = Ingestor::new(source, store.repositories().candles, config(day(1)));

        let err = ingestor.run("BTC-USD", day(6), no_shutdown()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UpstreamOutage { consecutive: 5, .. })
        ));
    }

    #[tokio::test]
    async fn test_five_consecutive_empty_days_is_outage() {
        let store = Store::new_in_memory().await.unwrap();
        let repo = store.repositories().candles;
        let source = FakeSource::with_full_days(&[day(1), day(2)]);
        let ingestor = Ingestor::new(source.clone(), repo.clone(), config(day(1)));

        let err = ingestor.run("BTC-USD", day(20), no_shutdown()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UpstreamOutage { consecutive: 5, .. })
        ));
        // stopped on the fifth empty day (day 7)
        assert_eq!(source.calls().last().copied(), Some(day(7)));
        assert_eq!(repo.count("BTC-USD").await.unwrap(), 576);
    }

    #[tokio::test]
    async fn test_shutdown_before_start() {
        let store = Store::new_in_memory().await.unwrap();
        let source = FakeSource::with_full_days(&[day(1)]);
        let ingestor = Ingestor::new(source.clone(), store.repositories().candles, config(day(1)));
        let (_tx, rx) = watch::channel(true);

        let outcome = ingestor.run("BTC-USD", day(1), rx).await.unwrap();

        assert!(outcome.is_interrupted());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_abandons_in_flight_day() {
        let store = Store::new_in_memory().await.unwrap();
        let repo = store.repositories().candles;
        let mut source = FakeSource::with_full_days(&[day(1), day(2)]);
        source.hang.insert(day(2));
        let ingestor = Ingestor::new(source, repo.clone(), config(day(1)));
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = tx.send(true);
        });

        let outcome = ingestor.run("BTC-USD", day(3), rx).await.unwrap();

        assert!(outcome.is_interrupted());
        assert_eq!(outcome.stats().days_fetched, 1);
        let report = repo.day_report("BTC-USD").await.unwrap();
        assert_eq!(report.get(day(1)).unwrap().candles, 288);
        assert!(report.get(day(2)).is_none());
    }
}
