//! Candle collection for the coin price forecaster.
//!
//! - `CoinbaseClient`: rate-limited exchange client
//! - `CandleSource`: seam between the ingestion loop and the exchange
//! - `Ingestor`: day-by-day validation, fetch and replace

pub mod coinbase;
pub mod ingest;
pub mod source;

pub use coinbase::CoinbaseClient;
pub use ingest::{IngestOutcome, IngestStats, Ingestor};
pub use source::CandleSource;
