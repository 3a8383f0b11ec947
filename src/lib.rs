//! # Coin Market SDK
//!
//! Client-side data layer for a cryptocurrency market dashboard, backed by
//! the public CoinGecko API.
//!
//! ## What it does
//!
//! - Fetches paginated market listings with a request timeout, retry with
//!   backoff and a short-lived response cache
//! - Merges pages into one deduplicated snapshot
//! - Derives aggregate statistics (market cap, sentiment, dominance)
//! - Filters and sorts the snapshot for display
//! - Loads a highlight bundle (gainers, losers, volume, trending, global)
//!   where every part may fail on its own
//!
//! ## Usage
//!
//! ```no_run
//! use coin_market_sdk::{ClientConfig, CoinGeckoProvider, DatasetOptions, MarketDataset};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(CoinGeckoProvider::new(ClientConfig::from_env())?);
//! let dataset = MarketDataset::new(provider, DatasetOptions::default());
//!
//! // Load page 1 and the highlight bundle
//! dataset.refresh().await?;
//!
//! let stats = dataset.stats().await;
//! println!("Total market cap: ${:.0}", stats.total_market_cap);
//! println!("Gainers: {} / Losers: {}", stats.gainers, stats.losers);
//!
//! // Narrow the listing; takes effect after the debounce period
//! dataset.set_search_term("sol").await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod debounce;
pub mod error;
pub mod highlights;
pub mod merge;
pub mod provider;
pub mod providers;
pub mod query;
pub mod retry;
pub mod stats;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use cache::ResponseCache;
pub use config::{ClientConfig, DatasetOptions};
pub use dataset::{DatasetView, FetchOutcome, MarketDataset};
pub use error::ApiError;
pub use provider::MarketDataProvider;
pub use providers::CoinGeckoProvider;
pub use retry::{BackoffPolicy, RetryPolicy};
pub use stats::{compute_stats, MarketStats};
pub use types::{
    AssetDetail, AssetRecord, DatasetEvent, GlobalStats, HighlightBundle, LoadingState,
    SortConfig, SortDirection, SortField, TrendingItem,
};
