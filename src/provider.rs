//! Provider abstraction for fetching market data from external APIs

use crate::{
    error::ApiError,
    types::{AssetDetail, AssetRecord, GlobalStats, MarketQuery, TrendingItem},
};
use async_trait::async_trait;

/// Trait for market data providers
///
/// Implementations are expected to retry transient failures themselves and to
/// return only normalized [`ApiError`]s.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches one page of the market listing
    ///
    /// # Arguments
    /// * `query` - Page number, page size and ordering
    async fn fetch_markets(&self, query: &MarketQuery) -> Result<Vec<AssetRecord>, ApiError>;

    /// Fetches the full profile of a single asset
    async fn fetch_asset_detail(&self, id: &str) -> Result<AssetDetail, ApiError>;

    /// Fetches currently trending assets
    async fn fetch_trending(&self) -> Result<Vec<TrendingItem>, ApiError>;

    /// Fetches global market figures
    ///
    /// `Ok(None)` means the upstream answered without a data block.
    async fn fetch_global(&self) -> Result<Option<GlobalStats>, ApiError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;

    /// Trending assets, or an empty list on any failure
    async fn trending_or_empty(&self) -> Vec<TrendingItem> {
        match self.fetch_trending().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(provider = self.provider_name(), error = %e, "Failed to fetch trending assets");
                Vec::new()
            }
        }
    }

    /// Global figures, or `None` on any failure
    async fn global_or_none(&self) -> Option<GlobalStats> {
        match self.fetch_global().await {
            Ok(global) => global,
            Err(e) => {
                tracing::warn!(provider = self.provider_name(), error = %e, "Failed to fetch global data");
                None
            }
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Scripted<T> = Arc<Mutex<VecDeque<Result<T, ApiError>>>>;

    /// Mock provider for testing
    ///
    /// Market responses are scripted per page number; the last scripted
    /// response for a page is repeated. An optional per-page delay lets tests
    /// make responses arrive out of order.
    #[derive(Clone, Default)]
    pub struct MockProvider {
        pages: Arc<Mutex<HashMap<u32, VecDeque<Result<Vec<AssetRecord>, ApiError>>>>>,
        volume: Scripted<Vec<AssetRecord>>,
        delays: Arc<Mutex<HashMap<u32, Duration>>>,
        details: Arc<Mutex<HashMap<String, AssetDetail>>>,
        trending: Scripted<Vec<TrendingItem>>,
        global: Scripted<Option<GlobalStats>>,
        market_calls: Arc<Mutex<Vec<MarketQuery>>>,
    }

    fn next<T: Clone>(queue: &mut VecDeque<Result<T, ApiError>>, fallback: ApiError) -> Result<T, ApiError> {
        if queue.len() > 1 {
            queue.pop_front().unwrap_or(Err(fallback))
        } else {
            queue.front().cloned().unwrap_or(Err(fallback))
        }
    }

    impl MockProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_page(&self, page: u32, records: Vec<AssetRecord>) {
            self.push_page(page, Ok(records));
        }

        pub fn push_page(&self, page: u32, response: Result<Vec<AssetRecord>, ApiError>) {
            self.pages
                .lock()
                .unwrap()
                .entry(page)
                .or_default()
                .push_back(response);
        }

        /// Replaces every scripted response for `page`
        pub fn reset_page(&self, page: u32, response: Result<Vec<AssetRecord>, ApiError>) {
            let mut pages = self.pages.lock().unwrap();
            let queue = pages.entry(page).or_default();
            queue.clear();
            queue.push_back(response);
        }

        pub fn set_page_delay(&self, page: u32, delay: Duration) {
            self.delays.lock().unwrap().insert(page, delay);
        }

        pub fn set_volume(&self, response: Result<Vec<AssetRecord>, ApiError>) {
            self.volume.lock().unwrap().push_back(response);
        }

        pub fn set_detail(&self, detail: AssetDetail) {
            self.details.lock().unwrap().insert(detail.id.clone(), detail);
        }

        pub fn set_trending(&self, response: Result<Vec<TrendingItem>, ApiError>) {
            self.trending.lock().unwrap().push_back(response);
        }

        pub fn set_global(&self, response: Result<Option<GlobalStats>, ApiError>) {
            self.global.lock().unwrap().push_back(response);
        }

        pub fn market_calls(&self) -> Vec<MarketQuery> {
            self.market_calls.lock().unwrap().clone()
        }

        pub fn page_calls(&self, page: u32) -> usize {
            self.market_calls
                .lock()
                .unwrap()
                .iter()
                .filter(|q| q.page == page && q.order == crate::types::MarketOrder::MarketCapDesc)
                .count()
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        async fn fetch_markets(&self, query: &MarketQuery) -> Result<Vec<AssetRecord>, ApiError> {
            self.market_calls.lock().unwrap().push(*query);

            let delay = self.delays.lock().unwrap().get(&query.page).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if query.order == crate::types::MarketOrder::VolumeDesc {
                let mut volume = self.volume.lock().unwrap();
                return next(&mut volume, ApiError::NotFound);
            }

            let mut pages = self.pages.lock().unwrap();
            match pages.get_mut(&query.page) {
                Some(queue) => next(queue, ApiError::NotFound),
                None => Ok(Vec::new()),
            }
        }

        async fn fetch_asset_detail(&self, id: &str) -> Result<AssetDetail, ApiError> {
            self.details
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or(ApiError::NotFound)
        }

        async fn fetch_trending(&self) -> Result<Vec<TrendingItem>, ApiError> {
            let mut trending = self.trending.lock().unwrap();
            if trending.is_empty() {
                return Ok(Vec::new());
            }
            next(&mut trending, ApiError::NotFound)
        }

        async fn fetch_global(&self) -> Result<Option<GlobalStats>, ApiError> {
            let mut global = self.global.lock().unwrap();
            if global.is_empty() {
                return Ok(None);
            }
            next(&mut global, ApiError::NotFound)
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }
}
