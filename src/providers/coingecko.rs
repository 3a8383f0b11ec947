//! CoinGecko market data provider implementation

use crate::{
    cache::{cache_key, ResponseCache},
    config::ClientConfig,
    constants::{
        COINGECKO_COIN_ENDPOINT, COINGECKO_GLOBAL_ENDPOINT, COINGECKO_MARKETS_ENDPOINT,
        COINGECKO_TRENDING_ENDPOINT, PRICE_CHANGE_WINDOWS, VS_CURRENCY,
    },
    error::ApiError,
    provider::MarketDataProvider,
    retry::RetryPolicy,
    transport::{HttpTransport, Transport},
    types::{AssetDetail, AssetRecord, GlobalStats, MarketQuery, TrendingItem},
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Shared result of one upstream market request
type MarketFetch = Arc<OnceCell<Result<Vec<AssetRecord>, ApiError>>>;

/// `/search/trending` response
#[derive(Debug, Deserialize)]
struct TrendingResponse {
    #[serde(default)]
    coins: Vec<TrendingEntry>,
}

#[derive(Debug, Deserialize)]
struct TrendingEntry {
    item: TrendingItem,
}

/// `/global` response
#[derive(Debug, Deserialize)]
struct GlobalResponse {
    #[serde(default)]
    data: Option<GlobalStats>,
}

/// CoinGecko market data provider
///
/// Owns its transport, retry policy and market page cache. Construct one per
/// application and share it behind an `Arc`.
///
/// Concurrent market requests with the same parameters share one upstream
/// call.
pub struct CoinGeckoProvider {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    market_cache: ResponseCache<Vec<AssetRecord>>,
    in_flight: Mutex<HashMap<String, MarketFetch>>,
}

impl CoinGeckoProvider {
    /// Creates a provider talking HTTP according to `config`
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(transport, &config))
    }

    /// Creates a provider over a custom transport
    ///
    /// This is primarily for testing with scripted transports.
    pub fn with_transport(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self {
            transport,
            retry: config.retry,
            market_cache: ResponseCache::new(config.cache_ttl),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Cache holding market pages
    pub fn market_cache(&self) -> &ResponseCache<Vec<AssetRecord>> {
        &self.market_cache
    }

    /// Full parameter set of a market request
    fn market_params(query: &MarketQuery) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("vs_currency", VS_CURRENCY.to_string());
        params.insert("order", query.order.as_str().to_string());
        params.insert("per_page", query.per_page.to_string());
        params.insert("page", query.page.to_string());
        params.insert("sparkline", "false".to_string());
        params.insert("price_change_percentage", PRICE_CHANGE_WINDOWS.to_string());
        params
    }

    fn detail_params() -> Vec<(String, String)> {
        [
            ("localization", "false"),
            ("tickers", "false"),
            ("market_data", "true"),
            ("community_data", "false"),
            ("developer_data", "false"),
            ("sparkline", "false"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// One upstream market request; successes land in the cache
    async fn fetch_markets_uncached(
        &self,
        query: &MarketQuery,
        params: &BTreeMap<&'static str, String>,
        key: &str,
    ) -> Result<Vec<AssetRecord>, ApiError> {
        // A request that finished just before this one was registered
        if let Some(cached) = self.market_cache.get(key).await {
            return Ok(cached);
        }

        tracing::debug!(
            page = query.page,
            per_page = query.per_page,
            order = query.order.as_str(),
            "Fetching market data from CoinGecko"
        );
        let pairs: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        let records: Vec<AssetRecord> = self
            .get_json(COINGECKO_MARKETS_ENDPOINT, &pairs)
            .await
            .inspect_err(|e| tracing::warn!(page = query.page, error = %e, "Failed to fetch market data"))?;

        tracing::debug!(count = records.len(), page = query.page, "Successfully fetched market data");
        self.market_cache.put(key, records.clone()).await;
        Ok(records)
    }

    /// GET with retry, then decode the body as `T`
    ///
    /// Malformed bodies are final: they are not retried.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        let body = self
            .retry
            .run(path, || self.transport.get(path, query))
            .await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(path, error = %e, "Failed to parse CoinGecko response");
            ApiError::from(e)
        })
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    async fn fetch_markets(&self, query: &MarketQuery) -> Result<Vec<AssetRecord>, ApiError> {
        let params = Self::market_params(query);
        let key = cache_key("market_data", &params);

        if let Some(cached) = self.market_cache.get(&key).await {
            tracing::debug!(page = query.page, order = query.order.as_str(), "Using cached market data");
            return Ok(cached);
        }

        let fetch = self
            .in_flight
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .clone();

        let result = fetch
            .get_or_init(|| self.fetch_markets_uncached(query, &params, &key))
            .await
            .clone();

        let mut in_flight = self.in_flight.lock().await;
        if in_flight
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, &fetch))
        {
            in_flight.remove(&key);
        }

        result
    }

    async fn fetch_asset_detail(&self, id: &str) -> Result<AssetDetail, ApiError> {
        let path = format!("{}/{}", COINGECKO_COIN_ENDPOINT, id);
        self.get_json(&path, &Self::detail_params())
            .await
            .inspect_err(|e| tracing::warn!(asset = id, error = %e, "Failed to fetch asset detail"))
    }

    async fn fetch_trending(&self) -> Result<Vec<TrendingItem>, ApiError> {
        let response: TrendingResponse = self.get_json(COINGECKO_TRENDING_ENDPOINT, &[]).await?;
        Ok(response.coins.into_iter().map(|c| c.item).collect())
    }

    async fn fetch_global(&self) -> Result<Option<GlobalStats>, ApiError> {
        let response: GlobalResponse = self.get_json(COINGECKO_GLOBAL_ENDPOINT, &[]).await?;
        Ok(response.data)
    }

    fn provider_name(&self) -> &'static str {
        "coingecko"
    }
}
