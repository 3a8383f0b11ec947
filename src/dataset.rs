//! Market dataset controller
//!
//! Owns the snapshot, the highlight bundle and the fetch lifecycle. Consumers
//! get immutable views and explicit `Result`s; every mutation goes through
//! this type.

use crate::{
    cache::{cache_key, ResponseCache},
    config::DatasetOptions,
    constants::EVENT_CHANNEL_CAPACITY,
    debounce::Debouncer,
    error::ApiError,
    highlights::fetch_highlights,
    merge::merge_page,
    provider::MarketDataProvider,
    query::{filter, next_sort_config, sort},
    stats::{compute_stats, MarketStats},
    types::{
        AssetDetail, AssetRecord, DatasetEvent, HighlightBundle, LoadingState, MarketQuery,
        SortConfig, SortField,
    },
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Result of a page fetch that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Pages were merged; `page` is the last one applied
    Merged { page: u32, added: usize, total: usize },
    /// The search term changed while the request was in flight
    Discarded { page: u32 },
}

/// Everything a presentation layer needs, read at one instant
#[derive(Debug, Clone)]
pub struct DatasetView {
    /// Full deduplicated snapshot
    pub snapshot: Arc<Vec<AssetRecord>>,
    /// Snapshot filtered by the active search term and sorted
    pub visible: Vec<AssetRecord>,
    pub highlights: Option<Arc<HighlightBundle>>,
    pub loading: LoadingState,
    /// Search term as typed, before debouncing
    pub search_term: String,
    pub sort_config: SortConfig,
    pub page: u32,
}

struct DatasetState {
    snapshot: Arc<Vec<AssetRecord>>,
    highlights: Option<Arc<HighlightBundle>>,
    /// Term as typed
    search_term: String,
    /// Term in effect after the debounce
    active_term: String,
    sort: SortConfig,
    page: u32,
    /// Last page merged into the snapshot; 0 when nothing is loaded
    loaded_page: u32,
    /// Bumped whenever the active term changes
    epoch: u64,
    error: Option<String>,
}

struct Shared {
    provider: Arc<dyn MarketDataProvider>,
    options: DatasetOptions,
    state: RwLock<DatasetState>,
    highlight_cache: ResponseCache<Arc<HighlightBundle>>,
    /// FIFO gate: page results are applied in request order
    merge_gate: Mutex<()>,
    in_flight: AtomicUsize,
    debouncer: Debouncer,
    events: broadcast::Sender<DatasetEvent>,
}

/// Counts a page request as in flight until dropped
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Market dataset
///
/// Cheap to clone; clones share the same dataset.
///
/// # Example
/// ```no_run
/// use coin_market_sdk::{ClientConfig, CoinGeckoProvider, DatasetOptions, MarketDataset};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Arc::new(CoinGeckoProvider::new(ClientConfig::from_env())?);
/// let dataset = MarketDataset::new(provider, DatasetOptions::default());
///
/// dataset.refresh().await?;
/// for asset in dataset.visible().await.iter().take(10) {
///     println!("{}: {:?}", asset.symbol, asset.current_price);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MarketDataset {
    shared: Arc<Shared>,
}

impl MarketDataset {
    /// Creates an empty dataset backed by `provider`
    ///
    /// Nothing is fetched until [`refresh`](Self::refresh) is called or
    /// auto-refresh is started.
    pub fn new(provider: Arc<dyn MarketDataProvider>, options: DatasetOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Shared {
            provider,
            highlight_cache: ResponseCache::new(options.highlight_ttl),
            debouncer: Debouncer::new(options.search_debounce),
            options,
            state: RwLock::new(DatasetState {
                snapshot: Arc::new(Vec::new()),
                highlights: None,
                search_term: String::new(),
                active_term: String::new(),
                sort: SortConfig::default(),
                page: 1,
                loaded_page: 0,
                epoch: 0,
                error: None,
            }),
            merge_gate: Mutex::new(()),
            in_flight: AtomicUsize::new(0),
            events,
        };

        Self {
            shared: Arc::new(shared),
        }
    }

    pub fn options(&self) -> &DatasetOptions {
        &self.shared.options
    }

    /// Returns the name of the underlying provider
    pub fn provider_name(&self) -> &'static str {
        self.shared.provider.provider_name()
    }

    /// Subscribes to dataset events
    pub fn subscribe(&self) -> broadcast::Receiver<DatasetEvent> {
        self.shared.events.subscribe()
    }

    fn emit(&self, event: DatasetEvent) {
        tracing::trace!(event = %event, "Dataset event");
        // No receivers is fine
        let _ = self.shared.events.send(event);
    }

    /// Full snapshot, in merge order
    pub async fn snapshot(&self) -> Arc<Vec<AssetRecord>> {
        self.shared.state.read().await.snapshot.clone()
    }

    /// Last highlight bundle, if one was loaded
    pub async fn highlights(&self) -> Option<Arc<HighlightBundle>> {
        self.shared.state.read().await.highlights.clone()
    }

    pub async fn loading_state(&self) -> LoadingState {
        let state = self.shared.state.read().await;
        self.loading_from(&state)
    }

    fn loading_from(&self, state: &DatasetState) -> LoadingState {
        let is_fetching = self.shared.in_flight.load(Ordering::SeqCst) > 0;
        let is_loading = is_fetching && state.snapshot.is_empty();
        LoadingState {
            is_loading,
            is_fetching,
            error: state.error.clone(),
            is_refreshing: is_fetching && !is_loading,
        }
    }

    /// Current page counter
    pub async fn page(&self) -> u32 {
        self.shared.state.read().await.page
    }

    /// Search term as typed
    pub async fn search_term(&self) -> String {
        self.shared.state.read().await.search_term.clone()
    }

    pub async fn sort_config(&self) -> SortConfig {
        self.shared.state.read().await.sort.clone()
    }

    pub async fn set_sort_config(&self, config: SortConfig) {
        self.shared.state.write().await.sort = config;
    }

    /// Applies a click on `field` and returns the new sort
    pub async fn toggle_sort(&self, field: impl Into<SortField>) -> SortConfig {
        let mut state = self.shared.state.write().await;
        state.sort = next_sort_config(&state.sort, field);
        state.sort.clone()
    }

    /// Snapshot filtered by the active search term and sorted
    pub async fn visible(&self) -> Vec<AssetRecord> {
        let state = self.shared.state.read().await;
        sort(&filter(&state.snapshot, &state.active_term), &state.sort)
    }

    /// Consistent view of the whole dataset
    pub async fn view(&self) -> DatasetView {
        let state = self.shared.state.read().await;
        DatasetView {
            snapshot: state.snapshot.clone(),
            visible: sort(&filter(&state.snapshot, &state.active_term), &state.sort),
            highlights: state.highlights.clone(),
            loading: self.loading_from(&state),
            search_term: state.search_term.clone(),
            sort_config: state.sort.clone(),
            page: state.page,
        }
    }

    /// Derived statistics over the full snapshot
    pub async fn stats(&self) -> MarketStats {
        let state = self.shared.state.read().await;
        compute_stats(&state.snapshot, state.highlights.as_deref())
    }

    /// Fetches one asset's full profile; not cached
    pub async fn asset_detail(&self, id: &str) -> Result<AssetDetail, ApiError> {
        self.shared.provider.fetch_asset_detail(id).await
    }

    /// Records the typed search term
    ///
    /// The term takes effect once no other term was typed for the debounce
    /// period. Taking effect empties the snapshot, resets pagination and
    /// reloads page 1; requests still in flight for the old term are
    /// discarded when they arrive.
    pub async fn set_search_term(&self, term: impl Into<String>) {
        let term = term.into();
        self.shared.state.write().await.search_term = term.clone();

        let weak = Arc::downgrade(&self.shared);
        self.shared.debouncer.call(async move {
            if let Some(shared) = weak.upgrade() {
                MarketDataset { shared }.apply_search_term(term).await;
            }
        });
    }

    async fn apply_search_term(&self, term: String) {
        let epoch = {
            let mut state = self.shared.state.write().await;
            if state.active_term == term {
                return;
            }
            tracing::debug!(term = %term, "Search term changed, reloading from page 1");
            state.active_term = term;
            state.epoch += 1;
            state.page = 1;
            state.loaded_page = 0;
            state.snapshot = Arc::new(Vec::new());
            state.error = None;
            state.epoch
        };

        // Detached so a later keystroke cannot cancel the reload
        let dataset = self.clone();
        tokio::spawn(async move {
            if let Err(e) = dataset.fetch_and_merge(1, 1, epoch).await {
                tracing::warn!(error = %e, "Failed to reload after search change");
            }
        });
    }

    /// Re-fetches every loaded page and the highlight bundle
    ///
    /// Pages 1..=current are fetched in order and swapped in at once, so the
    /// snapshot never shrinks halfway. The highlight bundle is fetched
    /// concurrently and cannot fail the refresh. On failure the previous
    /// snapshot stays in place and the error is recorded in the loading state.
    pub async fn refresh(&self) -> Result<FetchOutcome, ApiError> {
        let (page, epoch) = {
            let state = self.shared.state.read().await;
            (state.page, state.epoch)
        };
        tracing::debug!(pages = page, "Refreshing all data");

        let (primary, _) = tokio::join!(
            self.fetch_and_merge(1, page, epoch),
            self.refresh_highlights()
        );
        primary
    }

    /// Fetches the next page and appends its unseen records
    ///
    /// A failed page is not counted: the page counter goes back to the last
    /// merged page so the next call asks for the missing page again. A call
    /// queued behind a failed one fetches the missing pages along with its
    /// own.
    pub async fn load_more(&self) -> Result<FetchOutcome, ApiError> {
        let (page, epoch) = {
            let mut state = self.shared.state.write().await;
            state.page += 1;
            (state.page, state.epoch)
        };
        tracing::debug!(page, "Loading more assets");

        let result = self.fetch_and_merge(page, page, epoch).await;
        if result.is_err() {
            let mut state = self.shared.state.write().await;
            if state.epoch == epoch {
                state.page = state.page.min(state.loaded_page.max(1));
            }
        }
        result
    }

    /// Highlight bundle, from cache when fresh
    pub async fn refresh_highlights(&self) -> Arc<HighlightBundle> {
        let limit = self.shared.options.highlight_limit;
        let key = cache_key("highlights", &BTreeMap::from([("limit", limit)]));

        let bundle = match self.shared.highlight_cache.get(&key).await {
            Some(bundle) => bundle,
            None => {
                let bundle =
                    Arc::new(fetch_highlights(self.shared.provider.as_ref(), limit).await);
                self.shared.highlight_cache.put(key, bundle.clone()).await;
                self.emit(DatasetEvent::highlights_updated(&bundle));
                bundle
            }
        };

        self.shared.state.write().await.highlights = Some(bundle.clone());
        bundle
    }

    /// Fetches pages `first..=last` and applies them as one update
    ///
    /// `first` is pulled back to the page after the last merged one, so the
    /// snapshot never skips a page.
    async fn fetch_and_merge(
        &self,
        first: u32,
        last: u32,
        epoch: u64,
    ) -> Result<FetchOutcome, ApiError> {
        let _in_flight = InFlight::enter(&self.shared.in_flight);
        let _gate = self.shared.merge_gate.lock().await;

        let (current_epoch, loaded_page) = {
            let state = self.shared.state.read().await;
            (state.epoch, state.loaded_page)
        };
        if current_epoch != epoch {
            return Ok(self.discard(first));
        }
        let first = first.min(loaded_page + 1);

        let mut fetched = Vec::new();
        for page in first..=last {
            match self.fetch_page(page).await {
                Ok(records) => fetched.push((page, records)),
                Err(e) => return self.record_failure(page, epoch, e).await,
            }
        }

        let mut state = self.shared.state.write().await;
        if state.epoch != epoch {
            drop(state);
            return Ok(self.discard(last));
        }

        let before = state.snapshot.len();
        let mut merged: Vec<AssetRecord> = if first <= 1 {
            Vec::new()
        } else {
            state.snapshot.as_ref().clone()
        };
        for (page, records) in fetched {
            merged = merge_page(&merged, records, page);
        }

        let total = merged.len();
        let added = total.saturating_sub(if first <= 1 { 0 } else { before });
        state.snapshot = Arc::new(merged);
        state.loaded_page = last;
        state.page = state.page.max(last);
        state.error = None;
        drop(state);

        tracing::debug!(first, last, added, total, "Merged market pages");
        self.emit(DatasetEvent::page_merged(last, added, total));
        Ok(FetchOutcome::Merged {
            page: last,
            added,
            total,
        })
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<AssetRecord>, ApiError> {
        let query = MarketQuery::page(page, self.shared.options.page_size);
        let label = format!("page {}", page);
        self.shared
            .options
            .query_retry
            .run(&label, || self.shared.provider.fetch_markets(&query))
            .await
    }

    fn discard(&self, page: u32) -> FetchOutcome {
        tracing::debug!(page, "Discarding result for an abandoned search term");
        self.emit(DatasetEvent::stale_discarded(page));
        FetchOutcome::Discarded { page }
    }

    async fn record_failure(
        &self,
        page: u32,
        epoch: u64,
        error: ApiError,
    ) -> Result<FetchOutcome, ApiError> {
        let mut state = self.shared.state.write().await;
        if state.epoch != epoch {
            drop(state);
            return Ok(self.discard(page));
        }

        tracing::warn!(page, error = %error, "Failed to load market page");
        state.error = Some(error.user_message().to_string());
        drop(state);

        self.emit(DatasetEvent::fetch_failed(page, error.user_message()));
        Err(error)
    }

    /// Starts the periodic refresh task when `auto_refresh` is enabled
    ///
    /// The task uses the same cached pipeline as [`refresh`](Self::refresh)
    /// and ends by itself once every handle to the dataset is dropped.
    pub fn start_auto_refresh(&self) -> Option<JoinHandle<()>> {
        if !self.shared.options.auto_refresh {
            return None;
        }

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let interval = self.shared.options.refresh_interval;

        Some(tokio::spawn(async move {
            tracing::info!(
                refresh_interval_secs = interval.as_secs(),
                "Starting market dataset auto-refresh"
            );

            loop {
                sleep(interval).await;

                let Some(shared) = weak.upgrade() else {
                    tracing::debug!("Dataset dropped, stopping auto-refresh");
                    break;
                };
                if let Err(e) = (MarketDataset { shared }).refresh().await {
                    tracing::warn!(error = %e, "Auto-refresh failed");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use crate::retry::BackoffPolicy;
    use crate::types::{GlobalStats, SortDirection};
    use std::time::Duration;

    fn rec(id: &str) -> AssetRecord {
        AssetRecord::new(id, id, id)
    }

    fn ids(records: &[AssetRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    fn options() -> DatasetOptions {
        DatasetOptions {
            query_retry: BackoffPolicy::none(),
            ..DatasetOptions::default()
        }
    }

    fn dataset(provider: &MockProvider) -> MarketDataset {
        MarketDataset::new(Arc::new(provider.clone()), options())
    }

    fn seeded() -> MockProvider {
        let provider = MockProvider::new();
        provider.set_page(1, vec![rec("bitcoin"), rec("ethereum")]);
        provider.set_page(2, vec![rec("ethereum"), rec("solana"), rec("cardano")]);
        provider.set_page(3, vec![rec("dogecoin")]);
        provider.set_volume(Ok(vec![rec("tether")]));
        provider
    }

    #[tokio::test]
    async fn test_refresh_loads_first_page_and_highlights() {
        let provider = seeded();
        let dataset = dataset(&provider);

        let outcome = dataset.refresh().await.unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Merged {
                page: 1,
                added: 2,
                total: 2
            }
        );
        assert_eq!(ids(&dataset.snapshot().await), vec!["bitcoin", "ethereum"]);

        let highlights = dataset.highlights().await.unwrap();
        assert_eq!(ids(&highlights.highest_volume), vec!["tether"]);

        let loading = dataset.loading_state().await;
        assert_eq!(loading, LoadingState::default());
    }

    #[tokio::test]
    async fn test_load_more_appends_without_duplicates() {
        let provider = seeded();
        let dataset = dataset(&provider);

        dataset.refresh().await.unwrap();
        let outcome = dataset.load_more().await.unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Merged {
                page: 2,
                added: 2,
                total: 4
            }
        );
        assert_eq!(dataset.page().await, 2);
        assert_eq!(
            ids(&dataset.snapshot().await),
            vec!["bitcoin", "ethereum", "solana", "cardano"]
        );

        // Refresh re-fetches every loaded page and keeps the same snapshot
        dataset.refresh().await.unwrap();
        assert_eq!(
            ids(&dataset.snapshot().await),
            vec!["bitcoin", "ethereum", "solana", "cardano"]
        );
        assert_eq!(provider.page_calls(2), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_good_snapshot() {
        let provider = seeded();
        let dataset = dataset(&provider);
        dataset.refresh().await.unwrap();

        provider.reset_page(1, Err(ApiError::Server { status: 503 }));
        let mut events = dataset.subscribe();

        let err = dataset.refresh().await.unwrap_err();
        assert_eq!(err, ApiError::Server { status: 503 });
        assert_eq!(ids(&dataset.snapshot().await), vec!["bitcoin", "ethereum"]);
        assert_eq!(
            dataset.loading_state().await.error.as_deref(),
            Some("Server error. Please try again later.")
        );
        let event = events.recv().await.unwrap();
        assert_eq!(event.event_type(), "FETCH_FAILED");

        provider.reset_page(1, Ok(vec![rec("bitcoin")]));
        dataset.refresh().await.unwrap();
        assert_eq!(dataset.loading_state().await.error, None);
        assert_eq!(ids(&dataset.snapshot().await), vec!["bitcoin"]);
    }

    #[tokio::test]
    async fn test_failed_load_more_rolls_back_page() {
        let provider = seeded();
        provider.reset_page(2, Err(ApiError::RateLimited));
        let dataset = dataset(&provider);
        dataset.refresh().await.unwrap();

        assert!(dataset.load_more().await.is_err());
        assert_eq!(dataset.page().await, 1);
        assert_eq!(dataset.snapshot().await.len(), 2);

        provider.reset_page(2, Ok(vec![rec("solana")]));
        dataset.load_more().await.unwrap();
        assert_eq!(dataset.page().await, 2);
        assert_eq!(dataset.snapshot().await.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pages_merge_in_request_order() {
        let provider = seeded();
        provider.set_page_delay(2, Duration::from_secs(2));
        let dataset = dataset(&provider);
        dataset.refresh().await.unwrap();

        let first = tokio::spawn({
            let dataset = dataset.clone();
            async move { dataset.load_more().await }
        });
        sleep(Duration::from_millis(1)).await;
        let second = tokio::spawn({
            let dataset = dataset.clone();
            async move { dataset.load_more().await }
        });

        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
        assert_eq!(
            ids(&dataset.snapshot().await),
            vec!["bitcoin", "ethereum", "solana", "cardano", "dogecoin"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_load_more_fills_gap_after_failure() {
        let provider = seeded();
        provider.reset_page(2, Err(ApiError::Server { status: 502 }));
        provider.push_page(2, Ok(vec![rec("ethereum"), rec("solana"), rec("cardano")]));
        provider.set_page_delay(2, Duration::from_secs(2));
        let dataset = dataset(&provider);
        dataset.refresh().await.unwrap();

        let second = tokio::spawn({
            let dataset = dataset.clone();
            async move { dataset.load_more().await }
        });
        sleep(Duration::from_millis(1)).await;
        let third = tokio::spawn({
            let dataset = dataset.clone();
            async move { dataset.load_more().await }
        });

        assert_eq!(
            second.await.unwrap(),
            Err(ApiError::Server { status: 502 })
        );
        assert_eq!(
            third.await.unwrap(),
            Ok(FetchOutcome::Merged {
                page: 3,
                added: 3,
                total: 5
            })
        );
        assert_eq!(provider.page_calls(2), 2);
        assert_eq!(dataset.page().await, 3);
        assert_eq!(
            ids(&dataset.snapshot().await),
            vec!["bitcoin", "ethereum", "solana", "cardano", "dogecoin"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_change_discards_in_flight_page() {
        let provider = seeded();
        provider.set_page_delay(2, Duration::from_secs(5));
        let dataset = dataset(&provider);
        dataset.refresh().await.unwrap();

        let pending = tokio::spawn({
            let dataset = dataset.clone();
            async move { dataset.load_more().await }
        });
        sleep(Duration::from_millis(10)).await;
        assert!(dataset.loading_state().await.is_refreshing);

        dataset.set_search_term("bit").await;
        sleep(Duration::from_millis(350)).await;
        // Term applied: snapshot emptied, pagination reset
        assert_eq!(dataset.page().await, 1);
        assert!(dataset.snapshot().await.is_empty());
        assert!(dataset.loading_state().await.is_loading);

        assert_eq!(
            pending.await.unwrap(),
            Ok(FetchOutcome::Discarded { page: 2 })
        );
        sleep(Duration::from_millis(10)).await;

        assert_eq!(ids(&dataset.snapshot().await), vec!["bitcoin", "ethereum"]);
        assert_eq!(ids(&dataset.visible().await), vec!["bitcoin"]);
        assert!(!dataset.loading_state().await.is_fetching);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_is_debounced() {
        let provider = seeded();
        let dataset = dataset(&provider);
        dataset.refresh().await.unwrap();
        let before = provider.page_calls(1);

        for term in ["e", "et", "eth"] {
            dataset.set_search_term(term).await;
            sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(dataset.search_term().await, "eth");
        assert_eq!(dataset.visible().await.len(), 2);

        sleep(Duration::from_millis(400)).await;
        assert_eq!(provider.page_calls(1), before + 1);
        assert_eq!(ids(&dataset.visible().await), vec!["ethereum"]);
    }

    #[tokio::test]
    async fn test_sorting_through_dataset() {
        let provider = MockProvider::new();
        provider.set_page(
            1,
            vec![
                rec("a").with_price(5.0).with_rank(2),
                rec("b").with_rank(3),
                rec("c").with_price(10.0).with_rank(1),
            ],
        );
        let dataset = dataset(&provider);
        dataset.refresh().await.unwrap();

        assert_eq!(ids(&dataset.visible().await), vec!["c", "a", "b"]);

        let config = dataset.toggle_sort("current_price").await;
        assert_eq!(config, SortConfig::new("current_price", SortDirection::Desc));
        assert_eq!(ids(&dataset.visible().await), vec!["c", "a", "b"]);

        dataset.toggle_sort("current_price").await;
        assert_eq!(ids(&dataset.visible().await), vec!["a", "c", "b"]);

        dataset
            .set_sort_config(SortConfig::new("market_cap_rank", SortDirection::Desc))
            .await;
        let view = dataset.view().await;
        assert_eq!(ids(&view.visible), vec!["b", "a", "c"]);
        assert_eq!(view.snapshot.len(), 3);
    }

    #[tokio::test]
    async fn test_highlights_cached_and_feed_stats() {
        let provider = seeded();
        provider.set_global(Ok(Some(GlobalStats {
            markets: 777,
            ..GlobalStats::default()
        })));
        let dataset = dataset(&provider);

        dataset.refresh().await.unwrap();
        dataset.refresh().await.unwrap();
        let volume_calls = provider
            .market_calls()
            .iter()
            .filter(|q| q.order == crate::types::MarketOrder::VolumeDesc)
            .count();
        assert_eq!(volume_calls, 1);

        let stats = dataset.stats().await;
        assert_eq!(stats.total_assets, 2);
        assert_eq!(stats.active_markets, 777);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_retry_recovers() {
        let provider = seeded();
        provider.reset_page(2, Err(ApiError::network("reset")));
        provider.push_page(2, Ok(vec![rec("solana")]));
        let options = DatasetOptions {
            query_retry: BackoffPolicy::new(3, Duration::from_secs(1), Duration::from_secs(30)),
            ..DatasetOptions::default()
        };
        let dataset = MarketDataset::new(Arc::new(provider.clone()), options);
        dataset.refresh().await.unwrap();

        let started = tokio::time::Instant::now();
        dataset.load_more().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(1));
        assert_eq!(provider.page_calls(2), 2);
        assert_eq!(
            ids(&dataset.snapshot().await),
            vec!["bitcoin", "ethereum", "solana"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_runs_and_stops() {
        let provider = seeded();
        let options = DatasetOptions {
            auto_refresh: true,
            ..options()
        };
        let dataset = MarketDataset::new(Arc::new(provider.clone()), options);
        let handle = dataset.start_auto_refresh().unwrap();

        sleep(Duration::from_secs(61)).await;
        // Listing page plus the gainers and losers universe
        assert_eq!(provider.page_calls(1), 2);
        assert_eq!(dataset.snapshot().await.len(), 2);

        drop(dataset);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_auto_refresh_disabled() {
        let provider = seeded();
        let dataset = dataset(&provider);
        assert!(dataset.start_auto_refresh().is_none());
    }

    #[tokio::test]
    async fn test_asset_detail_passthrough() {
        let provider = seeded();
        let dataset = dataset(&provider);
        assert_eq!(
            dataset.asset_detail("nope").await.unwrap_err(),
            ApiError::NotFound
        );
    }
}
