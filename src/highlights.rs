//! Highlight bundle assembly
//!
//! The parts of a bundle are fetched concurrently and settle independently:
//! a failed part becomes an empty list (or `None`) and never fails the
//! bundle.

use chrono::Utc;

use crate::{
    constants::HIGHLIGHT_UNIVERSE_SIZE,
    error::ApiError,
    provider::MarketDataProvider,
    stats::{top_movers, MoveDirection},
    types::{AssetRecord, HighlightBundle, MarketOrder, MarketQuery},
};

/// Leading assets by market cap, the universe for gainers and losers
pub async fn leading_assets(provider: &dyn MarketDataProvider) -> Result<Vec<AssetRecord>, ApiError> {
    provider
        .fetch_markets(&MarketQuery::page(1, HIGHLIGHT_UNIVERSE_SIZE))
        .await
}

/// Assets with the highest 24h volume
pub async fn highest_volume(
    provider: &dyn MarketDataProvider,
    limit: usize,
) -> Result<Vec<AssetRecord>, ApiError> {
    let query = MarketQuery {
        page: 1,
        per_page: u32::try_from(limit).unwrap_or(u32::MAX),
        order: MarketOrder::VolumeDesc,
    };
    provider.fetch_markets(&query).await
}

fn settle<T: Default>(part: &str, result: Result<T, ApiError>) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(part, error = %e, "Highlight part failed, using empty value");
        T::default()
    })
}

/// Fetches every highlight part and assembles the bundle
///
/// Gainers and losers are both ranked from one request for the leading
/// assets.
pub async fn fetch_highlights(provider: &dyn MarketDataProvider, limit: usize) -> HighlightBundle {
    tracing::debug!(limit, "Fetching highlights data");

    let (universe, volume, trending, global) = tokio::join!(
        leading_assets(provider),
        highest_volume(provider, limit),
        provider.trending_or_empty(),
        provider.global_or_none(),
    );

    let universe = settle("top_movers", universe);
    let bundle = HighlightBundle {
        top_gainers: top_movers(&universe, MoveDirection::Gainers, limit),
        top_losers: top_movers(&universe, MoveDirection::Losers, limit),
        highest_volume: settle("highest_volume", volume),
        trending: trending.into_iter().take(limit).collect(),
        global,
        fetched_at: Utc::now(),
    };

    tracing::debug!(
        gainers = bundle.top_gainers.len(),
        losers = bundle.top_losers.len(),
        volume = bundle.highest_volume.len(),
        trending = bundle.trending.len(),
        "Successfully loaded highlights"
    );

    bundle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use crate::types::{GlobalStats, TrendingItem};

    fn universe() -> Vec<AssetRecord> {
        vec![
            AssetRecord::new("a", "a", "A").with_change_24h(5.0),
            AssetRecord::new("b", "b", "B").with_change_24h(-7.0),
            AssetRecord::new("c", "c", "C").with_change_24h(12.0),
            AssetRecord::new("d", "d", "D").with_change_24h(-1.0),
            AssetRecord::new("e", "e", "E"),
        ]
    }

    fn trending_item(id: &str) -> TrendingItem {
        serde_json::from_value(serde_json::json!({"id": id, "name": id, "symbol": id})).unwrap()
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_parts() {
        let provider = MockProvider::new();
        provider.set_page(1, universe());
        provider.set_volume(Err(ApiError::Server { status: 500 }));
        provider.set_trending(Err(ApiError::network("offline")));
        provider.set_global(Err(ApiError::RateLimited));

        let bundle = fetch_highlights(&provider, 15).await;

        let gainers: Vec<&str> = bundle.top_gainers.iter().map(|r| r.id.as_str()).collect();
        let losers: Vec<&str> = bundle.top_losers.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(gainers, vec!["c", "a"]);
        assert_eq!(losers, vec!["b", "d"]);
        assert!(bundle.highest_volume.is_empty());
        assert!(bundle.trending.is_empty());
        assert!(bundle.global.is_none());
    }

    #[tokio::test]
    async fn test_full_bundle() {
        let provider = MockProvider::new();
        provider.set_page(1, universe());
        provider.set_volume(Ok(vec![AssetRecord::new("v", "v", "V").with_volume(1e9)]));
        provider.set_trending(Ok((0..20).map(|i| trending_item(&format!("t{}", i))).collect()));
        provider.set_global(Ok(Some(GlobalStats {
            markets: 10,
            ..GlobalStats::default()
        })));

        let bundle = fetch_highlights(&provider, 15).await;
        assert_eq!(bundle.highest_volume.len(), 1);
        assert_eq!(bundle.trending.len(), 15);
        assert_eq!(bundle.global.map(|g| g.markets), Some(10));

        let volume_query = provider
            .market_calls()
            .into_iter()
            .find(|q| q.order == MarketOrder::VolumeDesc)
            .unwrap();
        assert_eq!(volume_query.per_page, 15);
    }

    #[tokio::test]
    async fn test_movers_share_one_universe_request() {
        let provider = MockProvider::new();
        provider.set_page(1, universe());

        let bundle = fetch_highlights(&provider, 15).await;
        assert_eq!(bundle.top_gainers.len(), 2);
        assert_eq!(bundle.top_losers.len(), 2);
        assert_eq!(provider.page_calls(1), 1);
    }

    #[tokio::test]
    async fn test_oversized_limit_saturates_page_size() {
        let provider = MockProvider::new();
        let _ = highest_volume(&provider, usize::MAX).await;

        let query = provider.market_calls().remove(0);
        assert_eq!(query.per_page, u32::MAX);
    }

    #[tokio::test]
    async fn test_everything_failing_still_yields_bundle() {
        let provider = MockProvider::new();
        provider.push_page(1, Err(ApiError::NotFound));
        provider.set_volume(Err(ApiError::NotFound));
        provider.set_trending(Err(ApiError::NotFound));
        provider.set_global(Err(ApiError::NotFound));

        let bundle = fetch_highlights(&provider, 5).await;
        assert!(bundle.top_gainers.is_empty());
        assert!(bundle.top_losers.is_empty());
        assert!(bundle.highest_volume.is_empty());
    }
}
