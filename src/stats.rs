//! Derived market statistics
//!
//! Everything here is a pure function of the snapshot (and optionally the
//! highlight bundle). Nothing is cached between calls.

use serde::Serialize;

use crate::constants::PERFORMERS_LIMIT;
use crate::types::{AssetRecord, HighlightBundle};

/// Aggregate figures over the current snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketStats {
    // Core market figures
    pub total_market_cap: f64,
    pub total_volume_24h: f64,
    pub market_cap_change_24h: f64,
    /// Change relative to the reconstructed prior-day total
    pub market_cap_change_percent: f64,
    pub total_assets: usize,

    // Sentiment
    pub gainers: usize,
    pub losers: usize,
    pub neutral: usize,
    pub gainers_percent: f64,
    pub losers_percent: f64,
    pub avg_gain: f64,
    pub avg_loss: f64,
    pub avg_price_change: f64,
    /// NaN when there are neither gainers nor losers; see [`MarketStats::sentiment`]
    pub sentiment_ratio: f64,

    // Dominance over the tracked assets
    pub btc_dominance: f64,
    pub eth_dominance: f64,
    pub others_dominance: f64,

    // Global figures, upstream when available
    pub global_market_cap: f64,
    pub global_volume: f64,
    pub global_btc_dominance: f64,
    pub global_eth_dominance: f64,
    pub active_markets: u64,

    // Averages and extremes
    pub avg_price: f64,
    pub avg_market_cap: f64,
    pub avg_volume: f64,
    pub highest_price: f64,
    pub lowest_price: Option<f64>,

    // Market cap buckets
    pub above_1b: usize,
    pub above_1m: usize,
    pub below_1m: usize,

    // Rankings
    pub top_performers: Vec<AssetRecord>,
    pub worst_performers: Vec<AssetRecord>,
}

impl MarketStats {
    /// Sentiment ratio, or `None` when it is undefined
    pub fn sentiment(&self) -> Option<f64> {
        if self.sentiment_ratio.is_nan() {
            None
        } else {
            Some(self.sentiment_ratio)
        }
    }
}

/// Which end of the 24h performance ranking to take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Positive change, biggest first
    Gainers,
    /// Negative change, biggest drop first
    Losers,
}

/// Best or worst 24h performers, at most `limit`
///
/// Records without a change, or with a change on the wrong side of zero, are
/// left out. Ties keep their snapshot order.
pub fn top_movers(records: &[AssetRecord], direction: MoveDirection, limit: usize) -> Vec<AssetRecord> {
    let mut movers: Vec<(f64, &AssetRecord)> = records
        .iter()
        .filter_map(|r| r.price_change_percentage_24h.map(|c| (c, r)))
        .filter(|(c, _)| match direction {
            MoveDirection::Gainers => *c > 0.0,
            MoveDirection::Losers => *c < 0.0,
        })
        .collect();

    match direction {
        MoveDirection::Gainers => movers.sort_by(|a, b| b.0.total_cmp(&a.0)),
        MoveDirection::Losers => movers.sort_by(|a, b| a.0.total_cmp(&b.0)),
    }

    movers.into_iter().take(limit).map(|(_, r)| r.clone()).collect()
}

/// Share of a symbol's market cap in `total`, in percent
///
/// Uses the first record whose symbol matches case-insensitively.
pub fn dominance(records: &[AssetRecord], symbol: &str, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    records
        .iter()
        .find(|r| r.symbol.eq_ignore_ascii_case(symbol))
        .map(|r| r.market_cap.unwrap_or(0.0) / total * 100.0)
        .unwrap_or(0.0)
}

/// Percentage of records with a defined 24h change strictly below `id`'s
///
/// `None` when `id` is not in the snapshot or has no change.
pub fn percentile_rank(records: &[AssetRecord], id: &str) -> Option<f64> {
    let target = records
        .iter()
        .find(|r| r.id == id)?
        .price_change_percentage_24h?;

    let changes: Vec<f64> = records
        .iter()
        .filter_map(|r| r.price_change_percentage_24h)
        .collect();
    let below = changes.iter().filter(|c| **c < target).count();

    Some(below as f64 / changes.len() as f64 * 100.0)
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Upstream figure unless it is absent or zero
fn prefer(upstream: Option<f64>, local: f64) -> f64 {
    upstream.filter(|v| *v != 0.0).unwrap_or(local)
}

/// Computes every derived statistic of `snapshot`
///
/// `highlights` only contributes its global figures.
pub fn compute_stats(snapshot: &[AssetRecord], highlights: Option<&HighlightBundle>) -> MarketStats {
    let count = snapshot.len();
    let sum = |f: fn(&AssetRecord) -> Option<f64>| snapshot.iter().map(|r| f(r).unwrap_or(0.0)).sum::<f64>();

    let total_market_cap = sum(|r| r.market_cap);
    let total_volume_24h = sum(|r| r.total_volume);
    let market_cap_change_24h = sum(|r| r.market_cap_change_24h);
    let market_cap_change_percent = if total_market_cap > 0.0 {
        market_cap_change_24h / (total_market_cap - market_cap_change_24h) * 100.0
    } else {
        0.0
    };

    let changes: Vec<f64> = snapshot
        .iter()
        .filter_map(|r| r.price_change_percentage_24h)
        .collect();
    let gains: Vec<f64> = changes.iter().copied().filter(|c| *c > 0.0).collect();
    let losses: Vec<f64> = changes.iter().copied().filter(|c| *c < 0.0).collect();
    let gainers = gains.len();
    let losers = losses.len();
    let neutral = changes.iter().filter(|c| **c == 0.0).count();

    let btc_dominance = dominance(snapshot, "btc", total_market_cap);
    let eth_dominance = dominance(snapshot, "eth", total_market_cap);

    let global = highlights.and_then(|h| h.global.as_ref());

    let highest_price = snapshot
        .iter()
        .map(|r| r.current_price.unwrap_or(0.0))
        .fold(0.0, f64::max);
    let lowest_price = snapshot
        .iter()
        .filter_map(|r| r.current_price)
        .filter(|p| *p > 0.0)
        .reduce(f64::min);

    let caps = || snapshot.iter().filter_map(|r| r.market_cap);

    MarketStats {
        total_market_cap,
        total_volume_24h,
        market_cap_change_24h,
        market_cap_change_percent,
        total_assets: count,

        gainers,
        losers,
        neutral,
        gainers_percent: mean(gainers as f64 * 100.0, count),
        losers_percent: mean(losers as f64 * 100.0, count),
        avg_gain: mean(gains.iter().sum(), gainers),
        avg_loss: mean(losses.iter().sum(), losers),
        avg_price_change: mean(sum(|r| r.price_change_percentage_24h), count),
        sentiment_ratio: gainers as f64 / (gainers + losers) as f64 * 100.0,

        btc_dominance,
        eth_dominance,
        others_dominance: 100.0 - btc_dominance - eth_dominance,

        global_market_cap: prefer(global.and_then(|g| g.total_market_cap_usd()), total_market_cap),
        global_volume: prefer(global.and_then(|g| g.total_volume_usd()), total_volume_24h),
        global_btc_dominance: prefer(global.and_then(|g| g.dominance("btc")), btc_dominance),
        global_eth_dominance: prefer(global.and_then(|g| g.dominance("eth")), eth_dominance),
        active_markets: global.map(|g| g.markets).unwrap_or(0),

        avg_price: mean(sum(|r| r.current_price), count),
        avg_market_cap: mean(total_market_cap, count),
        avg_volume: mean(total_volume_24h, count),
        highest_price,
        lowest_price,

        above_1b: caps().filter(|c| *c > 1e9).count(),
        above_1m: caps().filter(|c| *c > 1e6).count(),
        below_1m: caps().filter(|c| *c > 0.0 && *c < 1e6).count(),

        top_performers: top_movers(snapshot, MoveDirection::Gainers, PERFORMERS_LIMIT),
        worst_performers: top_movers(snapshot, MoveDirection::Losers, PERFORMERS_LIMIT),
    }
}
