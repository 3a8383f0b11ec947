//! Types for the market dataset SDK

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::constants::{DEFAULT_PAGE_SIZE, DESCRIPTION_SUMMARY_SENTENCES};

/// One tracked cryptocurrency as returned by `/coins/markets`
///
/// Numeric fields are normalized at ingestion: numbers and numeric-looking
/// strings are accepted, anything else (null, garbage, NaN) becomes `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Stable unique key (e.g. "bitcoin")
    pub id: String,

    /// Ticker symbol, lower case upstream (e.g. "btc")
    #[serde(default)]
    pub symbol: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Icon URL
    #[serde(rename = "image", default)]
    pub image_url: String,

    /// Price in USD
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub current_price: Option<f64>,

    /// Market capitalization in USD
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub market_cap: Option<f64>,

    /// Rank by market cap, 1-based
    #[serde(default, deserialize_with = "lenient::rank_opt")]
    pub market_cap_rank: Option<u32>,

    /// 24h traded volume in USD
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub total_volume: Option<f64>,

    /// 24h price change in percent
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub price_change_percentage_24h: Option<f64>,

    /// 24h market cap change in USD
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub market_cap_change_24h: Option<f64>,

    /// 24h price change in USD
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub price_change_24h: Option<f64>,

    /// 24h market cap change in percent
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub market_cap_change_percentage_24h: Option<f64>,

    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub high_24h: Option<f64>,

    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub low_24h: Option<f64>,

    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub circulating_supply: Option<f64>,

    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub total_supply: Option<f64>,

    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub max_supply: Option<f64>,

    /// All-time high in USD
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub ath: Option<f64>,

    /// All-time low in USD
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub atl: Option<f64>,

    /// Upstream update timestamp
    #[serde(default, deserialize_with = "lenient::datetime_opt")]
    pub last_updated: Option<DateTime<Utc>>,

    /// Every other upstream field (7d/30d changes, ROI, ...)
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl AssetRecord {
    /// Creates a record with only its identity set
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            image_url: String::new(),
            current_price: None,
            market_cap: None,
            market_cap_rank: None,
            total_volume: None,
            price_change_percentage_24h: None,
            market_cap_change_24h: None,
            price_change_24h: None,
            market_cap_change_percentage_24h: None,
            high_24h: None,
            low_24h: None,
            circulating_supply: None,
            total_supply: None,
            max_supply: None,
            ath: None,
            atl: None,
            last_updated: None,
            extra: HashMap::new(),
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.current_price = Some(price);
        self
    }

    pub fn with_market_cap(mut self, market_cap: f64) -> Self {
        self.market_cap = Some(market_cap);
        self
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.market_cap_rank = Some(rank);
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.total_volume = Some(volume);
        self
    }

    pub fn with_change_24h(mut self, percent: f64) -> Self {
        self.price_change_percentage_24h = Some(percent);
        self
    }

    pub fn with_market_cap_change(mut self, change: f64) -> Self {
        self.market_cap_change_24h = Some(change);
        self
    }
}

/// Upstream ordering for `/coins/markets`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketOrder {
    MarketCapDesc,
    VolumeDesc,
}

impl MarketOrder {
    /// Query parameter value
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketOrder::MarketCapDesc => "market_cap_desc",
            MarketOrder::VolumeDesc => "volume_desc",
        }
    }
}

/// Parameters of one market page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketQuery {
    /// 1-based page number
    pub page: u32,
    pub per_page: u32,
    pub order: MarketOrder,
}

impl MarketQuery {
    /// Page of the default market-cap ordered listing
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            order: MarketOrder::MarketCapDesc,
        }
    }
}

impl Default for MarketQuery {
    fn default() -> Self {
        Self::page(1, DEFAULT_PAGE_SIZE)
    }
}

/// Full asset profile from `/coins/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDetail {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::rank_opt")]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub image: AssetImage,
    #[serde(default)]
    pub description: HashMap<String, String>,
    #[serde(default)]
    pub links: AssetLinks,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub market_data: Option<DetailMarketData>,
}

impl AssetDetail {
    /// English description cut down to its first few sentences
    pub fn description_summary(&self) -> Option<String> {
        let text = self.description.get("en")?.trim();
        if text.is_empty() {
            return None;
        }
        let sentences: Vec<&str> = text
            .split(". ")
            .take(DESCRIPTION_SUMMARY_SENTENCES)
            .collect();
        let mut summary = sentences.join(". ");
        if !summary.ends_with('.') {
            summary.push('.');
        }
        Some(summary)
    }

    /// First non-empty homepage link
    pub fn homepage(&self) -> Option<&str> {
        self.links
            .homepage
            .iter()
            .map(|s| s.as_str())
            .find(|s| !s.is_empty())
    }

    pub fn price_usd(&self) -> Option<f64> {
        self.market_data.as_ref()?.current_price.get("usd").copied()
    }

    pub fn market_cap_usd(&self) -> Option<f64> {
        self.market_data.as_ref()?.market_cap.get("usd").copied()
    }

    pub fn volume_usd(&self) -> Option<f64> {
        self.market_data.as_ref()?.total_volume.get("usd").copied()
    }

    pub fn ath_usd(&self) -> Option<f64> {
        self.market_data.as_ref()?.ath.get("usd").copied()
    }

    pub fn atl_usd(&self) -> Option<f64> {
        self.market_data.as_ref()?.atl.get("usd").copied()
    }

    pub fn ath_date_usd(&self) -> Option<DateTime<Utc>> {
        let raw = self.market_data.as_ref()?.ath_date.get("usd")?;
        raw.parse().ok()
    }

    pub fn atl_date_usd(&self) -> Option<DateTime<Utc>> {
        let raw = self.market_data.as_ref()?.atl_date.get("usd")?;
        raw.parse().ok()
    }

    /// 24h price change in percent, 0 when unknown
    pub fn price_change_24h(&self) -> f64 {
        self.market_data
            .as_ref()
            .and_then(|m| m.price_change_percentage_24h)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetImage {
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetLinks {
    #[serde(default)]
    pub homepage: Vec<String>,
    #[serde(default)]
    pub twitter_screen_name: Option<String>,
    #[serde(default)]
    pub repos_url: RepoLinks,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoLinks {
    #[serde(default)]
    pub github: Vec<String>,
}

/// `market_data` block of an asset detail, keyed by quote currency
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailMarketData {
    #[serde(default, deserialize_with = "lenient::f64_map")]
    pub current_price: HashMap<String, f64>,
    #[serde(default, deserialize_with = "lenient::f64_map")]
    pub market_cap: HashMap<String, f64>,
    #[serde(default, deserialize_with = "lenient::f64_map")]
    pub total_volume: HashMap<String, f64>,
    #[serde(default, deserialize_with = "lenient::f64_map")]
    pub ath: HashMap<String, f64>,
    #[serde(default)]
    pub ath_date: HashMap<String, String>,
    #[serde(default, deserialize_with = "lenient::f64_map")]
    pub atl: HashMap<String, f64>,
    #[serde(default)]
    pub atl_date: HashMap<String, String>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub circulating_supply: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub total_supply: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub max_supply: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub price_change_percentage_24h: Option<f64>,
}

/// Entry of `/search/trending`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingItem {
    pub id: String,
    #[serde(default)]
    pub coin_id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient::rank_opt")]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub price_btc: Option<f64>,
}

/// `data` block of `/global`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    #[serde(default)]
    pub active_cryptocurrencies: u64,
    #[serde(default)]
    pub markets: u64,
    #[serde(default, deserialize_with = "lenient::f64_map")]
    pub total_market_cap: HashMap<String, f64>,
    #[serde(default, deserialize_with = "lenient::f64_map")]
    pub total_volume: HashMap<String, f64>,
    #[serde(default, deserialize_with = "lenient::f64_map")]
    pub market_cap_percentage: HashMap<String, f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub market_cap_change_percentage_24h_usd: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl GlobalStats {
    pub fn total_market_cap_usd(&self) -> Option<f64> {
        self.total_market_cap.get("usd").copied()
    }

    pub fn total_volume_usd(&self) -> Option<f64> {
        self.total_volume.get("usd").copied()
    }

    /// Upstream dominance of a symbol in percent
    pub fn dominance(&self, symbol: &str) -> Option<f64> {
        self.market_cap_percentage
            .get(&symbol.to_lowercase())
            .copied()
    }
}

/// Independently fetched highlight lists and global figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightBundle {
    pub top_gainers: Vec<AssetRecord>,
    pub top_losers: Vec<AssetRecord>,
    pub highest_volume: Vec<AssetRecord>,
    pub trending: Vec<TrendingItem>,
    pub global: Option<GlobalStats>,
    pub fetched_at: DateTime<Utc>,
}

impl HighlightBundle {
    /// Bundle with every part missing
    pub fn empty() -> Self {
        Self {
            top_gainers: Vec::new(),
            top_losers: Vec::new(),
            highest_volume: Vec::new(),
            trending: Vec::new(),
            global: None,
            fetched_at: Utc::now(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Sortable column of the asset table
///
/// Known columns map to typed record fields; anything else is looked up in
/// [`AssetRecord::extra`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortField {
    MarketCapRank,
    Name,
    Symbol,
    CurrentPrice,
    MarketCap,
    TotalVolume,
    PriceChangePercentage24h,
    MarketCapChange24h,
    Other(String),
}

impl SortField {
    /// Upstream field name
    pub fn as_str(&self) -> &str {
        match self {
            SortField::MarketCapRank => "market_cap_rank",
            SortField::Name => "name",
            SortField::Symbol => "symbol",
            SortField::CurrentPrice => "current_price",
            SortField::MarketCap => "market_cap",
            SortField::TotalVolume => "total_volume",
            SortField::PriceChangePercentage24h => "price_change_percentage_24h",
            SortField::MarketCapChange24h => "market_cap_change_24h",
            SortField::Other(name) => name,
        }
    }

    /// Direction used when switching to this column
    ///
    /// Ranks and names read naturally ascending; prices, caps, volumes and
    /// changes descending. Unknown columns default to descending.
    pub fn default_direction(&self) -> SortDirection {
        match self {
            SortField::MarketCapRank | SortField::Name | SortField::Symbol => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }
}

impl From<&str> for SortField {
    fn from(name: &str) -> Self {
        match name {
            "market_cap_rank" => SortField::MarketCapRank,
            "name" => SortField::Name,
            "symbol" => SortField::Symbol,
            "current_price" => SortField::CurrentPrice,
            "market_cap" => SortField::MarketCap,
            "total_volume" => SortField::TotalVolume,
            "price_change_percentage_24h" => SortField::PriceChangePercentage24h,
            "market_cap_change_24h" => SortField::MarketCapChange24h,
            other => SortField::Other(other.to_string()),
        }
    }
}

impl From<String> for SortField {
    fn from(name: String) -> Self {
        SortField::from(name.as_str())
    }
}

impl From<SortField> for String {
    fn from(field: SortField) -> Self {
        field.as_str().to_string()
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active sort of the asset table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(field: impl Into<SortField>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        Self::new(SortField::MarketCapRank, SortDirection::Asc)
    }
}

/// Fetch status of the primary dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingState {
    /// Fetching with nothing loaded yet
    pub is_loading: bool,
    /// Any page fetch in flight
    pub is_fetching: bool,
    /// User-facing message of the last failed fetch
    pub error: Option<String>,
    /// Fetching while data is already shown
    pub is_refreshing: bool,
}

/// Dataset notifications for the calling layer (toasts, logs, re-renders)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetEvent {
    /// A page was merged into the snapshot
    PageMerged {
        id: Uuid,
        page: u32,
        added: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// A page fetch failed; the previous snapshot is still served
    FetchFailed {
        id: Uuid,
        page: u32,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A page arrived for a search term that is no longer active
    StaleDiscarded {
        id: Uuid,
        page: u32,
        timestamp: DateTime<Utc>,
    },

    /// The highlight bundle was replaced
    HighlightsUpdated {
        id: Uuid,
        gainers: usize,
        losers: usize,
        volume: usize,
        trending: usize,
        timestamp: DateTime<Utc>,
    },
}

impl DatasetEvent {
    pub fn page_merged(page: u32, added: usize, total: usize) -> Self {
        Self::PageMerged {
            id: Uuid::new_v4(),
            page,
            added,
            total,
            timestamp: Utc::now(),
        }
    }

    pub fn fetch_failed(page: u32, error_message: impl Into<String>) -> Self {
        Self::FetchFailed {
            id: Uuid::new_v4(),
            page,
            error_message: error_message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn stale_discarded(page: u32) -> Self {
        Self::StaleDiscarded {
            id: Uuid::new_v4(),
            page,
            timestamp: Utc::now(),
        }
    }

    pub fn highlights_updated(bundle: &HighlightBundle) -> Self {
        Self::HighlightsUpdated {
            id: Uuid::new_v4(),
            gainers: bundle.top_gainers.len(),
            losers: bundle.top_losers.len(),
            volume: bundle.highest_volume.len(),
            trending: bundle.trending.len(),
            timestamp: Utc::now(),
        }
    }

    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            DatasetEvent::PageMerged { id, .. } => *id,
            DatasetEvent::FetchFailed { id, .. } => *id,
            DatasetEvent::StaleDiscarded { id, .. } => *id,
            DatasetEvent::HighlightsUpdated { id, .. } => *id,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            DatasetEvent::PageMerged { .. } => "PAGE_MERGED",
            DatasetEvent::FetchFailed { .. } => "FETCH_FAILED",
            DatasetEvent::StaleDiscarded { .. } => "STALE_DISCARDED",
            DatasetEvent::HighlightsUpdated { .. } => "HIGHLIGHTS_UPDATED",
        }
    }
}

impl fmt::Display for DatasetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetEvent::PageMerged {
                page, added, total, ..
            } => write!(f, "Page {} merged: {} new, {} total", page, added, total),
            DatasetEvent::FetchFailed {
                page,
                error_message,
                ..
            } => write!(f, "Page {} fetch failed: {}", page, error_message),
            DatasetEvent::StaleDiscarded { page, .. } => {
                write!(f, "Discarded stale result for page {}", page)
            }
            DatasetEvent::HighlightsUpdated {
                gainers,
                losers,
                trending,
                ..
            } => write!(
                f,
                "Highlights updated: {} gainers, {} losers, {} trending",
                gainers, losers, trending
            ),
        }
    }
}

/// Interprets a JSON value as a finite number
///
/// Numbers pass through, numeric-looking strings are parsed, everything else
/// is absent.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    }
}

mod lenient {
    use super::numeric_value;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::collections::HashMap;

    pub fn f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(numeric_value))
    }

    pub fn rank_opt<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64_opt(deserializer)?;
        Ok(value
            .filter(|v| *v >= 1.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
            .map(|v| v as u32))
    }

    pub fn datetime_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn f64_map<'de, D>(deserializer: D) -> Result<HashMap<String, f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<HashMap<String, Value>>::deserialize(deserializer)?;
        Ok(value
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(k, v)| numeric_value(&v).map(|n| (k, n)))
            .collect())
    }
}
