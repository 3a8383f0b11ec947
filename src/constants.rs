//! Constants for the market dataset SDK
//!
//! Compile-time defaults. Everything here can be overridden at runtime through
//! [`ClientConfig`](crate::config::ClientConfig) and
//! [`DatasetOptions`](crate::config::DatasetOptions).

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Market listing endpoint
pub const COINGECKO_MARKETS_ENDPOINT: &str = "/coins/markets";

/// Per-asset detail endpoint prefix (`/coins/{id}`)
pub const COINGECKO_COIN_ENDPOINT: &str = "/coins";

/// Trending search endpoint
pub const COINGECKO_TRENDING_ENDPOINT: &str = "/search/trending";

/// Global market figures endpoint
pub const COINGECKO_GLOBAL_ENDPOINT: &str = "/global";

/// Quote currency for every market request
pub const VS_CURRENCY: &str = "usd";

/// Price change windows requested alongside market data
pub const PRICE_CHANGE_WINDOWS: &str = "24h,7d,30d";

/// HTTP request timeout (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Total attempts per request, including the first one
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between request retries (in milliseconds)
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Freshness window of the response cache (in seconds)
pub const CACHE_TTL_SECS: u64 = 120;

/// Retries applied around a whole page query after the client gave up
pub const QUERY_RETRIES: u32 = 3;

/// Initial backoff for page query retries (in milliseconds)
pub const QUERY_INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff for page query retries (in milliseconds)
pub const QUERY_MAX_BACKOFF_MS: u64 = 30000;

/// Auto-refresh interval (in seconds)
pub const REFRESH_INTERVAL_SECS: u64 = 60;

/// Quiet period before a search term takes effect (in milliseconds)
pub const SEARCH_DEBOUNCE_MS: u64 = 300;

/// Assets per market page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Entries per highlight list
pub const HIGHLIGHT_LIMIT: usize = 15;

/// Assets scanned when ranking gainers and losers for highlights
pub const HIGHLIGHT_UNIVERSE_SIZE: u32 = 100;

/// Entries in the statistics performer lists
pub const PERFORMERS_LIMIT: usize = 5;

/// Sentences kept when summarizing an asset description
pub const DESCRIPTION_SUMMARY_SENTENCES: usize = 5;

/// Capacity of the dataset event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "coin-market-sdk/0.1.0";
