use crate::market::Currency;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

static ENDPOINTS: OnceLock<Endpoints> = OnceLock::new();
static DEFAULT_CURRENCY: OnceLock<Currency> = OnceLock::new();
static REFRESH_INTERVAL: OnceLock<Duration> = OnceLock::new();

/// Interval between background price refreshes for the selected asset.
pub const REFRESH_INTERVAL_SECS: u64 = 30;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

pub const DEFAULT_CRYPTO: &str = "bitcoin";
pub const DEFAULT_STOCK: &str = "AAPL";

/// Shown in the panel when every provider in the chain failed.
pub const ALL_PROVIDERS_FAILED_MSG: &str =
    "Unable to fetch data from any provider. Please try again later.";

pub const SEARCH_MIN_QUERY_LEN: usize = 2;
pub const SEARCH_RESULT_LIMIT: usize = 5;
pub const TRENDING_LIMIT: usize = 6;

pub const CRYPTO_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Top Coins",
        &["bitcoin", "ethereum", "binance-coin", "solana", "toncoin", "dogecoin"],
    ),
    (
        "Layer 1",
        &["ethereum", "solana", "avalanche", "cardano", "polkadot", "near-protocol"],
    ),
    (
        "DeFi",
        &["uniswap", "aave", "maker", "compound", "curve-dao-token", "sushi"],
    ),
    (
        "AI & Data",
        &["fetch-ai", "singularitynet", "ocean-protocol", "numeraire", "cortex", "deepbrain-chain"],
    ),
    (
        "Gaming",
        &["axie-infinity", "the-sandbox", "decentraland", "enjin-coin", "gala", "immutable-x"],
    ),
    (
        "Meme",
        &["dogecoin", "shiba-inu", "pepe", "bonk", "floki", "baby-doge-coin"],
    ),
];

pub const STOCK_WATCHLIST: &[&str] = &["AAPL", "GOOGL", "MSFT", "TSLA", "NVDA"];

/// Short button label for a crypto identifier.
pub fn crypto_label(id: &str) -> String {
    match id {
        "binance-coin" => "BNB".to_string(),
        "avalanche" => "AVAX".to_string(),
        "toncoin" => "TON".to_string(),
        "curve-dao-token" => "CRV".to_string(),
        "enjin-coin" => "ENJ".to_string(),
        "near-protocol" => "NEAR".to_string(),
        other => other.replacen('-', " ", 1),
    }
}

/// Base URLs of every upstream service. Overridable so adapters can be
/// pointed at a local server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub coincap: String,
    pub coingecko: String,
    pub yahoo: String,
    pub relay: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            coincap: "https://api.coincap.io".to_string(),
            coingecko: "https://api.coingecko.com".to_string(),
            yahoo: "https://query1.finance.yahoo.com".to_string(),
            relay: "https://api.allorigins.win".to_string(),
        }
    }
}

impl Endpoints {
    /// Every endpoint pointing at the same base URL.
    #[cfg(test)]
    pub fn all(base: &str) -> Self {
        Self {
            coincap: base.to_string(),
            coingecko: base.to_string(),
            yahoo: base.to_string(),
            relay: base.to_string(),
        }
    }
}

fn env_url(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

pub fn configured_endpoints() -> &'static Endpoints {
    ENDPOINTS.get_or_init(|| {
        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            coincap: env_url("MARKETDESK_COINCAP_URL").unwrap_or(defaults.coincap),
            coingecko: env_url("MARKETDESK_COINGECKO_URL").unwrap_or(defaults.coingecko),
            yahoo: env_url("MARKETDESK_YAHOO_URL").unwrap_or(defaults.yahoo),
            relay: env_url("MARKETDESK_RELAY_URL").unwrap_or(defaults.relay),
        };
        info!(
            "Market data endpoints: coincap={} coingecko={} yahoo={} relay={}",
            endpoints.coincap, endpoints.coingecko, endpoints.yahoo, endpoints.relay
        );
        endpoints
    })
}

pub fn configured_currency() -> Currency {
    *DEFAULT_CURRENCY.get_or_init(|| {
        let raw = std::env::var("MARKETDESK_CURRENCY")
            .unwrap_or_else(|_| "usd".to_string());
        match raw.parse::<Currency>() {
            Ok(currency) => currency,
            Err(_) => {
                warn!(
                    "Unknown MARKETDESK_CURRENCY={} ; defaulting to usd. Allowed values: usd | eur | sek",
                    raw.trim()
                );
                Currency::Usd
            }
        }
    })
}

pub fn refresh_interval() -> Duration {
    *REFRESH_INTERVAL.get_or_init(|| {
        let secs = std::env::var("MARKETDESK_REFRESH_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|v| v.clamp(5, 3600))
            .unwrap_or(REFRESH_INTERVAL_SECS);
        Duration::from_secs(secs)
    })
}

pub fn request_timeout() -> Duration {
    Duration::from_secs(REQUEST_TIMEOUT_SECS)
}
