use crate::config::{SEARCH_RESULT_LIMIT, TRENDING_LIMIT};
use crate::market::http::{get_json, get_json_via_relay};
use crate::market::provider::{AssetProvider, AssetSearcher, PriceRefresher, TrendingSource};
use crate::market::{
    AssetSnapshot, Currency, MarketDataError, SearchResult, SnapshotUpdate, TrendingAsset,
    decimal_from_f64,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// CoinGecko identifiers for ticker shorthands and for the CoinCap ids that
/// differ between the two services.
pub fn coingecko_id(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    match lower.as_str() {
        "btc" => "bitcoin",
        "eth" => "ethereum",
        "bnb" | "binance-coin" => "binancecoin",
        "ton" | "toncoin" => "the-open-network",
        "avax" | "avalanche" => "avalanche-2",
        "ada" => "cardano",
        "dot" => "polkadot",
        "sol" => "solana",
        "matic" => "polygon",
        _ => return lower,
    }
    .to_string()
}

type CurrencyMap = HashMap<String, Option<f64>>;

/// Value for `currency`, else the USD value converted at the fixed rate.
fn in_currency(map: Option<&CurrencyMap>, currency: Currency) -> Option<Decimal> {
    let map = map?;
    if let Some(v) = map.get(currency.code()).copied().flatten() {
        return decimal_from_f64(v);
    }
    map.get("usd")
        .copied()
        .flatten()
        .and_then(decimal_from_f64)
        .map(|v| v * currency.usd_rate())
}

fn dec(value: Option<f64>) -> Option<Decimal> {
    value.and_then(decimal_from_f64)
}

#[derive(Deserialize, Debug)]
struct ApiStatus {
    error_code: Option<u16>,
    error_message: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CoinResponse {
    id: Option<String>,
    symbol: Option<String>,
    name: Option<String>,
    image: Option<CoinImage>,
    market_data: Option<MarketData>,
    status: Option<ApiStatus>,
}

#[derive(Deserialize, Debug)]
struct CoinImage {
    small: Option<String>,
}

#[derive(Deserialize, Debug)]
struct MarketData {
    current_price: Option<CurrencyMap>,
    price_change_24h: Option<f64>,
    price_change_24h_in_currency: Option<CurrencyMap>,
    price_change_percentage_24h: Option<f64>,
    total_volume: Option<CurrencyMap>,
    market_cap: Option<CurrencyMap>,
}

fn check_status(status: Option<&ApiStatus>) -> Result<(), MarketDataError> {
    let Some(status) = status else {
        return Ok(());
    };
    let Some(code) = status.error_code else {
        return Ok(());
    };
    let message = status
        .error_message
        .clone()
        .unwrap_or_else(|| format!("CoinGecko error {}", code));
    if code == 429 {
        Err(MarketDataError::RateLimited(message))
    } else {
        Err(MarketDataError::Status {
            provider: format!("CoinGecko ({})", message),
            status: code,
        })
    }
}

pub struct CoinGecko {
    client: Client,
    base: String,
    currency: Currency,
}

impl CoinGecko {
    pub fn new(client: Client, base: &str, currency: Currency) -> Self {
        Self {
            client,
            base: base.to_string(),
            currency,
        }
    }
}

#[async_trait]
impl AssetProvider for CoinGecko {
    fn name(&self) -> &str {
        "CoinGecko"
    }

    async fn fetch(&self, id: &str) -> Result<AssetSnapshot, MarketDataError> {
        let url = format!("{}/api/v3/coins/{}", self.base, coingecko_id(id));
        let coin: CoinResponse = get_json(&self.client, self.name(), &url).await?;
        check_status(coin.status.as_ref())?;

        let (Some(coin_id), Some(market)) = (coin.id, coin.market_data) else {
            return Err(MarketDataError::malformed("CoinGecko coin without id or market_data"));
        };

        let currency = self.currency;
        let price = in_currency(market.current_price.as_ref(), currency)
            .ok_or_else(|| MarketDataError::malformed("CoinGecko coin without current_price"))?;
        let change = market
            .price_change_24h_in_currency
            .as_ref()
            .and_then(|m| m.get(currency.code()).copied().flatten())
            .and_then(decimal_from_f64)
            .or_else(|| dec(market.price_change_24h))
            .unwrap_or(Decimal::ZERO);

        Ok(AssetSnapshot {
            id: coin_id,
            symbol: coin.symbol.unwrap_or_default().to_uppercase(),
            name: coin.name.unwrap_or_else(|| "Unknown".to_string()),
            price,
            change,
            change_percent: dec(market.price_change_percentage_24h).unwrap_or(Decimal::ZERO),
            volume: in_currency(market.total_volume.as_ref(), currency),
            market_cap: in_currency(market.market_cap.as_ref(), currency),
            image: coin.image.and_then(|i| i.small),
            currency,
            source: self.name().to_string(),
            updated_at: Utc::now(),
        })
    }
}

#[derive(Deserialize, Debug)]
struct MarketRow {
    id: String,
    symbol: Option<String>,
    name: Option<String>,
    image: Option<String>,
    current_price: Option<f64>,
    price_change_24h: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    total_volume: Option<f64>,
    market_cap: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    coins: Vec<SearchCoin>,
}

#[derive(Deserialize, Debug)]
struct SearchCoin {
    id: String,
    name: Option<String>,
    symbol: Option<String>,
    thumb: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TrendingResponse {
    coins: Vec<TrendingEntry>,
}

#[derive(Deserialize, Debug)]
struct TrendingEntry {
    item: TrendingItem,
}

#[derive(Deserialize, Debug)]
struct TrendingItem {
    id: String,
    name: Option<String>,
    symbol: Option<String>,
    market_cap_rank: Option<u32>,
    thumb: Option<String>,
    price_btc: Option<f64>,
}

const RELAY_NAME: &str = "CoinGecko (Proxy)";

/// CoinGecko endpoints reached through the CORS relay.
pub struct CoinGeckoRelay {
    client: Client,
    base: String,
    relay: String,
    currency: Currency,
}

impl CoinGeckoRelay {
    pub fn new(client: Client, base: &str, relay: &str, currency: Currency) -> Self {
        Self {
            client,
            base: base.to_string(),
            relay: relay.to_string(),
            currency,
        }
    }

    async fn relayed<T: serde::de::DeserializeOwned>(&self, target: &str) -> Result<T, MarketDataError> {
        get_json_via_relay(&self.client, RELAY_NAME, &self.relay, target).await
    }
}

#[async_trait]
impl AssetProvider for CoinGeckoRelay {
    fn name(&self) -> &str {
        RELAY_NAME
    }

    async fn fetch(&self, id: &str) -> Result<AssetSnapshot, MarketDataError> {
        let target = format!(
            "{}/api/v3/coins/markets?vs_currency={}&ids={}",
            self.base,
            self.currency.code(),
            coingecko_id(id)
        );
        let rows: Vec<MarketRow> = self.relayed(&target).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::NotFound(format!("CoinGecko markets has no {}", id)))?;

        Ok(AssetSnapshot {
            id: row.id,
            symbol: row.symbol.unwrap_or_default().to_uppercase(),
            name: row.name.unwrap_or_else(|| "Unknown".to_string()),
            price: dec(row.current_price).unwrap_or(Decimal::ZERO),
            change: dec(row.price_change_24h).unwrap_or(Decimal::ZERO),
            change_percent: dec(row.price_change_percentage_24h).unwrap_or(Decimal::ZERO),
            volume: dec(row.total_volume),
            market_cap: dec(row.market_cap),
            image: row.image,
            currency: self.currency,
            source: RELAY_NAME.to_string(),
            updated_at: Utc::now(),
        })
    }
}

#[async_trait]
impl AssetSearcher for CoinGeckoRelay {
    fn name(&self) -> &str {
        RELAY_NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, MarketDataError> {
        let target = format!("{}/api/v3/search?query={}", self.base, urlencoding::encode(query));
        let response: SearchResponse = self.relayed(&target).await?;
        Ok(response
            .coins
            .into_iter()
            .take(SEARCH_RESULT_LIMIT)
            .map(|coin| SearchResult {
                id: coin.id,
                symbol: coin.symbol.unwrap_or_default().to_uppercase(),
                name: coin.name.unwrap_or_default(),
                image: coin.thumb,
            })
            .collect())
    }
}

#[async_trait]
impl TrendingSource for CoinGeckoRelay {
    async fn trending(&self) -> Result<Vec<TrendingAsset>, MarketDataError> {
        let target = format!("{}/api/v3/search/trending", self.base);
        let response: TrendingResponse = self.relayed(&target).await?;
        Ok(response
            .coins
            .into_iter()
            .take(TRENDING_LIMIT)
            .map(|entry| TrendingAsset {
                id: entry.item.id,
                name: entry.item.name.unwrap_or_default(),
                symbol: entry.item.symbol.unwrap_or_default(),
                market_cap_rank: entry.item.market_cap_rank,
                thumb: entry.item.thumb,
                price_btc: entry.item.price_btc,
            })
            .collect())
    }
}

/// `simple/price` refresher: price, 24h change, volume and market cap only.
pub struct CoinGeckoSimple {
    client: Client,
    base: String,
    currency: Currency,
}

impl CoinGeckoSimple {
    pub fn new(client: Client, base: &str, currency: Currency) -> Self {
        Self {
            client,
            base: base.to_string(),
            currency,
        }
    }
}

#[async_trait]
impl PriceRefresher for CoinGeckoSimple {
    fn name(&self) -> &str {
        "CoinGecko-Simple"
    }

    async fn refresh(&self, id: &str) -> Result<SnapshotUpdate, MarketDataError> {
        let gecko_id = coingecko_id(id);
        let cur = self.currency.code();
        let url = format!(
            "{}/api/v3/simple/price?ids={}&vs_currencies={}&include_24hr_change=true&include_market_cap=true&include_24hr_vol=true",
            self.base, gecko_id, cur
        );
        let mut body: HashMap<String, CurrencyMap> = get_json(&self.client, self.name(), &url).await?;
        let entry = body
            .remove(&gecko_id)
            .ok_or_else(|| MarketDataError::NotFound(format!("simple/price has no {}", gecko_id)))?;

        let get = |key: String| dec(entry.get(&key).copied().flatten());
        let mut update = SnapshotUpdate::new(id, self.name());
        update.price = get(cur.to_string());
        update.change_percent = get(format!("{}_24h_change", cur));
        update.market_cap = get(format!("{}_market_cap", cur));
        update.volume = get(format!("{}_24h_vol", cur));
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::http::{build_client, test_server};
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    async fn coin(Path(id): Path<String>) -> Response {
        match id.as_str() {
            "bitcoin" => Json(json!({
                "id": "bitcoin",
                "symbol": "btc",
                "name": "Bitcoin",
                "image": { "small": "https://img.test/btc.png" },
                "market_data": {
                    "current_price": { "usd": 65000.0, "eur": 59800.0 },
                    "price_change_24h": 650.0,
                    "price_change_24h_in_currency": { "usd": 650.0, "eur": 598.0 },
                    "price_change_percentage_24h": 1.0,
                    "total_volume": { "usd": 2000000.0 },
                    "market_cap": { "usd": 1280000000000.0 }
                }
            }))
            .into_response(),
            "limited" => Json(json!({
                "status": { "error_code": 429, "error_message": "You've exceeded the Rate Limit" }
            }))
            .into_response(),
            "empty" => Json(json!({ "id": "empty" })).into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    fn relayed_body(url: &str) -> Value {
        if url.contains("/coins/markets") {
            if url.contains("ids=ethereum") {
                json!([{
                    "id": "ethereum", "symbol": "eth", "name": "Ethereum",
                    "image": "https://img.test/eth.png",
                    "current_price": 3100.5, "price_change_24h": -31.0,
                    "price_change_percentage_24h": -1.0,
                    "total_volume": 900.0, "market_cap": 370000000000.0
                }])
            } else {
                json!([])
            }
        } else if url.contains("/search/trending") {
            let coins: Vec<Value> = (0..8)
                .map(|i| json!({ "item": {
                    "id": format!("coin-{}", i), "name": format!("Coin {}", i),
                    "symbol": format!("C{}", i), "market_cap_rank": i + 10,
                    "thumb": "t.png", "price_btc": 0.0001
                }}))
                .collect();
            json!({ "coins": coins })
        } else if url.contains("/search?query=") {
            let coins: Vec<Value> = (0..7)
                .map(|i| json!({ "id": format!("pepe-{}", i), "name": "Pepe", "symbol": "pepe", "thumb": "p.png" }))
                .collect();
            json!({ "coins": coins })
        } else {
            json!({})
        }
    }

    async fn relay(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let target = params.get("url").cloned().unwrap_or_default();
        Json(json!({ "contents": relayed_body(&target).to_string() }))
    }

    async fn simple(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let ids = params.get("ids").cloned().unwrap_or_default();
        if ids == "the-open-network" {
            Json(json!({ "the-open-network": { "eur": 5.5, "eur_24h_change": -2.5 } }))
        } else {
            Json(json!({}))
        }
    }

    async fn server() -> String {
        let app = Router::new()
            .route("/api/v3/coins/:id", get(coin))
            .route("/api/v3/simple/price", get(simple))
            .route("/get", get(relay));
        test_server::spawn(app).await
    }

    #[tokio::test]
    async fn test_coin_prefers_requested_currency() {
        let base = server().await;
        let eur = CoinGecko::new(build_client(), &base, Currency::Eur);
        let snap = eur.fetch("btc").await.unwrap();
        assert_eq!(snap.price, dec!(59800));
        assert_eq!(snap.change, dec!(598));
        // volume has no eur entry and falls back to converted usd
        assert_eq!(snap.volume, Some(dec!(1840000)));
        assert_eq!(snap.image.as_deref(), Some("https://img.test/btc.png"));
        assert_eq!(snap.source, "CoinGecko");
    }

    #[tokio::test]
    async fn test_coin_error_shapes() {
        let base = server().await;
        let provider = CoinGecko::new(build_client(), &base, Currency::Usd);
        let limited = provider.fetch("limited").await.unwrap_err();
        assert!(limited.is_rate_limited());
        assert!(matches!(provider.fetch("empty").await, Err(MarketDataError::Malformed(_))));
        assert!(matches!(
            provider.fetch("nope").await,
            Err(MarketDataError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_relay_markets() {
        let base = server().await;
        let provider = CoinGeckoRelay::new(build_client(), &base, &base, Currency::Usd);
        let snap = provider.fetch("eth").await.unwrap();
        assert_eq!(snap.id, "ethereum");
        assert_eq!(snap.symbol, "ETH");
        assert_eq!(snap.price, dec!(3100.5));
        assert_eq!(snap.change, dec!(-31));
        assert!(!snap.is_up());

        assert!(matches!(provider.fetch("unknown").await, Err(MarketDataError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_relay_search_and_trending_limits() {
        let base = server().await;
        let provider = CoinGeckoRelay::new(build_client(), &base, &base, Currency::Usd);

        let results = provider.search("pepe").await.unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].symbol, "PEPE");
        assert_eq!(results[0].image.as_deref(), Some("p.png"));

        let trending = provider.trending().await.unwrap();
        assert_eq!(trending.len(), 6);
        assert_eq!(trending[0].id, "coin-0");
        assert_eq!(trending[0].market_cap_rank, Some(10));
    }

    #[tokio::test]
    async fn test_simple_price_partial_update() {
        let base = server().await;
        let provider = CoinGeckoSimple::new(build_client(), &base, Currency::Eur);
        let update = provider.refresh("toncoin").await.unwrap();
        assert_eq!(update.id, "toncoin");
        assert_eq!(update.price, Some(dec!(5.5)));
        assert_eq!(update.change_percent, Some(dec!(-2.5)));
        assert_eq!(update.market_cap, None);

        assert!(matches!(provider.refresh("bitcoin").await, Err(MarketDataError::NotFound(_))));
    }

    #[test]
    fn test_aliases() {
        assert_eq!(coingecko_id("binance-coin"), "binancecoin");
        assert_eq!(coingecko_id("AVAX"), "avalanche-2");
        assert_eq!(coingecko_id("pepe"), "pepe");
    }
}
