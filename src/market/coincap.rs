use crate::config::SEARCH_RESULT_LIMIT;
use crate::market::http::get_json;
use crate::market::provider::{AssetProvider, AssetSearcher, PriceRefresher};
use crate::market::{
    AssetSnapshot, Currency, MarketDataError, SearchResult, SnapshotUpdate, parse_decimal,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

const NAME: &str = "CoinCap";

/// CoinCap identifiers for common ticker shorthands.
pub fn coincap_id(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    match lower.as_str() {
        "btc" => "bitcoin",
        "eth" => "ethereum",
        "bnb" => "binance-coin",
        "ton" => "toncoin",
        "avax" => "avalanche",
        "ada" => "cardano",
        "dot" => "polkadot",
        "sol" => "solana",
        "matic" => "polygon",
        _ => return lower,
    }
    .to_string()
}

#[derive(Deserialize, Debug)]
struct AssetResponse {
    data: Option<CoinCapAsset>,
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    data: Vec<CoinCapAsset>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CoinCapAsset {
    id: Option<String>,
    symbol: Option<String>,
    name: Option<String>,
    price_usd: Option<String>,
    change_percent24_hr: Option<String>,
    volume_usd24_hr: Option<String>,
    market_cap_usd: Option<String>,
}

fn field(raw: &Option<String>) -> Option<Decimal> {
    raw.as_deref().and_then(parse_decimal)
}

pub struct CoinCap {
    client: Client,
    base: String,
    currency: Currency,
}

impl CoinCap {
    pub fn new(client: Client, base: &str, currency: Currency) -> Self {
        Self {
            client,
            base: base.to_string(),
            currency,
        }
    }

    async fn asset(&self, id: &str) -> Result<CoinCapAsset, MarketDataError> {
        let url = format!("{}/v2/assets/{}", self.base, coincap_id(id));
        let response: AssetResponse = get_json(&self.client, NAME, &url).await?;
        response
            .data
            .filter(|a| a.id.as_deref().is_some_and(|v| !v.is_empty()))
            .ok_or_else(|| MarketDataError::NotFound(format!("{} has no asset {}", NAME, id)))
    }
}

fn normalize(asset: CoinCapAsset, currency: Currency) -> Result<AssetSnapshot, MarketDataError> {
    let rate = currency.usd_rate();
    let price_usd = field(&asset.price_usd)
        .ok_or_else(|| MarketDataError::malformed("CoinCap asset without priceUsd"))?;
    let pct = field(&asset.change_percent24_hr).unwrap_or(Decimal::ZERO);
    let change_usd = price_usd * pct / Decimal::ONE_HUNDRED;

    Ok(AssetSnapshot {
        id: asset.id.unwrap_or_default(),
        symbol: asset.symbol.unwrap_or_default().to_uppercase(),
        name: asset.name.unwrap_or_else(|| "Unknown".to_string()),
        price: price_usd * rate,
        change: (change_usd * rate).round_dp(8),
        change_percent: pct,
        volume: field(&asset.volume_usd24_hr).map(|v| v * rate),
        market_cap: field(&asset.market_cap_usd).map(|v| v * rate),
        image: None,
        currency,
        source: NAME.to_string(),
        updated_at: Utc::now(),
    })
}

#[async_trait]
impl AssetProvider for CoinCap {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, id: &str) -> Result<AssetSnapshot, MarketDataError> {
        let asset = self.asset(id).await?;
        normalize(asset, self.currency)
    }
}

#[async_trait]
impl PriceRefresher for CoinCap {
    fn name(&self) -> &str {
        NAME
    }

    async fn refresh(&self, id: &str) -> Result<SnapshotUpdate, MarketDataError> {
        let asset = self.asset(id).await?;
        let rate = self.currency.usd_rate();
        let mut update = SnapshotUpdate::new(id, NAME);
        update.price = field(&asset.price_usd).map(|v| v * rate);
        update.change_percent = field(&asset.change_percent24_hr);
        update.volume = field(&asset.volume_usd24_hr).map(|v| v * rate);
        update.market_cap = field(&asset.market_cap_usd).map(|v| v * rate);
        Ok(update)
    }
}

#[async_trait]
impl AssetSearcher for CoinCap {
    fn name(&self) -> &str {
        NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, MarketDataError> {
        let url = format!(
            "{}/v2/assets?search={}&limit={}",
            self.base,
            urlencoding::encode(query),
            SEARCH_RESULT_LIMIT
        );
        let response: SearchResponse = get_json(&self.client, NAME, &url).await?;
        Ok(response
            .data
            .into_iter()
            .filter_map(|coin| {
                Some(SearchResult {
                    id: coin.id?,
                    symbol: coin.symbol.unwrap_or_default().to_uppercase(),
                    name: coin.name.unwrap_or_default(),
                    image: None,
                })
            })
            .take(SEARCH_RESULT_LIMIT)
            .collect())
    }
}
