use crate::config::{Endpoints, SEARCH_MIN_QUERY_LEN};
use crate::market::coincap::CoinCap;
use crate::market::coingecko::{CoinGecko, CoinGeckoRelay, CoinGeckoSimple};
use crate::market::fixtures::CannedQuotes;
use crate::market::http::build_client;
use crate::market::provider::{AssetProvider, AssetSearcher, PriceRefresher, TrendingSource};
use crate::market::yahoo::{YahooChart, YahooRoute};
use crate::market::{
    AssetKind, AssetSnapshot, Currency, MarketDataError, SearchResult, SnapshotUpdate, TrendingAsset,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fixed-priority provider lists for one asset kind. Every operation walks
/// its list in order and stops at the first provider that succeeds.
#[derive(Clone)]
pub struct ProviderChain {
    kind: AssetKind,
    currency: Currency,
    fetchers: Vec<Arc<dyn AssetProvider>>,
    refreshers: Vec<Arc<dyn PriceRefresher>>,
    searchers: Vec<Arc<dyn AssetSearcher>>,
    trending: Option<Arc<dyn TrendingSource>>,
}

impl ProviderChain {
    pub fn new(kind: AssetKind, currency: Currency) -> Self {
        Self {
            kind,
            currency,
            fetchers: Vec::new(),
            refreshers: Vec::new(),
            searchers: Vec::new(),
            trending: None,
        }
    }

    /// CoinCap, then CoinGecko, then CoinGecko through the relay.
    pub fn crypto(endpoints: &Endpoints, currency: Currency) -> Self {
        let client = build_client();
        let coincap = Arc::new(CoinCap::new(client.clone(), &endpoints.coincap, currency));
        let gecko = Arc::new(CoinGecko::new(client.clone(), &endpoints.coingecko, currency));
        let gecko_relay = Arc::new(CoinGeckoRelay::new(
            client.clone(),
            &endpoints.coingecko,
            &endpoints.relay,
            currency,
        ));
        let gecko_simple = Arc::new(CoinGeckoSimple::new(client, &endpoints.coingecko, currency));

        Self::new(AssetKind::Crypto, currency)
            .with_fetcher(coincap.clone())
            .with_fetcher(gecko)
            .with_fetcher(gecko_relay.clone())
            .with_refresher(coincap.clone())
            .with_refresher(gecko_simple)
            .with_searcher(coincap)
            .with_searcher(gecko_relay.clone())
            .with_trending(gecko_relay)
    }

    /// Yahoo through the relay, Yahoo direct, then the canned quote table.
    pub fn stocks(endpoints: &Endpoints, currency: Currency) -> Self {
        let client = build_client();
        let relayed = Arc::new(YahooChart::new(
            client.clone(),
            &endpoints.yahoo,
            YahooRoute::Relay(endpoints.relay.clone()),
            currency,
        ));
        let direct = Arc::new(YahooChart::new(client, &endpoints.yahoo, YahooRoute::Direct, currency));
        let canned = Arc::new(CannedQuotes::new(currency));

        Self::new(AssetKind::Stock, currency)
            .with_fetcher(relayed.clone())
            .with_fetcher(direct.clone())
            .with_fetcher(canned.clone())
            .with_refresher(relayed)
            .with_refresher(direct)
            .with_searcher(canned)
    }

    pub fn for_kind(kind: AssetKind, endpoints: &Endpoints, currency: Currency) -> Self {
        match kind {
            AssetKind::Crypto => Self::crypto(endpoints, currency),
            AssetKind::Stock => Self::stocks(endpoints, currency),
        }
    }

    pub fn with_fetcher(mut self, provider: Arc<dyn AssetProvider>) -> Self {
        self.fetchers.push(provider);
        self
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn PriceRefresher>) -> Self {
        self.refreshers.push(refresher);
        self
    }

    pub fn with_searcher(mut self, searcher: Arc<dyn AssetSearcher>) -> Self {
        self.searchers.push(searcher);
        self
    }

    pub fn with_trending(mut self, source: Arc<dyn TrendingSource>) -> Self {
        self.trending = Some(source);
        self
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn fetcher_names(&self) -> Vec<&str> {
        self.fetchers.iter().map(|p| p.name()).collect()
    }

    pub async fn fetch(&self, id: &str) -> Result<AssetSnapshot, MarketDataError> {
        let mut last_err: Option<MarketDataError> = None;

        for provider in &self.fetchers {
            info!("Trying {} for {}...", provider.name(), id);
            match provider.fetch(id).await {
                Ok(snapshot) => {
                    info!("{} succeeded for {}", provider.name(), id);
                    return Ok(snapshot);
                }
                Err(e) if e.is_rate_limited() => {
                    warn!("{} is rate limiting requests for {}. Trying next.", provider.name(), id);
                    last_err = Some(e);
                }
                Err(e) => {
                    warn!("{} failed for {}: {}. Trying next.", provider.name(), id, e);
                    last_err = Some(e);
                }
            }
        }

        error!("All {} providers failed for {}", self.kind.as_str(), id);
        Err(no_provider(id, last_err))
    }

    pub async fn refresh(&self, id: &str) -> Result<SnapshotUpdate, MarketDataError> {
        let mut last_err: Option<MarketDataError> = None;

        for refresher in &self.refreshers {
            match refresher.refresh(id).await {
                Ok(update) if !update.is_empty() => return Ok(update),
                Ok(_) => {
                    last_err = Some(MarketDataError::malformed(format!(
                        "{} returned an empty refresh",
                        refresher.name()
                    )));
                }
                Err(e) => {
                    debug!("Refresh via {} failed for {}: {}", refresher.name(), id, e);
                    last_err = Some(e);
                }
            }
        }

        Err(no_provider(id, last_err))
    }

    /// Results from the first searcher that answers. Short queries and
    /// total failure both yield an empty list.
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        let query = query.trim();
        if query.chars().count() < SEARCH_MIN_QUERY_LEN {
            return Vec::new();
        }

        for searcher in &self.searchers {
            match searcher.search(query).await {
                Ok(results) => return results,
                Err(e) => warn!("{} search failed for '{}': {}", searcher.name(), query, e),
            }
        }

        error!("All search providers failed for '{}'", query);
        Vec::new()
    }

    pub async fn trending(&self) -> Result<Vec<TrendingAsset>, MarketDataError> {
        match &self.trending {
            Some(source) => source.trending().await,
            None => Ok(Vec::new()),
        }
    }
}

fn no_provider(id: &str, last_err: Option<MarketDataError>) -> MarketDataError {
    MarketDataError::NoProviderAvailable {
        id: id.to_string(),
        last: Box::new(
            last_err.unwrap_or_else(|| MarketDataError::NotFound("no providers configured".to_string())),
        ),
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory provider that replays a fixed sequence of outcomes.
    pub struct Scripted {
        pub name: String,
        pub outcomes: Mutex<Vec<Option<Decimal>>>,
        pub calls: AtomicUsize,
    }

    impl Scripted {
        /// `Some(price)` succeeds with that price, `None` fails with HTTP 500.
        /// The last outcome repeats once the script runs out.
        pub fn new(name: &str, outcomes: Vec<Option<Decimal>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                outcomes: Mutex::new(outcomes),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> Result<Decimal, MarketDataError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let outcomes = self.outcomes.lock().unwrap();
            let outcome = outcomes.get(n).or(outcomes.last()).cloned().flatten();
            outcome.ok_or(MarketDataError::Status {
                provider: self.name.clone(),
                status: 500,
            })
        }
    }

    #[async_trait]
    impl AssetProvider for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(&self, id: &str) -> Result<AssetSnapshot, MarketDataError> {
            let price = self.next()?;
            Ok(AssetSnapshot {
                id: id.to_string(),
                symbol: id.to_uppercase(),
                name: format!("{} via {}", id, self.name),
                price,
                change: Decimal::ZERO,
                change_percent: Decimal::ZERO,
                volume: None,
                market_cap: Some(Decimal::from(1_000_000_000u64)),
                image: None,
                currency: Currency::Usd,
                source: self.name.clone(),
                updated_at: Utc::now(),
            })
        }
    }

    #[async_trait]
    impl PriceRefresher for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        async fn refresh(&self, id: &str) -> Result<SnapshotUpdate, MarketDataError> {
            let price = self.next()?;
            let mut update = SnapshotUpdate::new(id, &self.name);
            update.price = Some(price);
            Ok(update)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::scripted::Scripted;
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_second_provider_wins_after_http_500() {
        let first = Scripted::new("first", vec![None]);
        let second = Scripted::new("second", vec![Some(dec!(65000))]);
        let third = Scripted::new("third", vec![Some(dec!(1))]);
        let chain = ProviderChain::new(AssetKind::Crypto, Currency::Usd)
            .with_fetcher(first.clone())
            .with_fetcher(second.clone())
            .with_fetcher(third.clone());

        let snap = chain.fetch("bitcoin").await.unwrap();
        assert_eq!(snap.price, dec!(65000));
        assert_eq!(snap.source, "second");
        assert_eq!(snap.name, "bitcoin via second");
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
        assert_eq!(third.calls(), 0, "chain should stop at the first success");
    }

    #[tokio::test]
    async fn test_all_providers_failing_reports_last_error() {
        let chain = ProviderChain::new(AssetKind::Crypto, Currency::Usd)
            .with_fetcher(Scripted::new("a", vec![None]))
            .with_fetcher(Scripted::new("b", vec![None]));

        match chain.fetch("doesnotexist123").await {
            Err(MarketDataError::NoProviderAvailable { id, last }) => {
                assert_eq!(id, "doesnotexist123");
                assert!(matches!(*last, MarketDataError::Status { ref provider, status: 500 } if provider == "b"));
            }
            other => panic!("expected NoProviderAvailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_chain_fails() {
        let chain = ProviderChain::new(AssetKind::Stock, Currency::Usd);
        assert!(matches!(
            chain.fetch("AAPL").await,
            Err(MarketDataError::NoProviderAvailable { .. })
        ));
        assert!(chain.refresh("AAPL").await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_falls_through() {
        let chain = ProviderChain::new(AssetKind::Crypto, Currency::Usd)
            .with_refresher(Scripted::new("coincap", vec![None]))
            .with_refresher(Scripted::new("simple", vec![Some(dec!(101))]));
        let update = chain.refresh("bitcoin").await.unwrap();
        assert_eq!(update.price, Some(dec!(101)));
        assert_eq!(update.source, "simple");
    }

    #[tokio::test]
    async fn test_short_search_query_skips_network() {
        let chain = ProviderChain::crypto(&Endpoints::all("http://127.0.0.1:9"), Currency::Usd);
        assert!(chain.search("b").await.is_empty());
        assert!(chain.search("  ").await.is_empty());
    }

    #[test]
    fn test_standard_chain_order() {
        let endpoints = Endpoints::default();
        let crypto = ProviderChain::crypto(&endpoints, Currency::Eur);
        assert_eq!(crypto.fetcher_names(), vec!["CoinCap", "CoinGecko", "CoinGecko (Proxy)"]);
        assert_eq!(crypto.currency(), Currency::Eur);

        let stocks = ProviderChain::stocks(&endpoints, Currency::Usd);
        assert_eq!(stocks.fetcher_names(), vec!["Yahoo (Proxy)", "Yahoo", "Canned"]);
        assert_eq!(stocks.kind(), AssetKind::Stock);
    }
}
