use crate::market::provider::{AssetProvider, AssetSearcher};
use crate::market::{AssetSnapshot, Currency, MarketDataError, SearchResult};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

const NAME: &str = "Canned";

/// symbol, name, price, change, change percent (all in cents, USD)
const QUOTES: &[(&str, &str, i64, i64, i64)] = &[
    ("AAPL", "Apple Inc.", 17543, 231, 133),
    ("GOOGL", "Alphabet Inc.", 284752, -1245, -44),
    ("MSFT", "Microsoft Corporation", 41478, 892, 220),
    ("TSLA", "Tesla, Inc.", 23845, -567, -232),
    ("NVDA", "NVIDIA Corporation", 87528, 2345, 275),
];

fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

/// Last-resort stock quotes used when no live source answers.
pub struct CannedQuotes {
    currency: Currency,
}

impl CannedQuotes {
    pub fn new(currency: Currency) -> Self {
        Self { currency }
    }

    #[cfg(test)]
    pub fn symbols() -> impl Iterator<Item = &'static str> {
        QUOTES.iter().map(|q| q.0)
    }
}

#[async_trait]
impl AssetProvider for CannedQuotes {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, id: &str) -> Result<AssetSnapshot, MarketDataError> {
        let symbol = id.trim().to_uppercase();
        let (sym, name, price, change, pct) = QUOTES
            .iter()
            .find(|q| q.0 == symbol)
            .ok_or_else(|| MarketDataError::NotFound(format!("no canned quote for {}", symbol)))?;
        let rate = self.currency.usd_rate();

        Ok(AssetSnapshot {
            id: sym.to_string(),
            symbol: sym.to_string(),
            name: name.to_string(),
            price: cents(*price) * rate,
            change: cents(*change) * rate,
            change_percent: cents(*pct),
            volume: None,
            market_cap: None,
            image: None,
            currency: self.currency,
            source: NAME.to_string(),
            updated_at: Utc::now(),
        })
    }
}

#[async_trait]
impl AssetSearcher for CannedQuotes {
    fn name(&self) -> &str {
        NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, MarketDataError> {
        let needle = query.trim().to_lowercase();
        Ok(QUOTES
            .iter()
            .filter(|(sym, name, ..)| {
                sym.to_lowercase().contains(&needle) || name.to_lowercase().contains(&needle)
            })
            .map(|(sym, name, ..)| SearchResult {
                id: sym.to_string(),
                symbol: sym.to_string(),
                name: name.to_string(),
                image: None,
            })
            .collect())
    }
}
