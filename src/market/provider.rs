use crate::market::{AssetSnapshot, MarketDataError, SearchResult, SnapshotUpdate, TrendingAsset};
use async_trait::async_trait;

/// One upstream source that can produce a full snapshot for an identifier.
#[async_trait]
pub trait AssetProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self, id: &str) -> Result<AssetSnapshot, MarketDataError>;
}

/// A source for the lightweight periodic refresh. May return only some
/// fields.
#[async_trait]
pub trait PriceRefresher: Send + Sync {
    fn name(&self) -> &str;
    async fn refresh(&self, id: &str) -> Result<SnapshotUpdate, MarketDataError>;
}

#[async_trait]
pub trait AssetSearcher: Send + Sync {
    fn name(&self) -> &str;
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, MarketDataError>;
}

#[async_trait]
pub trait TrendingSource: Send + Sync {
    async fn trending(&self) -> Result<Vec<TrendingAsset>, MarketDataError>;
}
