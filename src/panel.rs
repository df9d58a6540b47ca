use crate::config::{ALL_PROVIDERS_FAILED_MSG, configured_endpoints, refresh_interval};
use crate::market::fallback::ProviderChain;
use crate::market::refresh::{RefreshHandle, spawn_refresh};
use crate::market::{AssetKind, AssetSnapshot, Currency, MarketDataError, SearchResult, SnapshotUpdate, TrendingAsset};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::time::Duration;
use tracing::{debug, error, info};

const UPDATE_CHANNEL_CAPACITY: usize = 16;

pub type SnapshotListener = Box<dyn FnMut(&AssetSnapshot) + Send>;

/// Selection state for one asset kind: the chosen identifier, its latest
/// snapshot and the background refresh keeping it current.
pub struct AssetPanel {
    chain: ProviderChain,
    selected: Option<String>,
    snapshot: Option<AssetSnapshot>,
    error: Option<String>,
    search_results: Vec<SearchResult>,
    trending: Vec<TrendingAsset>,
    listener: Option<SnapshotListener>,
    refresh: Option<RefreshHandle>,
    refresh_period: Duration,
    updates_tx: Sender<SnapshotUpdate>,
    updates_rx: Receiver<SnapshotUpdate>,
}

impl AssetPanel {
    pub fn new(chain: ProviderChain) -> Self {
        let (updates_tx, updates_rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            chain,
            selected: None,
            snapshot: None,
            error: None,
            search_results: Vec::new(),
            trending: Vec::new(),
            listener: None,
            refresh: None,
            refresh_period: refresh_interval(),
            updates_tx,
            updates_rx,
        }
    }

    /// Panel wired to the live provider chain for `kind`.
    pub fn for_kind(kind: AssetKind, currency: Currency) -> Self {
        Self::new(ProviderChain::for_kind(kind, configured_endpoints(), currency))
    }

    #[cfg(test)]
    pub fn with_refresh_period(mut self, period: Duration) -> Self {
        self.refresh_period = period;
        self
    }

    pub fn on_snapshot(&mut self, listener: SnapshotListener) {
        self.listener = Some(listener);
    }

    pub fn kind(&self) -> AssetKind {
        self.chain.kind()
    }

    pub fn currency(&self) -> Currency {
        self.chain.currency()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn snapshot(&self) -> Option<&AssetSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.as_ref().is_some_and(RefreshHandle::is_running)
    }

    pub fn search_results(&self) -> &[SearchResult] {
        &self.search_results
    }

    pub fn trending(&self) -> &[TrendingAsset] {
        &self.trending
    }

    /// Runs the fetch chain for `raw_id`. On success the snapshot and
    /// selection are replaced and the refresh loop is re-armed for the new
    /// identifier. On failure everything shown before stays as it was.
    pub async fn select(&mut self, raw_id: &str) -> Result<(), MarketDataError> {
        let id = self.kind().normalize_id(raw_id);
        match self.chain.fetch(&id).await {
            Ok(snapshot) => {
                self.show(id, snapshot);
                Ok(())
            }
            Err(e) => Err(self.fetch_failed(&id, e)),
        }
    }

    fn show(&mut self, id: String, snapshot: AssetSnapshot) {
        info!(
            "Selected {} {} at {}{} via {}",
            self.kind().as_str(),
            id,
            snapshot.currency.symbol(),
            snapshot.price,
            snapshot.source
        );
        self.error = None;
        self.selected = Some(id.clone());
        self.search_results.clear();
        if let Some(listener) = self.listener.as_mut() {
            listener(&snapshot);
        }
        self.snapshot = Some(snapshot);
        self.arm_refresh(id);
    }

    fn fetch_failed(&mut self, id: &str, e: MarketDataError) -> MarketDataError {
        error!("Fetching {} failed: {}", id, e);
        self.error = Some(ALL_PROVIDERS_FAILED_MSG.to_string());
        e
    }

    fn arm_refresh(&mut self, id: String) {
        // the previous loop must be gone before a new one starts
        if let Some(mut handle) = self.refresh.take() {
            handle.cancel();
        }
        self.refresh = Some(spawn_refresh(
            self.chain.clone(),
            id,
            self.refresh_period,
            self.updates_tx.clone(),
        ));
    }

    pub fn stop_refresh(&mut self) {
        self.refresh = None;
    }

    /// Merges an update into the current snapshot. Returns false when the
    /// update belongs to an identifier that is no longer selected.
    pub fn apply_update(&mut self, update: &SnapshotUpdate) -> bool {
        if self.selected.as_deref() != Some(update.id.as_str()) {
            debug!("Dropping stale update for {}", update.id);
            return false;
        }
        match self.snapshot.as_mut() {
            Some(snapshot) => {
                snapshot.apply_update(update);
                true
            }
            None => false,
        }
    }

    /// Applies every refresh update received since the last call.
    pub fn drain_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.updates_rx.try_recv() {
            if self.apply_update(&update) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for the next refresh update and merges it.
    pub async fn next_update(&mut self) -> Option<&AssetSnapshot> {
        loop {
            let update = self.updates_rx.recv().await?;
            if self.apply_update(&update) {
                return self.snapshot.as_ref();
            }
        }
    }

    /// Switches the display currency. Rebuilds the chain and refetches the
    /// current selection, since amounts are converted by the providers.
    pub async fn set_currency(&mut self, currency: Currency) -> Result<(), MarketDataError> {
        if currency == self.currency() {
            return Ok(());
        }
        self.set_chain(ProviderChain::for_kind(self.kind(), configured_endpoints(), currency))
            .await
    }

    /// Installs `chain` once it has produced a snapshot for the current
    /// selection. If that fetch fails the old chain, snapshot and refresh
    /// loop stay in place.
    pub async fn set_chain(&mut self, chain: ProviderChain) -> Result<(), MarketDataError> {
        let Some(id) = self.selected.clone() else {
            self.chain = chain;
            return Ok(());
        };
        match chain.fetch(&id).await {
            Ok(snapshot) => {
                self.chain = chain;
                self.show(id, snapshot);
                Ok(())
            }
            Err(e) => Err(self.fetch_failed(&id, e)),
        }
    }

    pub async fn search(&mut self, query: &str) -> &[SearchResult] {
        self.search_results = self.chain.search(query).await;
        &self.search_results
    }

    pub fn clear_search(&mut self) {
        self.search_results.clear();
    }

    pub async fn load_trending(&mut self) -> Result<&[TrendingAsset], MarketDataError> {
        self.trending = self.chain.trending().await?;
        Ok(&self.trending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::fallback::scripted::Scripted;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};
    use tokio::time::timeout;

    fn panel(fetchers: Vec<Arc<Scripted>>, refreshers: Vec<Arc<Scripted>>) -> AssetPanel {
        let mut chain = ProviderChain::new(AssetKind::Crypto, Currency::Usd);
        for f in fetchers {
            chain = chain.with_fetcher(f);
        }
        for r in refreshers {
            chain = chain.with_refresher(r);
        }
        AssetPanel::new(chain).with_refresh_period(Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_select_uses_second_provider_after_500() {
        let panel_events = Arc::new(Mutex::new(Vec::new()));
        let seen = panel_events.clone();
        let mut panel = panel(
            vec![Scripted::new("p1", vec![None]), Scripted::new("p2", vec![Some(dec!(65000))])],
            vec![],
        );
        panel.on_snapshot(Box::new(move |snap: &AssetSnapshot| seen.lock().unwrap().push(snap.price)));

        panel.select("Bitcoin").await.unwrap();
        assert_eq!(panel.selected(), Some("bitcoin"));
        assert_eq!(panel.snapshot().unwrap().price, dec!(65000));
        assert_eq!(panel.snapshot().unwrap().source, "p2");
        assert!(panel.error().is_none());
        assert!(panel.is_refreshing());
        assert_eq!(*panel_events.lock().unwrap(), vec![dec!(65000)]);
    }

    #[tokio::test]
    async fn test_failed_select_keeps_previous_snapshot() {
        let provider = Scripted::new("only", vec![Some(dec!(100)), None]);
        let mut panel = panel(vec![provider], vec![]);
        panel.select("bitcoin").await.unwrap();
        let before = panel.snapshot().cloned();

        let err = panel.select("doesnotexist123").await.unwrap_err();
        assert!(matches!(err, MarketDataError::NoProviderAvailable { .. }));
        assert!(panel.error().unwrap().starts_with("Unable to fetch data"));
        assert_eq!(panel.error(), Some(ALL_PROVIDERS_FAILED_MSG));
        assert_eq!(panel.selected(), Some("bitcoin"));
        assert_eq!(panel.snapshot().cloned(), before);
    }

    #[tokio::test]
    async fn test_refresh_merges_and_keeps_market_cap() {
        let fetcher = Scripted::new("fetch", vec![Some(dec!(100))]);
        let refresher = Scripted::new("refresh", vec![Some(dec!(110))]);
        let mut panel = panel(vec![fetcher], vec![refresher]);
        panel.select("bitcoin").await.unwrap();

        let snap = timeout(Duration::from_secs(2), panel.next_update())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snap.price, dec!(110));
        assert_eq!(snap.market_cap, Some(dec!(1000000000)));
        assert_eq!(snap.source, "fetch");
    }

    #[tokio::test]
    async fn test_updates_for_other_ids_are_dropped() {
        let mut panel = panel(vec![Scripted::new("fetch", vec![Some(dec!(100))])], vec![]);
        panel.select("ethereum").await.unwrap();

        let mut stale = SnapshotUpdate::new("bitcoin", "late");
        stale.price = Some(dec!(1));
        assert!(!panel.apply_update(&stale));
        assert_eq!(panel.snapshot().unwrap().price, dec!(100));

        let mut fresh = SnapshotUpdate::new("ethereum", "now");
        fresh.price = Some(dec!(120));
        assert!(panel.apply_update(&fresh));
        assert_eq!(panel.snapshot().unwrap().price, dec!(120));
    }

    #[tokio::test]
    async fn test_reselect_rearms_refresh() {
        let fetcher = Scripted::new("fetch", vec![Some(dec!(5))]);
        let mut panel = panel(vec![fetcher], vec![]);
        panel.select("solana").await.unwrap();
        panel.select("cardano").await.unwrap();
        assert_eq!(panel.selected(), Some("cardano"));
        assert!(panel.is_refreshing());
        panel.stop_refresh();
        assert!(!panel.is_refreshing());
        assert_eq!(panel.drain_updates(), 0);
    }

    #[tokio::test]
    async fn test_failed_currency_switch_keeps_old_chain_and_refresh() {
        let mut panel = panel(vec![Scripted::new("usd-feed", vec![Some(dec!(100))])], vec![]);
        panel.select("bitcoin").await.unwrap();
        let before = panel.snapshot().cloned();

        let eur = ProviderChain::new(AssetKind::Crypto, Currency::Eur)
            .with_fetcher(Scripted::new("eur-feed", vec![None]));
        let err = panel.set_chain(eur).await.unwrap_err();

        assert!(matches!(err, MarketDataError::NoProviderAvailable { .. }));
        assert_eq!(panel.currency(), Currency::Usd);
        assert_eq!(panel.snapshot().cloned(), before);
        assert_eq!(panel.error(), Some(ALL_PROVIDERS_FAILED_MSG));
        assert!(panel.is_refreshing());
        assert_eq!(panel.snapshot().unwrap().source, "usd-feed");
    }

    #[tokio::test]
    async fn test_currency_switch_refetches_with_new_chain() {
        let mut panel = panel(vec![Scripted::new("usd-feed", vec![Some(dec!(100))])], vec![]);
        panel.select("bitcoin").await.unwrap();

        let eur = ProviderChain::new(AssetKind::Crypto, Currency::Eur)
            .with_fetcher(Scripted::new("eur-feed", vec![Some(dec!(92))]));
        panel.set_chain(eur).await.unwrap();

        assert_eq!(panel.currency(), Currency::Eur);
        assert_eq!(panel.selected(), Some("bitcoin"));
        assert_eq!(panel.snapshot().unwrap().price, dec!(92));
        assert_eq!(panel.snapshot().unwrap().source, "eur-feed");
        assert!(panel.error().is_none());
        assert!(panel.is_refreshing());
    }

    #[tokio::test]
    async fn test_set_chain_without_selection_only_swaps() {
        let mut panel = panel(vec![], vec![]);
        let eur = ProviderChain::new(AssetKind::Crypto, Currency::Eur)
            .with_fetcher(Scripted::new("eur-feed", vec![None]));
        panel.set_chain(eur).await.unwrap();
        assert_eq!(panel.currency(), Currency::Eur);
        assert!(panel.snapshot().is_none());
        assert!(!panel.is_refreshing());
    }
}
