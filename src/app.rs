use crate::config::{CRYPTO_CATEGORIES, DEFAULT_CRYPTO, DEFAULT_STOCK, STOCK_WATCHLIST};
use crate::forecast::{Forecast, Horizon};
use crate::market::{AssetKind, AssetSnapshot, Currency};
use crate::model::{ModelConfig, StopLoss};
use crate::news::NewsFeed;
use crate::panel::AssetPanel;
use crate::portfolio::PortfolioOverview;
use crate::strategies::StrategyBoard;
use crate::technical::AnalysisSummary;
use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io;
use tokio::sync::mpsc::{self, Receiver};
use tracing::{info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 16;

pub enum AppState {
    Browsing,
    Searching,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MainTab {
    Analysis,
    Predictions,
    News,
    Portfolio,
    Strategies,
}

impl MainTab {
    pub const ALL: [MainTab; 5] = [
        MainTab::Analysis,
        MainTab::Predictions,
        MainTab::News,
        MainTab::Portfolio,
        MainTab::Strategies,
    ];

    pub fn title(self) -> &'static str {
        match self {
            MainTab::Analysis => "Analysis",
            MainTab::Predictions => "Predictions",
            MainTab::News => "News",
            MainTab::Portfolio => "Portfolio",
            MainTab::Strategies => "Strategies",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn shifted(self, by: isize) -> Self {
        let len = Self::ALL.len() as isize;
        let idx = (self.index() as isize + by).rem_euclid(len);
        Self::ALL[idx as usize]
    }
}

/// Network work queued by a key press. The run loop draws once before
/// awaiting it so the loading line is on screen while providers respond.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingFetch {
    Select(String),
    Search(String),
    Trending,
    Currency(Currency),
}

impl PendingFetch {
    pub fn label(&self) -> String {
        match self {
            PendingFetch::Select(id) => format!("Loading {}...", id),
            PendingFetch::Search(query) => format!("Searching '{}'...", query),
            PendingFetch::Trending => "Loading trending...".to_string(),
            PendingFetch::Currency(currency) => format!("Converting to {}...", currency.code()),
        }
    }
}

/// Notifications from the panels to the app loop.
pub enum AppEvent {
    Selected(AssetKind, AssetSnapshot),
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub kind: AssetKind,
    pub tab: MainTab,
    pub input: String,
    pub stocks: AssetPanel,
    pub crypto: AssetPanel,
    pub currency: Currency,
    pub category: usize,
    pub pick_cursor: usize,
    pub result_cursor: usize,
    pub model: ModelConfig,
    pub stop_loss: StopLoss,
    pub strategies: StrategyBoard,
    pub strategy_cursor: usize,
    pub portfolio: PortfolioOverview,
    pub analysis: AnalysisSummary,
    pub horizon: Horizon,
    pub forecast: Option<Forecast>,
    pub news: NewsFeed,
    pub status: Option<String>,
    pub pending: Option<PendingFetch>,
    events_rx: Receiver<AppEvent>,
    rng: StdRng,
}

impl App {
    pub fn new(currency: Currency) -> Self {
        Self::with_panels(
            AssetPanel::for_kind(AssetKind::Stock, currency),
            AssetPanel::for_kind(AssetKind::Crypto, currency),
            currency,
        )
    }

    pub fn with_panels(mut stocks: AssetPanel, mut crypto: AssetPanel, currency: Currency) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        for panel in [&mut stocks, &mut crypto] {
            let tx = events_tx.clone();
            let kind = panel.kind();
            panel.on_snapshot(Box::new(move |snapshot: &AssetSnapshot| {
                let _ = tx.try_send(AppEvent::Selected(kind, snapshot.clone()));
            }));
        }

        Self {
            should_quit: false,
            state: AppState::Browsing,
            kind: AssetKind::Stock,
            tab: MainTab::Analysis,
            input: String::new(),
            stocks,
            crypto,
            currency,
            category: 0,
            pick_cursor: 0,
            result_cursor: 0,
            model: ModelConfig::default(),
            stop_loss: StopLoss::default(),
            strategies: StrategyBoard::default(),
            strategy_cursor: 0,
            portfolio: PortfolioOverview::default(),
            analysis: AnalysisSummary::default(),
            horizon: Horizon::Daily,
            forecast: None,
            news: NewsFeed::for_asset(AssetKind::Stock, DEFAULT_STOCK),
            status: None,
            pending: None,
            events_rx,
            rng: StdRng::from_entropy(),
        }
    }

    #[cfg(test)]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn active_panel(&self) -> &AssetPanel {
        match self.kind {
            AssetKind::Stock => &self.stocks,
            AssetKind::Crypto => &self.crypto,
        }
    }

    fn active_panel_mut(&mut self) -> &mut AssetPanel {
        match self.kind {
            AssetKind::Stock => &mut self.stocks,
            AssetKind::Crypto => &mut self.crypto,
        }
    }

    /// Quick-pick identifiers for the active kind.
    pub fn picks(&self) -> &'static [&'static str] {
        match self.kind {
            AssetKind::Stock => STOCK_WATCHLIST,
            AssetKind::Crypto => CRYPTO_CATEGORIES
                .get(self.category)
                .map(|(_, ids)| *ids)
                .unwrap_or(&[]),
        }
    }

    pub fn category_name(&self) -> &'static str {
        CRYPTO_CATEGORIES.get(self.category).map(|(name, _)| *name).unwrap_or("")
    }

    pub async fn run(&mut self, terminal: &mut crate::tui::Tui) -> io::Result<()> {
        terminal.draw(|f| crate::ui::render(f, self))?;
        self.bootstrap().await;

        while !self.should_quit {
            self.stocks.drain_updates();
            self.crypto.drain_updates();
            self.drain_events();

            terminal.draw(|f| crate::ui::render(f, self))?;

            if event::poll(std::time::Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            if self.pending.is_some() {
                terminal.draw(|f| crate::ui::render(f, self))?;
                self.run_pending().await;
            }
        }
        Ok(())
    }

    /// Initial selections for both panels plus the trending list.
    pub async fn bootstrap(&mut self) {
        if let Err(e) = self.stocks.select(DEFAULT_STOCK).await {
            warn!("Initial stock fetch failed: {}", e);
        }
        if let Err(e) = self.crypto.select(DEFAULT_CRYPTO).await {
            warn!("Initial crypto fetch failed: {}", e);
        }
        if let Err(e) = self.crypto.load_trending().await {
            warn!("Trending fetch failed: {}", e);
        }
        self.drain_events();
        self.refresh_derived();
    }

    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::Selected(kind, snapshot) => {
                    info!("{} panel now shows {} ({})", kind.as_str(), snapshot.symbol, snapshot.source);
                    if kind == self.kind {
                        self.refresh_derived();
                    }
                }
            }
        }
    }

    /// Rebuilds the forecast and news for whatever the active panel shows.
    pub fn refresh_derived(&mut self) {
        let panel = self.active_panel();
        let asset = panel
            .selected()
            .map(str::to_string)
            .unwrap_or_else(|| match self.kind {
                AssetKind::Stock => DEFAULT_STOCK.to_string(),
                AssetKind::Crypto => DEFAULT_CRYPTO.to_string(),
            });
        let price = panel.snapshot().map(AssetSnapshot::price_f64);

        self.news = NewsFeed::for_asset(self.kind, &asset);
        self.regenerate_forecast(price);
    }

    fn regenerate_forecast(&mut self, price: Option<f64>) {
        self.forecast = if self.model.enabled {
            Some(Forecast::generate(self.horizon, price, Local::now(), &mut self.rng))
        } else {
            None
        };
    }

    fn current_price(&self) -> Option<f64> {
        self.active_panel().snapshot().map(AssetSnapshot::price_f64)
    }

    fn queue(&mut self, fetch: PendingFetch) {
        self.status = Some(fetch.label());
        self.pending = Some(fetch);
    }

    /// Awaits the fetch queued by the last key press, if any.
    pub async fn run_pending(&mut self) {
        let Some(fetch) = self.pending.take() else {
            return;
        };
        self.status = None;
        match fetch {
            PendingFetch::Select(id) => self.select_active(&id).await,
            PendingFetch::Search(query) => {
                let found = self.active_panel_mut().search(&query).await.len();
                self.result_cursor = 0;
                if found == 0 {
                    // tickers and coin ids can be typed directly
                    self.select_active(&query).await;
                }
            }
            PendingFetch::Trending => {
                if let Err(e) = self.crypto.load_trending().await {
                    warn!("Trending fetch failed: {}", e);
                    self.status = Some("Trending list unavailable".to_string());
                }
            }
            PendingFetch::Currency(currency) => self.switch_currency(currency).await,
        }
    }

    async fn select_active(&mut self, id: &str) {
        // on failure the panel carries the user-facing message
        if self.active_panel_mut().select(id).await.is_ok() {
            self.state = AppState::Browsing;
            self.input.clear();
        }
        self.drain_events();
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match self.state {
            AppState::Searching => self.handle_search_key(key),
            AppState::Browsing => self.handle_browse_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.state = AppState::Browsing;
                self.input.clear();
                self.active_panel_mut().clear_search();
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                self.result_cursor = 0;
                self.active_panel_mut().clear_search();
            }
            KeyCode::Backspace => {
                self.input.pop();
                self.result_cursor = 0;
                self.active_panel_mut().clear_search();
            }
            KeyCode::Up => self.result_cursor = self.result_cursor.saturating_sub(1),
            KeyCode::Down => {
                let len = self.active_panel().search_results().len();
                if self.result_cursor + 1 < len {
                    self.result_cursor += 1;
                }
            }
            KeyCode::Enter => {
                let picked = self
                    .active_panel()
                    .search_results()
                    .get(self.result_cursor)
                    .map(|r| r.id.clone());
                if let Some(id) = picked {
                    self.queue(PendingFetch::Select(id));
                    return;
                }

                let query = self.input.trim().to_string();
                if !query.is_empty() {
                    self.queue(PendingFetch::Search(query));
                }
            }
            _ => {}
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.tab = self.tab.shifted(1),
            KeyCode::BackTab => self.tab = self.tab.shifted(-1),
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                self.tab = MainTab::ALL[idx];
            }
            KeyCode::Char('s') => {
                self.kind = match self.kind {
                    AssetKind::Stock => AssetKind::Crypto,
                    AssetKind::Crypto => AssetKind::Stock,
                };
                self.pick_cursor = 0;
                self.refresh_derived();
            }
            KeyCode::Char('/') => {
                self.state = AppState::Searching;
                self.input.clear();
                self.result_cursor = 0;
            }
            KeyCode::Left => self.pick_cursor = self.pick_cursor.saturating_sub(1),
            KeyCode::Right => {
                if self.pick_cursor + 1 < self.picks().len() {
                    self.pick_cursor += 1;
                }
            }
            KeyCode::Char('[') if self.kind == AssetKind::Crypto => {
                let len = CRYPTO_CATEGORIES.len();
                self.category = (self.category + len - 1) % len;
                self.pick_cursor = 0;
            }
            KeyCode::Char(']') if self.kind == AssetKind::Crypto => {
                self.category = (self.category + 1) % CRYPTO_CATEGORIES.len();
                self.pick_cursor = 0;
            }
            KeyCode::Enter => {
                if let Some(id) = self.picks().get(self.pick_cursor) {
                    self.queue(PendingFetch::Select(id.to_string()));
                }
            }
            KeyCode::Char('r') => {
                if let Some(id) = self.active_panel().selected().map(str::to_string) {
                    self.queue(PendingFetch::Select(id));
                }
            }
            KeyCode::Char('t') => self.queue(PendingFetch::Trending),
            KeyCode::Char('c') => self.queue(PendingFetch::Currency(self.currency.next())),
            KeyCode::Char('m') => {
                self.model.set_kind(self.model.kind.next());
                self.regenerate_forecast(self.current_price());
            }
            KeyCode::Char('e') => {
                self.model.toggle();
                self.regenerate_forecast(self.current_price());
            }
            KeyCode::Char('h') => {
                self.horizon = match self.horizon {
                    Horizon::Daily => Horizon::Hourly,
                    Horizon::Hourly => Horizon::Daily,
                };
                self.regenerate_forecast(self.current_price());
            }
            KeyCode::Char('g') => self.regenerate_forecast(self.current_price()),
            KeyCode::Char('+') | KeyCode::Char('=') => self.stop_loss.adjust(1),
            KeyCode::Char('-') => self.stop_loss.adjust(-1),
            KeyCode::Char('x') => self.stop_loss.enabled = !self.stop_loss.enabled,
            KeyCode::Char('w') => self.stop_loss.trailing = !self.stop_loss.trailing,
            KeyCode::Up if self.tab == MainTab::Strategies => {
                self.strategy_cursor = self.strategy_cursor.saturating_sub(1);
            }
            KeyCode::Down if self.tab == MainTab::Strategies => {
                if self.strategy_cursor + 1 < self.strategies.strategies().len() {
                    self.strategy_cursor += 1;
                }
            }
            KeyCode::Char(' ') if self.tab == MainTab::Strategies => {
                self.strategies.toggle_at(self.strategy_cursor);
            }
            _ => {}
        }
    }

    async fn switch_currency(&mut self, next: Currency) {
        self.currency = next;
        info!("Switching display currency to {}", next.code());
        for panel in [&mut self.stocks, &mut self.crypto] {
            if let Err(e) = panel.set_currency(next).await {
                warn!("Refetch after currency change failed: {}", e);
            }
        }
        self.drain_events();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::fallback::ProviderChain;
    use crate::market::fallback::scripted::Scripted;
    use crossterm::event::KeyModifiers;
    use rust_decimal_macros::dec;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn press(app: &mut App, code: KeyCode) {
        app.handle_key(key(code));
        app.run_pending().await;
    }

    fn app(stock_price: Option<rust_decimal::Decimal>) -> App {
        let stocks = AssetPanel::new(
            ProviderChain::new(AssetKind::Stock, Currency::Usd)
                .with_fetcher(Scripted::new("stock-feed", vec![stock_price])),
        );
        let crypto = AssetPanel::new(
            ProviderChain::new(AssetKind::Crypto, Currency::Usd)
                .with_fetcher(Scripted::new("coin-feed", vec![Some(dec!(65000))])),
        );
        App::with_panels(stocks, crypto, Currency::Usd).with_seed(42)
    }

    #[tokio::test]
    async fn test_tab_navigation() {
        let mut app = app(Some(dec!(100)));
        press(&mut app, KeyCode::Tab).await;
        assert_eq!(app.tab, MainTab::Predictions);
        press(&mut app, KeyCode::BackTab).await;
        press(&mut app, KeyCode::BackTab).await;
        assert_eq!(app.tab, MainTab::Strategies);
        press(&mut app, KeyCode::Char('3')).await;
        assert_eq!(app.tab, MainTab::News);
    }

    #[tokio::test]
    async fn test_pick_selects_and_regenerates_forecast() {
        let mut app = app(Some(dec!(100)));
        press(&mut app, KeyCode::Char('s')).await;
        assert_eq!(app.kind, AssetKind::Crypto);
        press(&mut app, KeyCode::Enter).await;

        assert_eq!(app.crypto.selected(), Some("bitcoin"));
        let forecast = app.forecast.as_ref().unwrap();
        assert_eq!(forecast.base_price, 65000.0);
        assert!(app.news.items[0].title.starts_with("BITCOIN"));
    }

    #[tokio::test]
    async fn test_failed_selection_shows_panel_message() {
        let mut app = app(None);
        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.stocks.selected(), None);
        assert!(app.stocks.error().unwrap().starts_with("Unable to fetch data"));
    }

    #[tokio::test]
    async fn test_search_falls_back_to_direct_selection() {
        let mut app = app(Some(dec!(10)));
        press(&mut app, KeyCode::Char('/')).await;
        for c in "ibm".chars() {
            press(&mut app, KeyCode::Char(c)).await;
        }
        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.stocks.selected(), Some("IBM"));
        assert!(matches!(app.state, AppState::Browsing));
        assert!(app.input.is_empty());
    }

    #[tokio::test]
    async fn test_model_toggle_clears_forecast() {
        let mut app = app(Some(dec!(100)));
        app.refresh_derived();
        assert!(app.forecast.is_some());
        press(&mut app, KeyCode::Char('e')).await;
        assert!(app.forecast.is_none());
        press(&mut app, KeyCode::Char('m')).await;
        assert_eq!(app.model.kind, crate::model::ModelKind::Sarima);
        assert!(app.forecast.is_none());
    }

    #[tokio::test]
    async fn test_strategy_and_stop_loss_keys() {
        let mut app = app(Some(dec!(100)));
        press(&mut app, KeyCode::Char('5')).await;
        press(&mut app, KeyCode::Down).await;
        press(&mut app, KeyCode::Down).await;
        press(&mut app, KeyCode::Char(' ')).await;
        assert!(app.strategies.strategies()[2].enabled);

        press(&mut app, KeyCode::Char('+')).await;
        assert_eq!(app.stop_loss.percent(), 6);
        press(&mut app, KeyCode::Char('w')).await;
        assert!(app.stop_loss.trailing);
    }

    #[tokio::test]
    async fn test_selection_is_queued_until_run_pending() {
        let mut app = app(Some(dec!(100)));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.pending, Some(PendingFetch::Select("AAPL".to_string())));
        assert_eq!(app.status.as_deref(), Some("Loading AAPL..."));
        assert_eq!(app.stocks.selected(), None);

        app.run_pending().await;
        assert!(app.pending.is_none());
        assert!(app.status.is_none());
        assert_eq!(app.stocks.selected(), Some("AAPL"));
    }
}
