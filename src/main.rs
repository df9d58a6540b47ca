mod app;
mod config;
mod forecast;
mod market;
mod model;
mod news;
mod panel;
mod portfolio;
mod strategies;
mod technical;
mod tui;
mod ui;

use app::App;
use clap::{Parser, ValueEnum};
use forecast::{Forecast, Horizon};
use market::fallback::ProviderChain;
use market::{AssetKind, Currency};
use model::{ModelConfig, ModelKind};
use panel::AssetPanel;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::prelude::ToPrimitive;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindChoice {
    Stock,
    Crypto,
}

impl From<KindChoice> for AssetKind {
    fn from(choice: KindChoice) -> Self {
        match choice {
            KindChoice::Stock => AssetKind::Stock,
            KindChoice::Crypto => AssetKind::Crypto,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "MarketDesk-TUI: live stock and crypto quotes with provider fallback and a synthetic forecast view",
    after_help = "EXAMPLES:
    # Launch the dashboard (logs go to stderr)
    cargo run --release 2>marketdesk.log

    # One-shot quote through the crypto provider chain
    cargo run --release -- --quote bitcoin --kind crypto

    # Stock quote converted to EUR
    cargo run --release -- --quote AAPL --kind stock --currency eur

    # Follow the 30 s refresh loop until Ctrl-C
    cargo run --release -- --watch ethereum --kind crypto

    # Synthetic 48 h forecast with a fixed seed
    cargo run --release -- --forecast TSLA --kind stock --hourly --seed 7 --model garch"
)]
struct Args {
    /// Fetch one snapshot through the provider chain and print it as JSON
    #[arg(long)]
    quote: Option<String>,

    /// Asset kind for --quote, --search, --forecast and --watch
    #[arg(long, value_enum, default_value_t = KindChoice::Crypto)]
    kind: KindChoice,

    /// Search assets by name or symbol
    #[arg(long)]
    search: Option<String>,

    /// List trending crypto assets
    #[arg(long)]
    trending: bool,

    /// Print a synthetic forecast with BUY/SELL markers for this asset
    #[arg(long)]
    forecast: Option<String>,

    /// Use the 48-hour horizon for --forecast instead of 30 days
    #[arg(long)]
    hourly: bool,

    /// Seed for --forecast, for reproducible paths
    #[arg(long)]
    seed: Option<u64>,

    /// Model shown with --forecast (arma|arima|sarima|garch)
    #[arg(long, default_value = "arima")]
    model: String,

    /// Model parameter override, KEY=VALUE. May be repeated.
    #[arg(long = "param")]
    params: Vec<String>,

    /// Select an asset and log every merged refresh until Ctrl-C
    #[arg(long)]
    watch: Option<String>,

    /// Display currency (usd|eur|sek). Defaults to MARKETDESK_CURRENCY or usd.
    #[arg(long)]
    currency: Option<Currency>,

    /// Print the demo portfolio report
    #[arg(long)]
    portfolio: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let one_shot = args.quote.is_some()
        || args.search.is_some()
        || args.trending
        || args.forecast.is_some()
        || args.watch.is_some()
        || args.portfolio;

    // the dashboard owns the terminal, so it stays quiet unless RUST_LOG asks otherwise
    let default_filter = if one_shot { "marketdesk_tui=info" } else { "off" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let currency = args.currency.unwrap_or_else(config::configured_currency);
    let kind = AssetKind::from(args.kind);

    if args.portfolio {
        portfolio::print_overview(&portfolio::PortfolioOverview::default());
        return Ok(());
    }

    if let Some(ref id) = args.quote {
        let chain = ProviderChain::for_kind(kind, config::configured_endpoints(), currency);
        info!("Provider order: {}", chain.fetcher_names().join(" -> "));
        match chain.fetch(&kind.normalize_id(id)).await {
            Ok(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            Err(e) => error!("{} ({})", config::ALL_PROVIDERS_FAILED_MSG, e),
        }
        return Ok(());
    }

    if let Some(ref query) = args.search {
        let chain = ProviderChain::for_kind(kind, config::configured_endpoints(), currency);
        let results = chain.search(query).await;
        if results.is_empty() {
            info!("No {} matches for '{}'", kind.as_str(), query);
        }
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if args.trending {
        let chain = ProviderChain::for_kind(AssetKind::Crypto, config::configured_endpoints(), currency);
        match chain.trending().await {
            Ok(trending) => println!("{}", serde_json::to_string_pretty(&trending)?),
            Err(e) => error!("Trending fetch failed: {}", e),
        }
        return Ok(());
    }

    if let Some(ref id) = args.forecast {
        let mut model = ModelConfig::new(args.model.parse::<ModelKind>()?);
        for param in &args.params {
            let Some((key, value)) = param.split_once('=') else {
                anyhow::bail!("--param expects KEY=VALUE, got '{}'", param);
            };
            model.set_param(key.trim(), value)?;
        }
        run_forecast(kind, id, currency, &model, args.hourly, args.seed).await?;
        return Ok(());
    }

    if let Some(ref id) = args.watch {
        watch(kind, id, currency).await;
        return Ok(());
    }

    let mut terminal = tui::init()?;
    let mut app = App::new(currency);
    let res = app.run(&mut terminal).await;

    tui::restore()?;

    if let Err(e) = res {
        error!("Error: {:?}", e);
    }

    Ok(())
}

async fn run_forecast(
    kind: AssetKind,
    id: &str,
    currency: Currency,
    model: &ModelConfig,
    hourly: bool,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let chain = ProviderChain::for_kind(kind, config::configured_endpoints(), currency);
    let price = match chain.fetch(&kind.normalize_id(id)).await {
        Ok(snapshot) => snapshot.price.to_f64(),
        Err(e) => {
            warn!("No live price for {} ({}), using a synthetic base", id, e);
            None
        }
    };

    let horizon = if hourly { Horizon::Hourly } else { Horizon::Daily };
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let forecast = Forecast::generate(horizon, price, chrono::Local::now(), &mut rng);

    info!(
        "{} forecast for {} from {}{:.2}",
        model.summary(),
        id,
        currency.symbol(),
        forecast.base_price
    );
    println!("{:<10} {:>16} {:>12} {:>9} {:>6}", "When", "At", "Price", "Change", "Conf");
    for row in forecast.prediction_rows() {
        println!(
            "{:<10} {:>16} {:>12.2} {:>+8.2}% {:>5.0}%",
            row.label,
            row.at.format("%Y-%m-%d %H:%M").to_string(),
            row.price,
            row.change_pct,
            row.confidence * 100.0
        );
    }
    println!();
    for signal in &forecast.signals {
        println!(
            "{:<4} {:>12.2} at {}  ({:.0}%) {}",
            signal.kind.as_str(),
            signal.price,
            signal.at.format("%Y-%m-%d %H:%M"),
            signal.confidence * 100.0,
            signal.reason
        );
    }
    if let Some(last) = forecast.last() {
        let pct = (last.price - forecast.base_price) / forecast.base_price * 100.0;
        println!("\nEnd of horizon: {:.2} ({:+.2}% vs base)", last.price, pct);
    }
    Ok(())
}

async fn watch(kind: AssetKind, id: &str, currency: Currency) {
    let mut panel = AssetPanel::for_kind(kind, currency);
    panel.on_snapshot(Box::new(|snapshot: &market::AssetSnapshot| {
        info!("Now watching {} ({}) via {}", snapshot.name, snapshot.symbol, snapshot.source);
    }));

    if let Err(e) = panel.select(id).await {
        error!("{} ({})", config::ALL_PROVIDERS_FAILED_MSG, e);
        return;
    }
    if let Some(snapshot) = panel.snapshot() {
        info!("{} {}{:.2} ({:+.2}%)", snapshot.symbol, currency.symbol(), snapshot.price, snapshot.change_percent);
    }

    loop {
        tokio::select! {
            update = panel.next_update() => match update {
                Some(snapshot) => info!(
                    "{} {}{:.2} ({:+.2}%)",
                    snapshot.symbol,
                    currency.symbol(),
                    snapshot.price,
                    snapshot.change_percent
                ),
                None => {
                    warn!("Refresh loop for {} stopped", id);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch on {}", id);
                break;
            }
        }
    }
    panel.stop_refresh();
}
