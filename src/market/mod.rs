pub mod coincap;
pub mod coingecko;
pub mod error;
pub mod fallback;
pub mod fixtures;
pub mod http;
pub mod provider;
pub mod refresh;
pub mod yahoo;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use error::MarketDataError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Stock,
    Crypto,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Crypto => "crypto",
        }
    }

    /// Identifiers are case-sensitive per kind: tickers upper, coin ids lower.
    pub fn normalize_id(self, raw: &str) -> String {
        let trimmed = raw.trim();
        match self {
            Self::Stock => trimmed.to_uppercase(),
            Self::Crypto => trimmed.to_lowercase(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Sek,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Sek => "sek",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Usd => "$",
            Self::Eur => "€",
            Self::Sek => "kr",
        }
    }

    /// Fixed conversion from USD for providers that only quote in USD.
    pub fn usd_rate(self) -> Decimal {
        match self {
            Self::Usd => Decimal::ONE,
            Self::Eur => Decimal::new(92, 2),
            Self::Sek => Decimal::new(1050, 2),
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Usd => Self::Eur,
            Self::Eur => Self::Sek,
            Self::Sek => Self::Usd,
        }
    }
}

impl FromStr for Currency {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::Usd),
            "eur" => Ok(Self::Eur),
            "sek" => Ok(Self::Sek),
            other => Err(MarketDataError::NotFound(format!("currency {}", other))),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The latest known price record for one asset, as shown by a panel.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssetSnapshot {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub volume: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub image: Option<String>,
    pub currency: Currency,
    /// Provider whose normalization produced this snapshot.
    pub source: String,
    pub updated_at: DateTime<Utc>,
}

impl AssetSnapshot {
    /// Merges a refresh payload. Fields the payload omits keep their
    /// previous value. A reported absolute change is taken as is, otherwise
    /// it follows the merged price and percent change.
    pub fn apply_update(&mut self, update: &SnapshotUpdate) {
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(pct) = update.change_percent {
            self.change_percent = pct;
        }
        if let Some(change) = update.change {
            self.change = change;
        } else if update.price.is_some() || update.change_percent.is_some() {
            self.change = (self.price * self.change_percent / Decimal::ONE_HUNDRED).round_dp(8);
        }
        if let Some(volume) = update.volume {
            self.volume = Some(volume);
        }
        if let Some(market_cap) = update.market_cap {
            self.market_cap = Some(market_cap);
        }
        self.updated_at = update.received_at;
    }

    pub fn is_up(&self) -> bool {
        self.change_percent >= Decimal::ZERO
    }

    pub fn price_f64(&self) -> f64 {
        self.price.to_f64().unwrap_or(0.0)
    }
}

/// Partial record produced by a refresh tick.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotUpdate {
    pub id: String,
    pub price: Option<Decimal>,
    pub change: Option<Decimal>,
    pub change_percent: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub source: String,
    pub received_at: DateTime<Utc>,
}

impl SnapshotUpdate {
    pub fn new(id: &str, source: &str) -> Self {
        Self {
            id: id.to_string(),
            price: None,
            change: None,
            change_percent: None,
            volume: None,
            market_cap: None,
            source: source.to_string(),
            received_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.price.is_none()
            && self.change.is_none()
            && self.change_percent.is_none()
            && self.volume.is_none()
            && self.market_cap.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendingAsset {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
    pub thumb: Option<String>,
    pub price_btc: Option<f64>,
}

/// Parses a provider decimal string, accepting scientific notation.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value)
}

/// "65.2B" style rendering used for market caps.
pub fn format_billions(value: Decimal) -> String {
    let billions = value / Decimal::from(1_000_000_000u64);
    format!("{:.1}B", billions.round_dp(1))
}

/// Thousands-separated integer rendering used for volumes.
pub fn format_grouped(value: Decimal) -> String {
    let rounded = value.round_dp(0).abs().to_string();
    let mut out = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value.is_sign_negative() && !value.is_zero() {
        out.insert(0, '-');
    }
    out
}
