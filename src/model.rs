use anyhow::{Result, bail};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Displayed next to the model selector. The forecast is synthetic, so
/// these never change.
pub const MODEL_ACCURACY_PCT: f64 = 84.2;
pub const MODEL_R_SQUARED: f64 = 0.741;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ModelKind {
    Arma,
    Arima,
    Sarima,
    Garch,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [ModelKind::Arma, ModelKind::Arima, ModelKind::Sarima, ModelKind::Garch];

    pub fn label(self) -> &'static str {
        match self {
            ModelKind::Arma => "ARMA",
            ModelKind::Arima => "ARIMA",
            ModelKind::Sarima => "SARIMA",
            ModelKind::Garch => "GARCH",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ModelKind::Arma => "AutoRegressive Moving Average",
            ModelKind::Arima => "AutoRegressive Integrated MA",
            ModelKind::Sarima => "Seasonal ARIMA",
            ModelKind::Garch => "Generalized ARCH",
        }
    }

    pub fn default_params(self) -> Vec<(&'static str, u32)> {
        match self {
            ModelKind::Arma => vec![("p", 1), ("q", 1)],
            ModelKind::Arima => vec![("p", 1), ("d", 1), ("q", 1)],
            ModelKind::Sarima => vec![
                ("p", 1),
                ("d", 1),
                ("q", 1),
                ("P", 1),
                ("D", 1),
                ("Q", 1),
                ("s", 12),
            ],
            ModelKind::Garch => vec![("p", 1), ("q", 1), ("o", 1), ("m", 1)],
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ModelKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ARMA" => Ok(ModelKind::Arma),
            "ARIMA" => Ok(ModelKind::Arima),
            "SARIMA" => Ok(ModelKind::Sarima),
            "GARCH" => Ok(ModelKind::Garch),
            other => bail!("Unknown model '{}'. Allowed values: ARMA | ARIMA | SARIMA | GARCH", other),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelConfig {
    pub kind: ModelKind,
    pub params: Vec<(&'static str, u32)>,
    /// When off, no forecast is generated.
    pub enabled: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new(ModelKind::Arima)
    }
}

impl ModelConfig {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            params: kind.default_params(),
            enabled: true,
        }
    }

    /// Changing the model resets its parameters to that model's defaults.
    pub fn set_kind(&mut self, kind: ModelKind) {
        self.kind = kind;
        self.params = kind.default_params();
    }

    #[cfg(test)]
    pub fn param(&self, key: &str) -> Option<u32> {
        self.params.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn set_param(&mut self, key: &str, value: &str) -> Result<()> {
        let parsed: u32 = match value.trim().parse() {
            Ok(v) => v,
            Err(_) => bail!("Parameter {} must be a non-negative integer, got '{}'", key, value),
        };
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => {
                slot.1 = parsed;
                Ok(())
            }
            None => bail!("{} has no parameter '{}'", self.kind, key),
        }
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// e.g. "ARIMA(p=1, d=1, q=1)"
    pub fn summary(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("{}({})", self.kind, params.join(", "))
    }
}

pub const STOP_LOSS_MIN_PCT: u32 = 1;
pub const STOP_LOSS_MAX_PCT: u32 = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StopLoss {
    pub enabled: bool,
    percent: u32,
    pub trailing: bool,
}

impl Default for StopLoss {
    fn default() -> Self {
        Self {
            enabled: true,
            percent: 5,
            trailing: false,
        }
    }
}

impl StopLoss {
    pub fn percent(&self) -> u32 {
        self.percent
    }

    pub fn set_percent(&mut self, percent: u32) {
        self.percent = percent.clamp(STOP_LOSS_MIN_PCT, STOP_LOSS_MAX_PCT);
    }

    pub fn adjust(&mut self, delta: i32) {
        let next = (self.percent as i64 + delta as i64).max(0) as u32;
        self.set_percent(next);
    }

    /// Price at which the position would be closed. A trailing stop follows
    /// the highest price seen since entry.
    pub fn stop_price(&self, entry: Decimal, high_water: Option<Decimal>) -> Option<Decimal> {
        if !self.enabled {
            return None;
        }
        let anchor = match (self.trailing, high_water) {
            (true, Some(high)) if high > entry => high,
            _ => entry,
        };
        let keep = Decimal::ONE_HUNDRED - Decimal::from(self.percent);
        Some((anchor * keep / Decimal::ONE_HUNDRED).round_dp(2))
    }
}
