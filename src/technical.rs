use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ZoneKind {
    Supply,
    Demand,
}

impl ZoneKind {
    pub fn label(self) -> &'static str {
        match self {
            ZoneKind::Supply => "Supply Zone",
            ZoneKind::Demand => "Demand Zone",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Level {
    High,
    Medium,
    Low,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::High => "High",
            Level::Medium => "Medium",
            Level::Low => "Low",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderBlock {
    pub kind: ZoneKind,
    pub price: Decimal,
    /// 0..=100
    pub strength: u8,
    pub volume: Level,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FibLevel {
    pub label: &'static str,
    pub ratio_pct: f64,
    pub price: Decimal,
    pub kind: &'static str,
}

/// Order blocks at fixed multiples of `current`, or fixed prices when the
/// current price is unknown.
pub fn order_blocks(current: Option<Decimal>) -> Vec<OrderBlock> {
    let at = |mult: Decimal, default: Decimal| current.map(|p| p * mult).unwrap_or(default);
    vec![
        OrderBlock {
            kind: ZoneKind::Supply,
            price: at(dec!(1.15), dec!(250)),
            strength: 85,
            volume: Level::High,
            active: true,
        },
        OrderBlock {
            kind: ZoneKind::Demand,
            price: at(dec!(0.92), dec!(200)),
            strength: 78,
            volume: Level::Medium,
            active: true,
        },
        OrderBlock {
            kind: ZoneKind::Supply,
            price: at(dec!(1.08), dec!(230)),
            strength: 65,
            volume: Level::Low,
            active: false,
        },
    ]
}

pub fn fibonacci_levels(current: Option<Decimal>) -> Vec<FibLevel> {
    const TABLE: [(&str, f64, Decimal, Decimal, &str); 7] = [
        ("100%", 100.0, dec!(1.20), dec!(260), "Extension"),
        ("78.6%", 78.6, dec!(1.12), dec!(242), "Retracement"),
        ("61.8%", 61.8, dec!(1.05), dec!(227), "Retracement"),
        ("50%", 50.0, dec!(1), dec!(216), "Retracement"),
        ("38.2%", 38.2, dec!(0.95), dec!(205), "Retracement"),
        ("23.6%", 23.6, dec!(0.88), dec!(190), "Retracement"),
        ("0%", 0.0, dec!(0.80), dec!(172), "Base"),
    ];
    TABLE
        .iter()
        .map(|(label, ratio_pct, mult, default, kind)| FibLevel {
            label: *label,
            ratio_pct: *ratio_pct,
            price: current.map(|p| p * *mult).unwrap_or(*default),
            kind: *kind,
        })
        .collect()
}

/// Colour bucket for an order block strength.
pub fn strength_level(strength: u8) -> Level {
    match strength {
        80.. => Level::High,
        60..=79 => Level::Medium,
        _ => Level::Low,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
}

impl Trend {
    pub fn between(current: Decimal, predicted: Decimal) -> Self {
        if predicted >= current { Trend::Bullish } else { Trend::Bearish }
    }

    pub fn label(self) -> &'static str {
        match self {
            Trend::Bullish => "BULLISH",
            Trend::Bearish => "BEARISH",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub period: &'static str,
    pub price: Decimal,
    pub confidence: u8,
}

/// Headline numbers of the Analysis tab.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub current_price: Decimal,
    pub predicted_price: Decimal,
    pub confidence: f64,
    pub trend: Trend,
    pub historical_vol: f64,
    pub implied_vol: f64,
    pub risk_score: f64,
    pub timeline: Vec<TimelinePoint>,
}

impl Default for AnalysisSummary {
    fn default() -> Self {
        Self {
            current_price: dec!(175.43),
            predicted_price: dec!(182.75),
            confidence: 87.2,
            trend: Trend::between(dec!(175.43), dec!(182.75)),
            historical_vol: 18.5,
            implied_vol: 22.1,
            risk_score: 6.2,
            timeline: vec![
                TimelinePoint { period: "1 Day", price: dec!(177.23), confidence: 92 },
                TimelinePoint { period: "1 Week", price: dec!(180.45), confidence: 87 },
                TimelinePoint { period: "1 Month", price: dec!(182.75), confidence: 76 },
                TimelinePoint { period: "3 Months", price: dec!(185.20), confidence: 64 },
            ],
        }
    }
}

impl AnalysisSummary {
    pub fn price_diff(&self) -> Decimal {
        self.predicted_price - self.current_price
    }

    pub fn change_percent(&self) -> Decimal {
        if self.current_price.is_zero() {
            return Decimal::ZERO;
        }
        (self.price_diff() / self.current_price * Decimal::ONE_HUNDRED).round_dp(2)
    }

    pub fn risk_bucket(&self) -> &'static str {
        risk_bucket(self.risk_score)
    }
}

pub fn risk_bucket(score: f64) -> &'static str {
    if score <= 3.0 {
        "Low"
    } else if score <= 7.0 {
        "Medium"
    } else {
        "High"
    }
}
