use chrono::{DateTime, Duration, Local};
use rand::Rng;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizon {
    Daily,
    Hourly,
}

/// Shape of one synthetic price path and the thresholds used to mark it.
#[derive(Clone, Copy, Debug)]
struct PathShape {
    /// Step indices, inclusive start.
    first_step: usize,
    points: usize,
    /// Half-width of the uniform per-step noise.
    volatility: f64,
    drift: f64,
    cycle_freq: f64,
    cycle_amp: f64,
    conf_start: f64,
    conf_decay: f64,
    conf_floor: f64,
    buy_drop_pct: f64,
    buy_tail: usize,
    buy_lookahead: usize,
    buy_recovery: f64,
    sell_rise_pct: f64,
    sell_min_conf: f64,
    max_signals: usize,
}

impl Horizon {
    fn shape(self) -> PathShape {
        match self {
            Horizon::Daily => PathShape {
                first_step: 1,
                points: 30,
                volatility: 0.02,
                drift: 0.001,
                cycle_freq: 0.2,
                cycle_amp: 0.02,
                conf_start: 0.95,
                conf_decay: 0.015,
                conf_floor: 0.5,
                buy_drop_pct: -1.2,
                buy_tail: 5,
                buy_lookahead: 3,
                buy_recovery: 0.998,
                sell_rise_pct: 1.5,
                sell_min_conf: 0.6,
                max_signals: 3,
            },
            Horizon::Hourly => PathShape {
                first_step: 0,
                points: 48,
                volatility: 0.01,
                drift: 0.0002,
                cycle_freq: 0.3,
                cycle_amp: 0.01,
                conf_start: 0.95,
                conf_decay: 0.008,
                conf_floor: 0.6,
                buy_drop_pct: -0.4,
                buy_tail: 3,
                buy_lookahead: 2,
                buy_recovery: 0.999,
                sell_rise_pct: 0.6,
                sell_min_conf: 0.6,
                max_signals: 5,
            },
        }
    }

    pub fn points(self) -> usize {
        self.shape().points
    }

    fn timestamp(self, start: DateTime<Local>, index: usize) -> DateTime<Local> {
        match self {
            Horizon::Daily => start + Duration::days(index as i64 + 1),
            Horizon::Hourly => start + Duration::hours(index as i64 + 1),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub at: DateTime<Local>,
    pub price: f64,
    pub confidence: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Buy,
    Sell,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Buy => "BUY",
            SignalKind::Sell => "SELL",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Signal {
    pub index: usize,
    pub kind: SignalKind,
    pub at: DateTime<Local>,
    pub price: f64,
    pub confidence: f64,
    pub reason: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct Forecast {
    pub horizon: Horizon,
    pub base_price: f64,
    pub points: Vec<ForecastPoint>,
    pub signals: Vec<Signal>,
}

/// One row of the prediction table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredictionRow {
    pub label: String,
    pub at: DateTime<Local>,
    pub price: f64,
    /// Percent change against the first forecast point.
    pub change_pct: f64,
    pub confidence: f64,
}

/// Base used when no live price is known.
pub fn fallback_base_price<R: Rng>(rng: &mut R) -> f64 {
    175.0 + rng.gen_range(0.0..50.0)
}

impl Forecast {
    /// Fabricates a price path around `base_price` and marks BUY/SELL points
    /// on it. Nothing here is a real prediction.
    pub fn generate<R: Rng>(
        horizon: Horizon,
        base_price: Option<f64>,
        start: DateTime<Local>,
        rng: &mut R,
    ) -> Self {
        let shape = horizon.shape();
        let base_price = base_price
            .filter(|p| p.is_finite() && *p > 0.0)
            .unwrap_or_else(|| fallback_base_price(rng));

        let points: Vec<ForecastPoint> = (0..shape.points)
            .map(|index| {
                let step = (index + shape.first_step) as f64;
                let noise = rng.gen_range(-shape.volatility..shape.volatility);
                let trend = 1.0 + step * shape.drift;
                let cycle = (step * shape.cycle_freq).sin() * shape.cycle_amp;
                ForecastPoint {
                    at: horizon.timestamp(start, index),
                    price: base_price * trend * (1.0 + noise + cycle),
                    confidence: (shape.conf_start - step * shape.conf_decay).max(shape.conf_floor),
                }
            })
            .collect();

        let signals = detect_signals(horizon, &shape, &points);

        Self {
            horizon,
            base_price,
            points,
            signals,
        }
    }

    pub fn prediction_rows(&self) -> Vec<PredictionRow> {
        let reference = self.points.first().map(|p| p.price).unwrap_or(self.base_price);
        self.points
            .iter()
            .enumerate()
            .map(|(index, point)| PredictionRow {
                label: horizon_label(self.horizon, index),
                at: point.at,
                price: point.price,
                change_pct: (point.price - reference) / reference * 100.0,
                confidence: point.confidence,
            })
            .collect()
    }

    pub fn last(&self) -> Option<&ForecastPoint> {
        self.points.last()
    }
}

fn detect_signals(horizon: Horizon, shape: &PathShape, points: &[ForecastPoint]) -> Vec<Signal> {
    let (buy_reason, sell_reason) = match horizon {
        Horizon::Daily => ("Technical dip - buy opportunity", "Take profit - resistance level"),
        Horizon::Hourly => ("Intraday dip - scalping opportunity", "Quick profit - intraday resistance"),
    };
    let n = points.len();
    let mut signals = Vec::new();

    for (i, pair) in points.windows(2).enumerate() {
        let (current, next) = (&pair[0], &pair[1]);
        let delta_pct = (next.price - current.price) / current.price * 100.0;

        if delta_pct < shape.buy_drop_pct && i + shape.buy_tail < n {
            let recovers = points
                .get(i + shape.buy_lookahead)
                .is_some_and(|later| later.price > current.price * shape.buy_recovery);
            if recovers {
                signals.push(signal(i, SignalKind::Buy, current, buy_reason));
            }
        }

        if delta_pct > shape.sell_rise_pct && current.confidence > shape.sell_min_conf {
            signals.push(signal(i, SignalKind::Sell, current, sell_reason));
        }
    }

    signals.truncate(shape.max_signals);
    signals
}

fn signal(index: usize, kind: SignalKind, point: &ForecastPoint, reason: &'static str) -> Signal {
    Signal {
        index,
        kind,
        at: point.at,
        price: point.price,
        confidence: point.confidence,
        reason,
    }
}

pub fn horizon_label(horizon: Horizon, index: usize) -> String {
    match horizon {
        Horizon::Daily => match index {
            0 => "Tomorrow".to_string(),
            6 => "Next Week".to_string(),
            13 => "2 Weeks".to_string(),
            29 => "1 Month".to_string(),
            _ => format!("Day {}", index + 1),
        },
        Horizon::Hourly => format!("+{}h", index + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_daily_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let forecast = Forecast::generate(Horizon::Daily, Some(200.0), start(), &mut rng);
        assert_eq!(forecast.points.len(), 30);
        assert_eq!(forecast.points.len(), Horizon::Daily.points());
        assert_eq!(forecast.base_price, 200.0);
        assert!((forecast.points[0].confidence - 0.935).abs() < 1e-9);
        assert!((forecast.points[29].confidence - 0.5).abs() < 1e-9);
        assert_eq!(forecast.points[0].at, start() + Duration::days(1));
        // trend, cycle and noise together stay within a few percent of base
        for (i, p) in forecast.points.iter().enumerate() {
            let step = (i + 1) as f64;
            let trend = 200.0 * (1.0 + step * 0.001);
            assert!(p.price > trend * 0.96 && p.price < trend * 1.04, "step {} price {}", step, p.price);
        }
    }

    #[test]
    fn test_hourly_shape() {
        let mut rng = StdRng::seed_from_u64(11);
        let forecast = Forecast::generate(Horizon::Hourly, Some(50.0), start(), &mut rng);
        assert_eq!(forecast.points.len(), 48);
        assert_eq!(forecast.points.len(), Horizon::Hourly.points());
        assert!((forecast.points[0].confidence - 0.95).abs() < 1e-9);
        assert!((forecast.points[47].confidence - 0.6).abs() < 1e-9);
        assert!(forecast.signals.len() <= 5);
    }

    #[test]
    fn test_confidence_never_increases() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            for horizon in [Horizon::Daily, Horizon::Hourly] {
                let forecast = Forecast::generate(horizon, None, start(), &mut rng);
                assert!(forecast.points.windows(2).all(|w| w[1].confidence <= w[0].confidence));
            }
        }
    }

    #[test]
    fn test_seed_reproducibility_and_fallback_base() {
        let a = Forecast::generate(Horizon::Daily, None, start(), &mut StdRng::seed_from_u64(3));
        let b = Forecast::generate(Horizon::Daily, None, start(), &mut StdRng::seed_from_u64(3));
        assert_eq!(a.points, b.points);
        assert!(a.base_price >= 175.0 && a.base_price < 225.0);

        let c = Forecast::generate(Horizon::Daily, Some(f64::NAN), start(), &mut StdRng::seed_from_u64(3));
        assert!(c.base_price >= 175.0);
    }

    #[test]
    fn test_signal_rules_hold_for_many_seeds() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let forecast = Forecast::generate(Horizon::Daily, Some(100.0), start(), &mut rng);
            assert!(forecast.signals.len() <= 3);
            let p = &forecast.points;
            for s in &forecast.signals {
                let delta = (p[s.index + 1].price - p[s.index].price) / p[s.index].price * 100.0;
                match s.kind {
                    SignalKind::Buy => {
                        assert!(delta < -1.2);
                        assert!(s.index + 5 < p.len());
                        assert!(p[s.index + 3].price > p[s.index].price * 0.998);
                    }
                    SignalKind::Sell => {
                        assert!(delta > 1.5);
                        assert!(s.confidence > 0.6);
                    }
                }
            }
        }
    }

    #[test]
    fn test_hand_built_path_signals() {
        let shape = Horizon::Daily.shape();
        let prices = [100.0, 98.0, 98.5, 99.0, 100.0, 103.0, 103.1, 103.2];
        let points: Vec<ForecastPoint> = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| ForecastPoint {
                at: start(),
                price,
                confidence: 0.9 - i as f64 * 0.01,
            })
            .collect();
        let signals = detect_signals(Horizon::Daily, &shape, &points);
        // 100 -> 98 dips but p[3] = 99 does not recover; 100 -> 103 rises
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Sell);
        assert_eq!(signals[0].index, 4);
    }

    #[test]
    fn test_rows_and_labels() {
        let mut rng = StdRng::seed_from_u64(1);
        let forecast = Forecast::generate(Horizon::Daily, Some(100.0), start(), &mut rng);
        let rows = forecast.prediction_rows();
        assert_eq!(rows.len(), 30);
        assert_eq!(rows[0].label, "Tomorrow");
        assert_eq!(rows[0].change_pct, 0.0);
        assert_eq!(rows[6].label, "Next Week");
        assert_eq!(rows[13].label, "2 Weeks");
        assert_eq!(rows[29].label, "1 Month");
        assert_eq!(rows[2].label, "Day 3");
        assert_eq!(horizon_label(Horizon::Hourly, 0), "+1h");
    }
}
