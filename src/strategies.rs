use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyType {
    Momentum,
    MeanReversion,
    TrendFollowing,
    Arbitrage,
    Sentiment,
}

impl StrategyType {
    pub fn label(self) -> &'static str {
        match self {
            StrategyType::Momentum => "momentum",
            StrategyType::MeanReversion => "mean-reversion",
            StrategyType::TrendFollowing => "trend-following",
            StrategyType::Arbitrage => "arbitrage",
            StrategyType::Sentiment => "sentiment",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LastSignal {
    Buy,
    Sell,
    Hold,
}

impl LastSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            LastSignal::Buy => "BUY",
            LastSignal::Sell => "SELL",
            LastSignal::Hold => "HOLD",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Strategy {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: StrategyType,
    /// Return in percent.
    pub performance: f64,
    pub win_rate: f64,
    pub risk: RiskLevel,
    pub enabled: bool,
    pub signals: u32,
    pub last_signal: LastSignal,
}

/// The canned strategy list with per-strategy on/off toggles.
#[derive(Clone, Debug, Serialize)]
pub struct StrategyBoard {
    strategies: Vec<Strategy>,
}

impl Default for StrategyBoard {
    fn default() -> Self {
        Self {
            strategies: vec![
                Strategy {
                    id: "momentum-lstm",
                    name: "LSTM Momentum",
                    description: "Deep learning model detecting momentum patterns using LSTM networks",
                    kind: StrategyType::Momentum,
                    performance: 18.4,
                    win_rate: 67.2,
                    risk: RiskLevel::Medium,
                    enabled: true,
                    signals: 12,
                    last_signal: LastSignal::Buy,
                },
                Strategy {
                    id: "mean-reversion-rf",
                    name: "Random Forest Mean Reversion",
                    description: "Ensemble learning approach for mean reversion opportunities",
                    kind: StrategyType::MeanReversion,
                    performance: 12.8,
                    win_rate: 71.5,
                    risk: RiskLevel::Low,
                    enabled: true,
                    signals: 8,
                    last_signal: LastSignal::Hold,
                },
                Strategy {
                    id: "trend-xgb",
                    name: "XGBoost Trend Follower",
                    description: "Gradient boosting model for trend detection and following",
                    kind: StrategyType::TrendFollowing,
                    performance: 24.6,
                    win_rate: 62.3,
                    risk: RiskLevel::High,
                    enabled: false,
                    signals: 15,
                    last_signal: LastSignal::Buy,
                },
                Strategy {
                    id: "sentiment-bert",
                    name: "BERT Sentiment Analyzer",
                    description: "NLP-based sentiment analysis from news and social media",
                    kind: StrategyType::Sentiment,
                    performance: 9.2,
                    win_rate: 58.9,
                    risk: RiskLevel::Medium,
                    enabled: true,
                    signals: 23,
                    last_signal: LastSignal::Sell,
                },
                Strategy {
                    id: "arb-neural",
                    name: "Neural Arbitrage Detector",
                    description: "Deep neural network for cross-market arbitrage opportunities",
                    kind: StrategyType::Arbitrage,
                    performance: 6.7,
                    win_rate: 82.1,
                    risk: RiskLevel::Low,
                    enabled: false,
                    signals: 3,
                    last_signal: LastSignal::Hold,
                },
            ],
        }
    }
}

impl StrategyBoard {
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Flips one strategy. Returns its new state, or None for an unknown id.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let strategy = self.strategies.iter_mut().find(|s| s.id == id)?;
        strategy.enabled = !strategy.enabled;
        Some(strategy.enabled)
    }

    pub fn toggle_at(&mut self, index: usize) -> Option<bool> {
        let id = self.strategies.get(index)?.id;
        self.toggle(id)
    }

    fn enabled(&self) -> impl Iterator<Item = &Strategy> {
        self.strategies.iter().filter(|s| s.enabled)
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled().count()
    }

    pub fn avg_performance(&self) -> f64 {
        self.average(|s| s.performance)
    }

    pub fn avg_win_rate(&self) -> f64 {
        self.average(|s| s.win_rate)
    }

    pub fn total_signals(&self) -> u32 {
        self.enabled().map(|s| s.signals).sum()
    }

    fn average(&self, field: impl Fn(&Strategy) -> f64) -> f64 {
        let count = self.enabled_count();
        if count == 0 {
            return 0.0;
        }
        self.enabled().map(field).sum::<f64>() / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_default_averages() {
        let board = StrategyBoard::default();
        assert_eq!(board.strategies().len(), 5);
        assert_eq!(board.enabled_count(), 3);
        // 18.4, 12.8 and 9.2 are enabled
        assert!(close(board.avg_performance(), (18.4 + 12.8 + 9.2) / 3.0));
        assert!(close(board.avg_win_rate(), (67.2 + 71.5 + 58.9) / 3.0));
        assert_eq!(board.total_signals(), 43);
    }

    #[test]
    fn test_toggle() {
        let mut board = StrategyBoard::default();
        assert_eq!(board.toggle("trend-xgb"), Some(true));
        assert_eq!(board.enabled_count(), 4);
        assert_eq!(board.toggle("nope"), None);
        assert_eq!(board.toggle_at(0), Some(false));
        assert_eq!(board.toggle_at(9), None);
    }

    #[test]
    fn test_all_disabled_averages_zero() {
        let mut board = StrategyBoard::default();
        for id in ["momentum-lstm", "mean-reversion-rf", "sentiment-bert"] {
            board.toggle(id);
        }
        assert_eq!(board.enabled_count(), 0);
        assert_eq!(board.avg_performance(), 0.0);
        assert_eq!(board.avg_win_rate(), 0.0);
    }
}
