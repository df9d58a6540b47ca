use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::Serialize;

// ──────────────────────────────────────────────────────────────────────────────
// Data Structures
// ──────────────────────────────────────────────────────────────────────────────

/// One holding in the demo portfolio. Value and gain are derived from
/// shares and prices.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Position {
    pub symbol: &'static str,
    pub name: &'static str,
    pub shares: u32,
    pub avg_price: Decimal,
    pub current_price: Decimal,
}

impl Position {
    pub fn market_value(&self) -> Decimal {
        self.current_price * Decimal::from(self.shares)
    }

    pub fn cost_basis(&self) -> Decimal {
        self.avg_price * Decimal::from(self.shares)
    }

    pub fn gain(&self) -> Decimal {
        self.market_value() - self.cost_basis()
    }

    /// Gain relative to cost basis, in percent, two decimals.
    pub fn gain_percent(&self) -> Decimal {
        let basis = self.cost_basis();
        if basis.is_zero() {
            return Decimal::ZERO;
        }
        (self.gain() / basis * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

/// The canned account shown on the Portfolio tab. Headline figures are
/// fixed; per-position figures are computed.
#[derive(Clone, Debug, Serialize)]
pub struct PortfolioOverview {
    pub total_value: Decimal,
    pub total_gain: Decimal,
    pub total_gain_percent: Decimal,
    pub day_change: Decimal,
    pub day_change_percent: Decimal,
    pub cash_balance: Decimal,
    pub positions: Vec<Position>,
}

impl Default for PortfolioOverview {
    fn default() -> Self {
        Self {
            total_value: dec!(125430.75),
            total_gain: dec!(8750.23),
            total_gain_percent: dec!(7.51),
            day_change: dec!(1245.67),
            day_change_percent: dec!(1.01),
            cash_balance: dec!(15240.50),
            positions: vec![
                Position {
                    symbol: "AAPL",
                    name: "Apple Inc.",
                    shares: 50,
                    avg_price: dec!(165.20),
                    current_price: dec!(175.43),
                },
                Position {
                    symbol: "GOOGL",
                    name: "Alphabet Inc.",
                    shares: 15,
                    avg_price: dec!(2850.00),
                    current_price: dec!(2847.52),
                },
                Position {
                    symbol: "MSFT",
                    name: "Microsoft Corp.",
                    shares: 80,
                    avg_price: dec!(390.50),
                    current_price: dec!(414.78),
                },
                Position {
                    symbol: "TSLA",
                    name: "Tesla Inc.",
                    shares: 45,
                    avg_price: dec!(245.80),
                    current_price: dec!(238.45),
                },
                Position {
                    symbol: "NVDA",
                    name: "NVIDIA Corp.",
                    shares: 35,
                    avg_price: dec!(820.00),
                    current_price: dec!(875.28),
                },
            ],
        }
    }
}

impl PortfolioOverview {
    /// Share of total account value held in `position`, percent, one decimal.
    pub fn allocation(&self, position: &Position) -> Decimal {
        if self.total_value.is_zero() {
            return Decimal::ZERO;
        }
        (position.market_value() / self.total_value * Decimal::ONE_HUNDRED).round_dp(1)
    }

    pub fn invested_value(&self) -> Decimal {
        self.positions.iter().map(Position::market_value).sum()
    }

    /// (symbol, allocation percent) pairs, for the allocation bars.
    pub fn allocations(&self) -> Vec<(&'static str, f64)> {
        self.positions
            .iter()
            .map(|p| (p.symbol, self.allocation(p).to_f64().unwrap_or(0.0)))
            .collect()
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Reporting
// ──────────────────────────────────────────────────────────────────────────────

/// Pretty-prints the portfolio to stdout.
pub fn print_overview(overview: &PortfolioOverview) {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║                 MarketDesk Demo Portfolio                  ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Total Value   : ${:>12.2}                              ║", overview.total_value);
    println!(
        "║  Total Gain    : ${:>12.2} ({:>+5.2}%)                     ║",
        overview.total_gain, overview.total_gain_percent
    );
    println!(
        "║  Day Change    : ${:>12.2} ({:>+5.2}%)                     ║",
        overview.day_change, overview.day_change_percent
    );
    println!("║  Cash          : ${:>12.2}                              ║", overview.cash_balance);
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Symbol  Shares    Avg      Price       Value    Gain%  Alloc ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    for p in &overview.positions {
        println!(
            "║  {:<6} {:>6} {:>8.2} {:>8.2} {:>11.2} {:>+7.2}% {:>5.1}% ║",
            p.symbol,
            p.shares,
            p.avg_price,
            p.current_price,
            p.market_value(),
            p.gain_percent(),
            overview.allocation(p)
        );
    }
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    println!("⚠  Demo data only. Not financial advice.");
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_figures() {
        let overview = PortfolioOverview::default();
        let aapl = &overview.positions[0];
        assert_eq!(aapl.market_value(), dec!(8771.50));
        assert_eq!(aapl.gain(), dec!(511.50));
        assert_eq!(aapl.gain_percent(), dec!(6.19));

        let googl = &overview.positions[1];
        assert_eq!(googl.gain(), dec!(-37.20));
        assert_eq!(googl.gain_percent(), dec!(-0.09));

        let tsla = &overview.positions[3];
        assert_eq!(tsla.market_value(), dec!(10730.25));
        assert_eq!(tsla.gain_percent(), dec!(-2.99));
    }

    #[test]
    fn test_allocations_match_display() {
        let overview = PortfolioOverview::default();
        let allocs: Vec<Decimal> = overview.positions.iter().map(|p| overview.allocation(p)).collect();
        assert_eq!(allocs, vec![dec!(7.0), dec!(34.1), dec!(26.5), dec!(8.6), dec!(24.4)]);
        assert_eq!(overview.allocations().len(), 5);
    }

    #[test]
    fn test_invested_value() {
        let overview = PortfolioOverview::default();
        assert_eq!(overview.invested_value(), dec!(126031.75));
    }
}
