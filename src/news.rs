use crate::market::AssetKind;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    pub sentiment: Sentiment,
    pub score: f64,
    pub source: &'static str,
    pub published: &'static str,
    pub impact: Impact,
}

/// Canned headlines with their fixed sentiment scores.
#[derive(Clone, Debug, Serialize)]
pub struct NewsFeed {
    pub items: Vec<NewsItem>,
}

fn item(
    title: String,
    summary: String,
    score: f64,
    source: &'static str,
    published: &'static str,
    impact: Impact,
) -> NewsItem {
    let sentiment = if score > 0.0 {
        Sentiment::Positive
    } else if score < 0.0 {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };
    NewsItem {
        title,
        summary,
        sentiment,
        score,
        source,
        published,
        impact,
    }
}

impl NewsFeed {
    /// Four items templated with the asset's upper-cased identifier.
    pub fn for_asset(kind: AssetKind, asset: &str) -> Self {
        let name = asset.trim().to_uppercase();
        let items = match kind {
            AssetKind::Stock => vec![
                item(
                    format!("{} Reports Strong Q4 Earnings, Beats Expectations", name),
                    format!(
                        "{} reported quarterly earnings that exceeded analyst expectations, driven by strong revenue growth.",
                        name
                    ),
                    0.85,
                    "Reuters",
                    "2 hours ago",
                    Impact::High,
                ),
                item(
                    "Tech Stocks Rally as Market Conditions Improve".to_string(),
                    format!(
                        "Major technology stocks including {} saw significant gains as investor confidence returns to the sector.",
                        name
                    ),
                    0.72,
                    "Bloomberg",
                    "4 hours ago",
                    Impact::Medium,
                ),
                item(
                    "Supply Chain Concerns Continue to Affect Manufacturing".to_string(),
                    "Ongoing supply chain disruptions may impact production schedules for major companies in the coming quarter."
                        .to_string(),
                    -0.45,
                    "Financial Times",
                    "6 hours ago",
                    Impact::Medium,
                ),
                item(
                    "New Product Launch Expected to Drive Growth".to_string(),
                    format!(
                        "Industry analysts predict that {}'s upcoming product launches will significantly boost revenue.",
                        name
                    ),
                    0.68,
                    "WSJ",
                    "8 hours ago",
                    Impact::High,
                ),
            ],
            AssetKind::Crypto => vec![
                item(
                    format!("{} Surges on Institutional Adoption News", name),
                    format!(
                        "{} has gained significant momentum following announcements of major institutional adoption and integration.",
                        name
                    ),
                    0.88,
                    "CoinDesk",
                    "1 hour ago",
                    Impact::High,
                ),
                item(
                    "Crypto Market Shows Strong Recovery Signs".to_string(),
                    format!(
                        "{} and other major cryptocurrencies are showing bullish momentum as market sentiment improves.",
                        name
                    ),
                    0.76,
                    "CryptoNews",
                    "3 hours ago",
                    Impact::Medium,
                ),
                item(
                    "Regulatory Clarity Brings Optimism to Crypto Space".to_string(),
                    "Recent regulatory developments provide clearer guidelines for cryptocurrency operations and trading."
                        .to_string(),
                    0.65,
                    "Cointelegraph",
                    "5 hours ago",
                    Impact::High,
                ),
                item(
                    format!("{} Network Upgrades Show Technical Progress", name),
                    format!(
                        "Latest network improvements and upgrades demonstrate {}'s commitment to scalability and efficiency.",
                        name
                    ),
                    0.71,
                    "The Block",
                    "7 hours ago",
                    Impact::Medium,
                ),
            ],
        };
        Self { items }
    }

    /// Mean score across all items, 0 for an empty feed.
    pub fn overall_score(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.items.iter().map(|i| i.score).sum::<f64>() / self.items.len() as f64
    }

    pub fn overall_label(&self) -> &'static str {
        if self.overall_score() > 0.0 { "Positive" } else { "Negative" }
    }

    pub fn count(&self, sentiment: Sentiment) -> usize {
        self.items.iter().filter(|i| i.sentiment == sentiment).count()
    }
}
