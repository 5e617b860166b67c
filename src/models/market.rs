// =============================================================================
// Market trend day + market health response models
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketTrend {
    Bullish,
    Neutral,
    Bearish,
}

impl std::fmt::Display for MarketTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketTrend::Bullish => "Bullish",
            MarketTrend::Neutral => "Neutral",
            MarketTrend::Bearish => "Bearish",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketTrendDay {
    pub date: String,
    pub trend: MarketTrend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketHealthResponse {
    pub market_stage: MarketTrend,
    pub correction_depth_percent: f64,
    pub high_low_ratio: f64,
    pub new_highs: u64,
    pub new_lows: u64,
    pub fetched_at: DateTime<Utc>,
}
