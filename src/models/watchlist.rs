// =============================================================================
// Watchlist item model
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastRefreshStatus {
    Pass,
    Fail,
    Pending,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchlistStatus {
    #[serde(rename = "Buy Ready")]
    BuyReady,
    #[serde(rename = "Buy Alert")]
    BuyAlert,
    Watch,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub user_id: String,
    pub ticker: String,
    #[serde(default)]
    pub is_favourite: bool,
    #[serde(default = "default_watch_status")]
    pub status: WatchlistStatus,
    #[serde(default = "default_last_refresh_status")]
    pub last_refresh_status: LastRefreshStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    #[serde(default)]
    pub last_refresh_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcp_pass: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_pivot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pivot_good: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_at_pivot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_pullback_setup: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_age_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_proximity_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_since_pivot: Option<i64>,
    #[serde(default, rename = "vcpFootprint", skip_serializing_if = "Option::is_none")]
    pub vcp_footprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vol_last: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vol_50d_avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_change_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vol_vs_50d_ratio: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

fn default_watch_status() -> WatchlistStatus {
    WatchlistStatus::Pending
}

fn default_last_refresh_status() -> LastRefreshStatus {
    LastRefreshStatus::Pending
}

impl WatchlistItem {
    pub fn new(user_id: impl Into<String>, ticker: impl Into<String>) -> Self {
        WatchlistItem {
            user_id: user_id.into(),
            ticker: ticker.into(),
            is_favourite: false,
            status: WatchlistStatus::Pending,
            last_refresh_status: LastRefreshStatus::Pending,
            failed_stage: None,
            last_refresh_at: None,
            vcp_pass: None,
            has_pivot: None,
            is_pivot_good: None,
            is_at_pivot: None,
            has_pullback_setup: None,
            pivot_price: None,
            pattern_age_days: None,
            pivot_proximity_percent: None,
            days_since_pivot: None,
            vcp_footprint: None,
            current_price: None,
            vol_last: None,
            vol_50d_avg: None,
            day_change_pct: None,
            vol_vs_50d_ratio: None,
            archived_at: None,
        }
    }
}
