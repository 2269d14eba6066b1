//! Admin dashboard read models
//!
//! Aggregates computed over a tenant's leads for a caller-supplied date range.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub tenant_id: Uuid,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_referral_value: f64,
    pub active_members: i64,
    pub total_members: i64,
    pub activation_rate: f64,
    pub leads_this_month: i64,
    pub avg_response_time: i64,
    pub lead_conversion_rate: f64,
    pub month_over_month_growth: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub contractor_id: Uuid,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub count: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboards {
    pub top_referrers: Vec<LeaderboardEntry>,
    pub top_receivers: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivityPoint {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub metrics: DashboardMetrics,
    pub leaderboards: Leaderboards,
    pub daily_activity: Vec<DailyActivityPoint>,
    pub date_range: DateRange,
}

/// Comparison window for period-over-period growth: the window of equal
/// length immediately preceding [from, to). Sliding, not calendar-aligned.
pub fn previous_window(from: DateTime<Utc>, to: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let length = to - from;
    (from - length, from)
}

/// Percentage growth of `current` over `previous`; 0 when there is no
/// previous-period activity to compare against.
pub fn growth_percent(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn previous_window_slides_back_by_the_range_length() {
        let to = Utc::now();
        let from = to - Duration::days(30);
        let (prev_from, prev_to) = previous_window(from, to);
        assert_eq!(prev_to, from);
        assert_eq!(prev_from, from - Duration::days(30));
    }

    #[test]
    fn growth_is_relative_to_previous_period() {
        assert_eq!(growth_percent(150.0, 100.0), 50.0);
        assert_eq!(growth_percent(50.0, 100.0), -50.0);
    }

    #[test]
    fn growth_is_zero_without_previous_activity() {
        assert_eq!(growth_percent(500.0, 0.0), 0.0);
    }
}
