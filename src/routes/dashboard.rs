//! Association admin dashboard
//!
//! Aggregate metrics over a tenant's referral activity for a caller-supplied
//! date range (default: trailing 30 days). Period-over-period growth compares
//! against the sliding window of equal length immediately before the range.
//! Responses are cached per tenant and range.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::domain::dashboard::{
    growth_percent, previous_window, DailyActivityPoint, DashboardMetrics, DashboardQuery,
    DashboardResponse, DateRange, LeaderboardEntry, Leaderboards,
};
use crate::error::ApiError;
use crate::services::cache::keys;
use crate::services::lifecycle::decimal_to_f64;

#[derive(Debug, sqlx::FromRow)]
struct LeaderboardRow {
    contractor_id: Uuid,
    company_name: String,
    contact_name: Option<String>,
    count: i64,
    value: Decimal,
}

impl From<LeaderboardRow> for LeaderboardEntry {
    fn from(row: LeaderboardRow) -> Self {
        Self {
            contractor_id: row.contractor_id,
            company_name: row.company_name,
            contact_name: row.contact_name,
            count: row.count,
            value: decimal_to_f64(row.value),
        }
    }
}

/// GET /admin/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let to = query.date_to.unwrap_or(now);
    let from = query.date_from.unwrap_or(to - Duration::days(30));
    if from >= to {
        return Err(ApiError::invalid_argument("dateFrom must precede dateTo"));
    }

    let cache_key = keys::dashboard(query.tenant_id, from, to);
    if let Some(cached) = state.cache.get::<DashboardResponse>(&cache_key).await {
        return Ok(Json(DataResponse::new(cached)));
    }

    let tenant_id = query.tenant_id;

    // Won value and count within the range
    let (total_referral_value, won_count): (Decimal, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(job_value), 0), COUNT(*)
        FROM leads
        WHERE tenant_id = $1 AND status = 'won'
          AND completed_at >= $2 AND completed_at < $3
        "#,
    )
    .bind(tenant_id)
    .bind(from)
    .bind(to)
    .fetch_one(&state.db)
    .await?;

    let (total_members, active_members): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'active')
        FROM contractor_profiles
        WHERE tenant_id = $1
        "#,
    )
    .bind(tenant_id)
    .fetch_one(&state.db)
    .await?;

    let leads_this_month: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM leads
        WHERE tenant_id = $1 AND shared_at >= date_trunc('month', $2::timestamptz)
        "#,
    )
    .bind(tenant_id)
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    let avg_response_time: Option<Decimal> = sqlx::query_scalar(
        r#"
        SELECT AVG(response_time_minutes) FROM leads
        WHERE tenant_id = $1 AND response_time_minutes IS NOT NULL
        "#,
    )
    .bind(tenant_id)
    .fetch_one(&state.db)
    .await?;

    let total_leads: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM leads WHERE tenant_id = $1 AND shared_at >= $2 AND shared_at < $3",
    )
    .bind(tenant_id)
    .bind(from)
    .bind(to)
    .fetch_one(&state.db)
    .await?;

    // Previous sliding window of equal length for the growth figure
    let (prev_from, prev_to) = previous_window(from, to);
    let prev_value: Decimal = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(job_value), 0)
        FROM leads
        WHERE tenant_id = $1 AND status = 'won'
          AND completed_at >= $2 AND completed_at < $3
        "#,
    )
    .bind(tenant_id)
    .bind(prev_from)
    .bind(prev_to)
    .fetch_one(&state.db)
    .await?;

    let top_referrers: Vec<LeaderboardRow> = sqlx::query_as(
        r#"
        SELECT l.referrer_id AS contractor_id, c.company_name, c.contact_name,
               COUNT(*) AS count, COALESCE(SUM(l.job_value), 0) AS value
        FROM leads l
        JOIN contractor_profiles c ON c.id = l.referrer_id
        WHERE l.tenant_id = $1 AND l.shared_at >= $2 AND l.shared_at < $3
        GROUP BY l.referrer_id, c.company_name, c.contact_name
        ORDER BY COUNT(*) DESC
        LIMIT 5
        "#,
    )
    .bind(tenant_id)
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;

    let top_receivers: Vec<LeaderboardRow> = sqlx::query_as(
        r#"
        SELECT l.recipient_id AS contractor_id, c.company_name, c.contact_name,
               COUNT(*) AS count, COALESCE(SUM(l.job_value), 0) AS value
        FROM leads l
        JOIN contractor_profiles c ON c.id = l.recipient_id
        WHERE l.tenant_id = $1 AND l.status = 'won'
          AND l.shared_at >= $2 AND l.shared_at < $3
          AND l.recipient_id IS NOT NULL
        GROUP BY l.recipient_id, c.company_name, c.contact_name
        ORDER BY SUM(l.job_value) DESC NULLS LAST
        LIMIT 5
        "#,
    )
    .bind(tenant_id)
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;

    let daily_activity: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT DATE(shared_at)::text, COUNT(*)
        FROM leads
        WHERE tenant_id = $1 AND shared_at >= $2 AND shared_at < $3
        GROUP BY DATE(shared_at)
        ORDER BY DATE(shared_at)
        "#,
    )
    .bind(tenant_id)
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;

    let total_referral_value = decimal_to_f64(total_referral_value);
    let response = DashboardResponse {
        metrics: DashboardMetrics {
            total_referral_value,
            active_members,
            total_members,
            activation_rate: if total_members > 0 {
                active_members as f64 / total_members as f64 * 100.0
            } else {
                0.0
            },
            leads_this_month,
            avg_response_time: avg_response_time
                .map(|d| decimal_to_f64(d).round() as i64)
                .unwrap_or(0),
            lead_conversion_rate: if total_leads > 0 {
                won_count as f64 / total_leads as f64 * 100.0
            } else {
                0.0
            },
            month_over_month_growth: growth_percent(total_referral_value, decimal_to_f64(prev_value)),
        },
        leaderboards: Leaderboards {
            top_referrers: top_referrers.into_iter().map(Into::into).collect(),
            top_receivers: top_receivers.into_iter().map(Into::into).collect(),
        },
        daily_activity: daily_activity
            .into_iter()
            .map(|(date, count)| DailyActivityPoint { date, count })
            .collect(),
        date_range: DateRange { from, to },
    };

    if let Err(e) = state.cache.set(&cache_key, &response).await {
        tracing::warn!(tenant_id = %tenant_id, error = %e, "Failed to cache dashboard");
    }

    Ok(Json(DataResponse::new(response)))
}
