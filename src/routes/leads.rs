//! Lead routes
//!
//! The REST surface over the lead lifecycle engine: creation, listing,
//! detail, status transitions, job-value entry, broadcast responses and the
//! expiration sweep.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::{Created, DataResponse};
use crate::api::Paginated;
use crate::app::AppState;
use crate::domain::leads::{
    expiry_due, CreateLeadRequest, LeadDetailResponse, LeadDirection, LeadListQuery, LeadResponse,
    LeadStatus, RecordJobValueRequest, RespondToBroadcastRequest, StatusHistoryEntry,
    SweepResponse, TransitionLeadRequest,
};
use crate::error::ApiError;
use crate::services::lifecycle::{self, LeadRow, LEAD_SELECT};
use crate::services::broadcast;

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    previous_status: Option<LeadStatus>,
    new_status: LeadStatus,
    notes: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<HistoryRow> for StatusHistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            previous_status: row.previous_status,
            new_status: row.new_status,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

fn push_filters(builder: &mut sqlx::QueryBuilder<sqlx::Postgres>, query: &LeadListQuery) {
    builder.push(" WHERE l.tenant_id = ");
    builder.push_bind(query.tenant_id);

    if let Some(contractor_id) = query.contractor_id {
        match query.direction.unwrap_or(LeadDirection::All) {
            LeadDirection::Sent => {
                builder.push(" AND l.referrer_id = ");
                builder.push_bind(contractor_id);
            }
            LeadDirection::Received => {
                builder.push(" AND l.recipient_id = ");
                builder.push_bind(contractor_id);
            }
            LeadDirection::All => {
                builder.push(" AND (l.referrer_id = ");
                builder.push_bind(contractor_id);
                builder.push(" OR l.recipient_id = ");
                builder.push_bind(contractor_id);
                builder.push(")");
            }
        }
    }

    if let Some(status) = query.status {
        builder.push(" AND l.status = ");
        builder.push_bind(status);
    }
}

/// GET /leads
///
/// Tenant-scoped lead list with direction/status filters.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeadListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination = query.pagination();

    let mut count_builder = sqlx::QueryBuilder::new("SELECT COUNT(*) FROM leads l");
    push_filters(&mut count_builder, &query);
    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(&state.db)
        .await?;

    let mut list_builder = sqlx::QueryBuilder::new(LEAD_SELECT);
    push_filters(&mut list_builder, &query);
    list_builder.push(" ORDER BY l.shared_at DESC LIMIT ");
    list_builder.push_bind(pagination.limit() as i64);
    list_builder.push(" OFFSET ");
    list_builder.push_bind(pagination.offset() as i64);

    let rows: Vec<LeadRow> = list_builder.build_query_as().fetch_all(&state.db).await?;

    let leads: Vec<LeadResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Paginated::new(leads, &pagination, total as u64))
}

/// POST /leads
///
/// Create a direct or broadcast lead.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLeadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let lead = lifecycle::create_lead(&state.db, &state.cache, req).await?;
    Ok(Created(DataResponse::new(lead)))
}

/// GET /leads/:lead_id
///
/// Lead with full status history and broadcast registrations. Applies the
/// lazy expiration check before answering.
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut row = lifecycle::fetch_lead(&state.db, lead_id).await?;

    if expiry_due(row.status, row.expires_at, Utc::now()) {
        lifecycle::maybe_expire(&state.db, lead_id, Utc::now()).await?;
        row = lifecycle::fetch_lead(&state.db, lead_id).await?;
    }

    let history: Vec<HistoryRow> = sqlx::query_as(
        r#"
        SELECT id, previous_status, new_status, notes, created_by, created_at
        FROM lead_status_history
        WHERE lead_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(lead_id)
    .fetch_all(&state.db)
    .await?;

    let broadcast_recipients = if row.is_broadcast {
        broadcast::list_registrations(&state.db, lead_id).await?
    } else {
        Vec::new()
    };

    let detail = LeadDetailResponse {
        lead: row.into(),
        status_history: history.into_iter().map(Into::into).collect(),
        broadcast_recipients,
    };

    Ok(Json(DataResponse::new(detail)))
}

/// PATCH /leads/:lead_id/status
///
/// Apply one workflow transition.
pub async fn transition_lead(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<Uuid>,
    Json(req): Json<TransitionLeadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let lead = lifecycle::transition_lead(&state.db, lead_id, req).await?;
    Ok(Json(DataResponse::new(lead)))
}

/// POST /leads/:lead_id/job-value
///
/// Record the won job's value and calculate the commission.
pub async fn record_job_value(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<Uuid>,
    Json(req): Json<RecordJobValueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let lead = lifecycle::record_job_value(&state.db, &state.cache, lead_id, req).await?;
    Ok(Json(DataResponse::new(lead)))
}

/// POST /leads/:lead_id/respond
///
/// One broadcast recipient accepts or declines. First acceptance wins.
pub async fn respond_to_broadcast(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<Uuid>,
    Json(req): Json<RespondToBroadcastRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = broadcast::respond(&state.db, lead_id, req).await?;
    Ok(Json(DataResponse::new(registration)))
}

/// POST /leads/sweep-expired
///
/// Expire every overdue pending lead. Invoked by an external scheduler or
/// the built-in sweeper; safe to call repeatedly.
pub async fn sweep_expired(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let expired = lifecycle::sweep_expired(&state.db, Utc::now()).await?;
    Ok(Json(DataResponse::new(SweepResponse { expired })))
}
