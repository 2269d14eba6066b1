//! Contractor directory routes

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::api::Paginated;
use crate::app::AppState;
use crate::domain::contractors::{
    ContractorAvailability, ContractorListQuery, ContractorResponse, ContractorStatus,
};
use crate::error::ApiError;
use crate::services::lifecycle::decimal_to_f64;

#[derive(Debug, sqlx::FromRow)]
struct ContractorRow {
    id: Uuid,
    tenant_id: Uuid,
    company_name: String,
    contact_name: Option<String>,
    company_phone: Option<String>,
    company_email: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    status: ContractorStatus,
    availability: ContractorAvailability,
    total_leads_sent: i32,
    total_leads_received: i32,
    total_earnings: Decimal,
    average_response_time: Option<i32>,
    reciprocity_score: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContractorRow> for ContractorResponse {
    fn from(row: ContractorRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            company_name: row.company_name,
            contact_name: row.contact_name,
            company_phone: row.company_phone,
            company_email: row.company_email,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            status: row.status,
            availability: row.availability,
            total_leads_sent: row.total_leads_sent,
            total_leads_received: row.total_leads_received,
            total_earnings: decimal_to_f64(row.total_earnings),
            average_response_time: row.average_response_time,
            reciprocity_score: decimal_to_f64(row.reciprocity_score),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const CONTRACTOR_SELECT: &str = r#"
    SELECT id, tenant_id, company_name, contact_name, company_phone, company_email,
           city, state, zip_code, status, availability,
           total_leads_sent, total_leads_received, total_earnings,
           average_response_time, reciprocity_score, created_at, updated_at
    FROM contractor_profiles
"#;

fn push_filters(builder: &mut sqlx::QueryBuilder<sqlx::Postgres>, query: &ContractorListQuery) {
    builder.push(" WHERE tenant_id = ");
    builder.push_bind(query.tenant_id);

    if let Some(status) = query.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    if let Some(availability) = query.availability {
        builder.push(" AND availability = ");
        builder.push_bind(availability);
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        builder.push(" AND (company_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR contact_name ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

/// GET /contractors
///
/// Tenant-scoped member list with status/availability/search filters.
pub async fn list_contractors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ContractorListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination = query.pagination();

    let mut count_builder = sqlx::QueryBuilder::new("SELECT COUNT(*) FROM contractor_profiles");
    push_filters(&mut count_builder, &query);
    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(&state.db)
        .await?;

    let mut list_builder = sqlx::QueryBuilder::new(CONTRACTOR_SELECT);
    push_filters(&mut list_builder, &query);
    list_builder.push(" ORDER BY company_name LIMIT ");
    list_builder.push_bind(pagination.limit() as i64);
    list_builder.push(" OFFSET ");
    list_builder.push_bind(pagination.offset() as i64);

    let rows: Vec<ContractorRow> = list_builder.build_query_as().fetch_all(&state.db).await?;

    let contractors: Vec<ContractorResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Paginated::new(contractors, &pagination, total as u64))
}

/// GET /contractors/:contractor_id
pub async fn get_contractor(
    State(state): State<Arc<AppState>>,
    Path(contractor_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row: Option<ContractorRow> =
        sqlx::query_as(&format!("{} WHERE id = $1", CONTRACTOR_SELECT))
            .bind(contractor_id)
            .fetch_optional(&state.db)
            .await?;

    let row = row.ok_or_else(|| ApiError::not_found("Contractor not found"))?;
    Ok(Json(DataResponse::new(ContractorResponse::from(row))))
}
