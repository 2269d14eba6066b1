//! Tenant routes
//!
//! Tenant lookup for branded entry pages, provisioning, and engine-settings
//! management.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::{Created, DataResponse};
use crate::app::AppState;
use crate::domain::tenants::{
    CreateTenantRequest, PublicTenantResponse, TenantResponse, TenantSettings,
    UpdateTenantSettingsRequest,
};
use crate::error::ApiError;
use crate::services::tenants as tenant_config;

#[derive(Debug, sqlx::FromRow)]
struct TenantRow {
    id: Uuid,
    slug: String,
    name: String,
    domain: Option<String>,
    settings: serde_json::Value,
    branding: serde_json::Value,
    status: String,
    trial_ends_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<TenantRow> for TenantResponse {
    fn from(row: TenantRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            domain: row.domain,
            settings: TenantSettings::from_json(&row.settings),
            branding: row.branding,
            status: row.status,
            trial_ends_at: row.trial_ends_at,
            created_at: row.created_at,
        }
    }
}

const TENANT_SELECT: &str = r#"
    SELECT id, slug, name, domain, settings, branding, status, trial_ends_at, created_at
    FROM tenants
"#;

#[derive(Debug, Deserialize)]
pub struct SlugQuery {
    pub slug: String,
}

/// GET /tenants?slug=
///
/// Public tenant lookup for branded landing pages; settings stay private.
pub async fn get_tenant_by_slug(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlugQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let row: Option<TenantRow> = sqlx::query_as(&format!("{} WHERE slug = $1", TENANT_SELECT))
        .bind(&query.slug)
        .fetch_optional(&state.db)
        .await?;

    let row = row.ok_or_else(|| ApiError::not_found("Tenant not found"))?;

    Ok(Json(DataResponse::new(PublicTenantResponse {
        id: row.id,
        slug: row.slug,
        name: row.name,
        branding: row.branding,
        status: row.status,
    })))
}

/// GET /tenants/:tenant_id
pub async fn get_tenant(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row: Option<TenantRow> = sqlx::query_as(&format!("{} WHERE id = $1", TENANT_SELECT))
        .bind(tenant_id)
        .fetch_optional(&state.db)
        .await?;

    let row = row.ok_or_else(|| ApiError::not_found("Tenant not found"))?;
    Ok(Json(DataResponse::new(TenantResponse::from(row))))
}

/// POST /tenants
///
/// Provision a new association with a 30-day trial.
pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTenantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() || req.slug.trim().is_empty() {
        return Err(ApiError::invalid_argument("Name and slug are required"));
    }

    let slug_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tenants WHERE slug = $1)")
            .bind(req.slug.trim())
            .fetch_one(&state.db)
            .await?;
    if slug_taken {
        return Err(ApiError::invalid_argument("Slug already exists"));
    }

    let settings = serde_json::to_value(req.settings.unwrap_or_default())
        .map_err(|e| ApiError::internal(format!("Failed to serialize settings: {}", e)))?;
    let branding = req.branding.unwrap_or_else(|| serde_json::json!({}));
    let trial_ends_at = Utc::now() + Duration::days(30);

    let row: TenantRow = sqlx::query_as(
        r#"
        INSERT INTO tenants (slug, name, domain, settings, branding, status, trial_ends_at)
        VALUES ($1, $2, $3, $4, $5, 'trial', $6)
        RETURNING id, slug, name, domain, settings, branding, status, trial_ends_at, created_at
        "#,
    )
    .bind(req.slug.trim())
    .bind(req.name.trim())
    .bind(&req.domain)
    .bind(&settings)
    .bind(&branding)
    .bind(trial_ends_at)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(tenant_id = %row.id, slug = %row.slug, "Tenant created");

    Ok(Created(DataResponse::new(TenantResponse::from(row))))
}

/// PATCH /tenants/:tenant_id/settings
///
/// Replace the engine settings. Existing leads keep their snapshotted
/// commission rate; only new leads see the change.
pub async fn update_tenant_settings(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<Uuid>,
    Json(req): Json<UpdateTenantSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.settings.commission_rate < 0.0 || req.settings.commission_rate > 100.0 {
        return Err(ApiError::invalid_argument(
            "Commission rate must be between 0 and 100",
        ));
    }
    if req.settings.auto_decline_hours < 1 {
        return Err(ApiError::invalid_argument(
            "Auto-decline window must be at least 1 hour",
        ));
    }
    if req.settings.max_broadcast_recipients < 2 {
        return Err(ApiError::invalid_argument(
            "Broadcast recipient cap must be at least 2",
        ));
    }

    let settings = serde_json::to_value(&req.settings)
        .map_err(|e| ApiError::internal(format!("Failed to serialize settings: {}", e)))?;

    let row: Option<TenantRow> = sqlx::query_as(
        r#"
        UPDATE tenants SET settings = $2
        WHERE id = $1
        RETURNING id, slug, name, domain, settings, branding, status, trial_ends_at, created_at
        "#,
    )
    .bind(tenant_id)
    .bind(&settings)
    .fetch_optional(&state.db)
    .await?;

    let row = row.ok_or_else(|| ApiError::not_found("Tenant not found"))?;

    tenant_config::invalidate(&state.cache, tenant_id).await;

    tracing::info!(tenant_id = %tenant_id, "Tenant settings updated");

    Ok(Json(DataResponse::new(TenantResponse::from(row))))
}
