//! Tenant configuration resolution
//!
//! Settings are resolved once per operation into an immutable value, cached
//! in Redis, and invalidated when an admin edits them. Leads snapshot the
//! commission rate at creation, so a stale cache window can never rewrite the
//! economics of an existing lead.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::tenants::TenantSettings;
use crate::error::{ApiError, ApiResult};
use crate::services::cache::{keys, RedisCache};

/// Resolve the engine settings for a tenant, cache-first.
pub async fn get_settings(
    db: &PgPool,
    cache: &RedisCache,
    tenant_id: Uuid,
) -> ApiResult<TenantSettings> {
    let key = keys::tenant_settings(tenant_id);

    if let Some(settings) = cache.get::<TenantSettings>(&key).await {
        return Ok(settings);
    }

    let row: Option<(serde_json::Value,)> =
        sqlx::query_as("SELECT settings FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(db)
            .await?;

    let raw = row.ok_or_else(|| ApiError::not_found("Tenant not found"))?.0;
    let settings = TenantSettings::from_json(&raw);

    if let Err(e) = cache.set(&key, &settings).await {
        tracing::warn!(tenant_id = %tenant_id, error = %e, "Failed to cache tenant settings");
    }

    Ok(settings)
}

/// Drop every cached value for a tenant after its settings change.
pub async fn invalidate(cache: &RedisCache, tenant_id: Uuid) {
    if let Err(e) = cache.delete_pattern(&keys::tenant_pattern(tenant_id)).await {
        tracing::warn!(tenant_id = %tenant_id, error = %e, "Failed to invalidate tenant cache");
    }
}
