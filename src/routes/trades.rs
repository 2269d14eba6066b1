//! Trade catalog routes

use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::domain::trades::TradeResponse;
use crate::error::ApiError;

#[derive(Debug, sqlx::FromRow)]
struct TradeRow {
    id: Uuid,
    name: String,
    slug: String,
    category: String,
    description: Option<String>,
    icon: Option<String>,
    parent_id: Option<Uuid>,
    sort_order: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<TradeRow> for TradeResponse {
    fn from(row: TradeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            category: row.category,
            description: row.description,
            icon: row.icon,
            parent_id: row.parent_id,
            sort_order: row.sort_order,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// GET /trades
///
/// Active trades, ordered for display.
pub async fn list_trades(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows: Vec<TradeRow> = sqlx::query_as(
        r#"
        SELECT id, name, slug, category, description, icon, parent_id,
               sort_order, is_active, created_at
        FROM trades
        WHERE is_active
        ORDER BY sort_order, name
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let trades: Vec<TradeResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(DataResponse::new(trades)))
}
