//! Trade catalog types

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One entry in the global trade/specialty catalog
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub parent_id: Option<Uuid>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
