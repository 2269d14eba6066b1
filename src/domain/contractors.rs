//! Contractor domain types
//!
//! Member directory entries. The lead engine treats a contractor as an opaque
//! id plus the denormalized aggregate counters on the profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "contractor_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContractorStatus {
    Pending,
    Active,
    Suspended,
    Inactive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "contractor_availability", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContractorAvailability {
    Accepting,
    AtCapacity,
    EmergencyOnly,
}

/// Contractor profile response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub company_phone: Option<String>,
    pub company_email: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub status: ContractorStatus,
    pub availability: ContractorAvailability,

    pub total_leads_sent: i32,
    pub total_leads_received: i32,
    pub total_earnings: f64,
    pub average_response_time: Option<i32>,
    pub reciprocity_score: f64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contractor list filters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorListQuery {
    pub tenant_id: Uuid,
    pub status: Option<ContractorStatus>,
    pub availability: Option<ContractorAvailability>,
    /// Case-insensitive match against company or contact name.
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ContractorListQuery {
    pub fn pagination(&self) -> crate::api::pagination::PaginationParams {
        crate::api::pagination::PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
