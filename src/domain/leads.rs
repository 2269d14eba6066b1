//! Lead domain types
//!
//! The lead is one referral of a customer from a referrer contractor to one or
//! more recipient contractors. Status moves through a fixed workflow; the
//! adjacency lives here so it can be validated without touching storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Status enums
// ============================================================================

/// Lead urgency class
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "lead_urgency", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadUrgency {
    Emergency,
    Today,
    ThisWeek,
    Flexible,
}

impl Default for LeadUrgency {
    fn default() -> Self {
        Self::ThisWeek
    }
}

/// Lead workflow status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "lead_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
    Contacted,
    Quoted,
    Won,
    Lost,
    Cancelled,
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeadStatus::Pending => write!(f, "pending"),
            LeadStatus::Accepted => write!(f, "accepted"),
            LeadStatus::Declined => write!(f, "declined"),
            LeadStatus::Expired => write!(f, "expired"),
            LeadStatus::Contacted => write!(f, "contacted"),
            LeadStatus::Quoted => write!(f, "quoted"),
            LeadStatus::Won => write!(f, "won"),
            LeadStatus::Lost => write!(f, "lost"),
            LeadStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl LeadStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LeadStatus::Won
                | LeadStatus::Lost
                | LeadStatus::Cancelled
                | LeadStatus::Declined
                | LeadStatus::Expired
        )
    }

    /// Whether a transition from `self` to `target` is in the workflow
    /// adjacency. Anything not listed here is rejected.
    pub fn can_transition_to(&self, target: LeadStatus) -> bool {
        use LeadStatus::*;
        matches!(
            (self, target),
            (Pending, Accepted)
                | (Pending, Declined)
                | (Pending, Expired)
                | (Pending, Cancelled)
                | (Accepted, Contacted)
                | (Accepted, Cancelled)
                | (Contacted, Quoted)
                | (Contacted, Cancelled)
                | (Quoted, Won)
                | (Quoted, Lost)
                | (Quoted, Cancelled)
        )
    }
}

/// Commission lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "commission_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Calculated,
    Disputed,
    Paid,
}

/// Per-recipient status on a broadcast lead (varchar in storage)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl std::fmt::Display for RecipientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecipientStatus::Pending => write!(f, "pending"),
            RecipientStatus::Accepted => write!(f, "accepted"),
            RecipientStatus::Declined => write!(f, "declined"),
            RecipientStatus::Expired => write!(f, "expired"),
        }
    }
}

impl RecipientStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "accepted" => RecipientStatus::Accepted,
            "declined" => RecipientStatus::Declined,
            "expired" => RecipientStatus::Expired,
            _ => RecipientStatus::Pending,
        }
    }
}

// ============================================================================
// Derived values
// ============================================================================

/// Minutes between the lead being shared and the recipient responding,
/// truncated toward zero.
pub fn response_time_minutes(shared_at: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
    ((now - shared_at).num_seconds() / 60) as i32
}

/// A pending lead past its expiration deadline is eligible for the automatic
/// transition to expired. Evaluated lazily on reads/writes and by the sweep;
/// both see the same answer.
pub fn expiry_due(status: LeadStatus, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    status == LeadStatus::Pending && expires_at.is_some_and(|deadline| now > deadline)
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Broadcast response choice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastReply {
    Accepted,
    Declined,
}

/// Create lead request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    pub tenant_id: Uuid,
    pub referrer_id: Uuid,
    /// One entry for a direct referral, two or more for a broadcast.
    pub recipient_ids: Vec<Uuid>,

    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub customer_city: Option<String>,
    pub customer_state: Option<String>,
    pub customer_zip_code: Option<String>,

    pub service_needed: String,
    #[serde(default)]
    pub urgency: LeadUrgency,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub notes: Option<String>,

    /// Broadcast is normally derived from the recipient count; an explicit
    /// flag with fewer than 2 recipients is rejected.
    pub is_broadcast: Option<bool>,
}

/// Status transition request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionLeadRequest {
    pub status: LeadStatus,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
}

/// Job value / commission entry request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordJobValueRequest {
    pub job_value: f64,
}

/// Broadcast response request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondToBroadcastRequest {
    pub contractor_id: Uuid,
    pub response: BroadcastReply,
}

/// List filter: which side of the referral a contractor is on
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeadDirection {
    Sent,
    Received,
    All,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadListQuery {
    pub tenant_id: Uuid,
    pub contractor_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub direction: Option<LeadDirection>,
    pub status: Option<LeadStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl LeadListQuery {
    pub fn pagination(&self) -> crate::api::pagination::PaginationParams {
        crate::api::pagination::PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Contractor reference embedded in lead responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorSummary {
    pub id: Uuid,
    pub company_name: String,
}

/// Lead response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub referrer: Option<ContractorSummary>,
    pub recipient: Option<ContractorSummary>,

    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub customer_city: Option<String>,
    pub customer_state: Option<String>,
    pub customer_zip_code: Option<String>,

    pub service_needed: String,
    pub urgency: LeadUrgency,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub notes: Option<String>,

    pub status: LeadStatus,
    pub is_broadcast: bool,

    pub shared_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub quoted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,

    pub job_value: Option<f64>,
    pub commission_rate: f64,
    pub commission_amount: Option<f64>,
    pub commission_status: CommissionStatus,
    pub commission_locked_at: Option<DateTime<Utc>>,
    pub commission_paid_at: Option<DateTime<Utc>>,

    pub response_time_minutes: Option<i32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One audit-trail entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub previous_status: Option<LeadStatus>,
    pub new_status: LeadStatus,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// One candidate recipient of a broadcast lead
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecipientResponse {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub contractor_id: Uuid,
    pub company_name: Option<String>,
    pub status: RecipientStatus,
    pub notified_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
}

/// Lead with full history and broadcast registrations
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDetailResponse {
    #[serde(flatten)]
    pub lead: LeadResponse,
    pub status_history: Vec<StatusHistoryEntry>,
    pub broadcast_recipients: Vec<LeadRecipientResponse>,
}

/// Result of an expiration sweep
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub expired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn pending_fans_out_to_four_states() {
        use LeadStatus::*;
        for target in [Accepted, Declined, Expired, Cancelled] {
            assert!(Pending.can_transition_to(target), "pending -> {target}");
        }
        assert!(!Pending.can_transition_to(Contacted));
        assert!(!Pending.can_transition_to(Won));
    }

    #[test]
    fn workflow_advances_one_step_at_a_time() {
        use LeadStatus::*;
        assert!(Accepted.can_transition_to(Contacted));
        assert!(Contacted.can_transition_to(Quoted));
        assert!(Quoted.can_transition_to(Won));
        assert!(Quoted.can_transition_to(Lost));

        // No skipping ahead or moving backwards
        assert!(!Accepted.can_transition_to(Quoted));
        assert!(!Accepted.can_transition_to(Won));
        assert!(!Contacted.can_transition_to(Accepted));
        assert!(!Won.can_transition_to(Pending));
    }

    #[test]
    fn cancellation_is_allowed_from_every_active_state() {
        use LeadStatus::*;
        for from in [Pending, Accepted, Contacted, Quoted] {
            assert!(from.can_transition_to(Cancelled), "{from} -> cancelled");
        }
    }

    #[test]
    fn terminal_states_accept_nothing() {
        use LeadStatus::*;
        let all = [
            Pending, Accepted, Declined, Expired, Contacted, Quoted, Won, Lost, Cancelled,
        ];
        for terminal in [Won, Lost, Cancelled, Declined, Expired] {
            assert!(terminal.is_terminal());
            for target in all {
                assert!(
                    !terminal.can_transition_to(target),
                    "{terminal} -> {target} should be rejected"
                );
            }
        }
    }

    #[test]
    fn recipient_status_parses_with_pending_fallback() {
        assert_eq!(RecipientStatus::parse("accepted"), RecipientStatus::Accepted);
        assert_eq!(RecipientStatus::parse("declined"), RecipientStatus::Declined);
        assert_eq!(RecipientStatus::parse("expired"), RecipientStatus::Expired);
        assert_eq!(RecipientStatus::parse("garbage"), RecipientStatus::Pending);
    }

    #[test]
    fn response_time_truncates_to_whole_minutes() {
        let shared = Utc::now();
        assert_eq!(
            response_time_minutes(shared, shared + Duration::minutes(25)),
            25
        );
        assert_eq!(
            response_time_minutes(shared, shared + Duration::seconds(25 * 60 + 59)),
            25
        );
    }

    #[test]
    fn expiry_is_due_only_for_pending_past_deadline() {
        let now = Utc::now();
        let deadline = now - Duration::minutes(1);

        assert!(expiry_due(LeadStatus::Pending, Some(deadline), now));
        // 90 minutes into a 2 hour window: not yet
        assert!(!expiry_due(
            LeadStatus::Pending,
            Some(now + Duration::minutes(30)),
            now
        ));
        assert!(!expiry_due(LeadStatus::Accepted, Some(deadline), now));
        assert!(!expiry_due(LeadStatus::Pending, None, now));
    }
}
