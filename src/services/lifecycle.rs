//! Lead lifecycle orchestration
//!
//! Entry points for every lead-affecting mutation: creation, status
//! transitions, job-value entry and the expiration sweep. Each operation runs
//! as a single transaction (read current state row-locked, validate, write,
//! append history) so a failure leaves the lead and its audit trail exactly
//! as they were.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::leads::{
    expiry_due, response_time_minutes, CommissionStatus, ContractorSummary, CreateLeadRequest,
    LeadResponse, LeadStatus, LeadUrgency, RecordJobValueRequest, TransitionLeadRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::services::cache::RedisCache;
use crate::services::{broadcast, commission, stats, tenants};

// ============================================================================
// Row mapping
// ============================================================================

/// Lead row joined with both contractor company names.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LeadRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub referrer_id: Uuid,
    pub recipient_id: Option<Uuid>,

    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub customer_city: Option<String>,
    pub customer_state: Option<String>,
    pub customer_zip_code: Option<String>,

    pub service_needed: String,
    pub urgency: LeadUrgency,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub notes: Option<String>,

    pub status: LeadStatus,
    pub is_broadcast: bool,

    pub shared_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub quoted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,

    pub job_value: Option<Decimal>,
    pub commission_rate: Decimal,
    pub commission_amount: Option<Decimal>,
    pub commission_status: CommissionStatus,
    pub commission_locked_at: Option<DateTime<Utc>>,
    pub commission_paid_at: Option<DateTime<Utc>>,

    pub response_time_minutes: Option<i32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub referrer_company_name: String,
    pub recipient_company_name: Option<String>,
}

/// Shared SELECT for leads; always joins the contractor names so a row maps
/// straight to a response.
pub(crate) const LEAD_SELECT: &str = r#"
    SELECT l.id, l.tenant_id, l.referrer_id, l.recipient_id,
           l.customer_name, l.customer_phone, l.customer_email, l.customer_address,
           l.customer_city, l.customer_state, l.customer_zip_code,
           l.service_needed, l.urgency, l.budget_min, l.budget_max, l.notes,
           l.status, l.is_broadcast,
           l.shared_at, l.accepted_at, l.contacted_at, l.quoted_at, l.completed_at,
           l.expires_at,
           l.job_value, l.commission_rate, l.commission_amount, l.commission_status,
           l.commission_locked_at, l.commission_paid_at,
           l.response_time_minutes, l.created_at, l.updated_at,
           sender.company_name AS referrer_company_name,
           receiver.company_name AS recipient_company_name
    FROM leads l
    JOIN contractor_profiles sender ON sender.id = l.referrer_id
    LEFT JOIN contractor_profiles receiver ON receiver.id = l.recipient_id
"#;

pub(crate) fn decimal_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

pub(crate) fn decimal_opt_to_f64(d: Option<Decimal>) -> Option<f64> {
    d.map(decimal_to_f64)
}

impl From<LeadRow> for LeadResponse {
    fn from(row: LeadRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            referrer: Some(ContractorSummary {
                id: row.referrer_id,
                company_name: row.referrer_company_name,
            }),
            recipient: row.recipient_id.map(|id| ContractorSummary {
                id,
                company_name: row.recipient_company_name.unwrap_or_default(),
            }),
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_email: row.customer_email,
            customer_address: row.customer_address,
            customer_city: row.customer_city,
            customer_state: row.customer_state,
            customer_zip_code: row.customer_zip_code,
            service_needed: row.service_needed,
            urgency: row.urgency,
            budget_min: decimal_opt_to_f64(row.budget_min),
            budget_max: decimal_opt_to_f64(row.budget_max),
            notes: row.notes,
            status: row.status,
            is_broadcast: row.is_broadcast,
            shared_at: row.shared_at,
            accepted_at: row.accepted_at,
            contacted_at: row.contacted_at,
            quoted_at: row.quoted_at,
            completed_at: row.completed_at,
            expires_at: row.expires_at,
            job_value: decimal_opt_to_f64(row.job_value),
            commission_rate: decimal_to_f64(row.commission_rate),
            commission_amount: decimal_opt_to_f64(row.commission_amount),
            commission_status: row.commission_status,
            commission_locked_at: row.commission_locked_at,
            commission_paid_at: row.commission_paid_at,
            response_time_minutes: row.response_time_minutes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(crate) async fn fetch_lead(db: &PgPool, lead_id: Uuid) -> ApiResult<LeadRow> {
    sqlx::query_as::<_, LeadRow>(&format!("{} WHERE l.id = $1", LEAD_SELECT))
        .bind(lead_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Lead not found"))
}

pub(crate) async fn fetch_lead_for_update(
    tx: &mut Transaction<'_, Postgres>,
    lead_id: Uuid,
) -> ApiResult<LeadRow> {
    sqlx::query_as::<_, LeadRow>(&format!("{} WHERE l.id = $1 FOR UPDATE OF l", LEAD_SELECT))
        .bind(lead_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Lead not found"))
}

// ============================================================================
// Creation
// ============================================================================

pub async fn create_lead(
    db: &PgPool,
    cache: &RedisCache,
    req: CreateLeadRequest,
) -> ApiResult<LeadResponse> {
    if req.customer_name.trim().is_empty() {
        return Err(ApiError::invalid_argument("Customer name is required"));
    }
    if req.customer_phone.trim().is_empty() {
        return Err(ApiError::invalid_argument("Customer phone is required"));
    }
    if req.service_needed.trim().is_empty() {
        return Err(ApiError::invalid_argument("Service description is required"));
    }

    let mut recipient_ids = req.recipient_ids.clone();
    recipient_ids.sort();
    recipient_ids.dedup();
    if recipient_ids.is_empty() {
        return Err(ApiError::invalid_argument("At least one recipient is required"));
    }

    let settings = tenants::get_settings(db, cache, req.tenant_id).await?;

    let is_broadcast = req.is_broadcast.unwrap_or(false) || recipient_ids.len() > 1;
    if is_broadcast {
        if recipient_ids.len() < 2 {
            return Err(ApiError::limit_exceeded(
                "A broadcast lead requires at least 2 recipients",
            ));
        }
        if !settings.allow_broadcast_leads {
            return Err(ApiError::invalid_argument(
                "Broadcast leads are disabled for this tenant",
            ));
        }
        if recipient_ids.len() > settings.max_broadcast_recipients {
            return Err(ApiError::limit_exceeded(format!(
                "Broadcast allows at most {} recipients",
                settings.max_broadcast_recipients
            )));
        }
    }

    let now = Utc::now();
    let expires_at = now + Duration::hours(settings.auto_decline_hours);
    let commission_rate = Decimal::from_f64_retain(settings.commission_rate)
        .unwrap_or_else(|| Decimal::from(10))
        .clamp(Decimal::ZERO, Decimal::from(100))
        .round_dp(2);
    let recipient_id = if is_broadcast {
        None
    } else {
        Some(recipient_ids[0])
    };

    let mut tx = db.begin().await?;

    let referrer_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM contractor_profiles WHERE id = $1 AND tenant_id = $2)",
    )
    .bind(req.referrer_id)
    .bind(req.tenant_id)
    .fetch_one(&mut *tx)
    .await?;
    if !referrer_exists {
        return Err(ApiError::not_found("Referrer not found"));
    }

    let known_recipients: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM contractor_profiles WHERE id = ANY($1) AND tenant_id = $2",
    )
    .bind(&recipient_ids)
    .bind(req.tenant_id)
    .fetch_one(&mut *tx)
    .await?;
    if known_recipients != recipient_ids.len() as i64 {
        return Err(ApiError::not_found("One or more recipients not found"));
    }

    let lead_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO leads (
            tenant_id, referrer_id, recipient_id,
            customer_name, customer_phone, customer_email, customer_address,
            customer_city, customer_state, customer_zip_code,
            service_needed, urgency, budget_min, budget_max, notes,
            is_broadcast, shared_at, expires_at, commission_rate,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $17, $17)
        RETURNING id
        "#,
    )
    .bind(req.tenant_id)
    .bind(req.referrer_id)
    .bind(recipient_id)
    .bind(req.customer_name.trim())
    .bind(req.customer_phone.trim())
    .bind(&req.customer_email)
    .bind(&req.customer_address)
    .bind(&req.customer_city)
    .bind(&req.customer_state)
    .bind(&req.customer_zip_code)
    .bind(req.service_needed.trim())
    .bind(req.urgency)
    .bind(req.budget_min.and_then(Decimal::from_f64_retain))
    .bind(req.budget_max.and_then(Decimal::from_f64_retain))
    .bind(&req.notes)
    .bind(is_broadcast)
    .bind(now)
    .bind(expires_at)
    .bind(commission_rate)
    .fetch_one(&mut *tx)
    .await?;

    if is_broadcast {
        broadcast::register_recipients(&mut tx, lead_id, &recipient_ids, now).await?;
    }

    append_history(
        &mut tx,
        lead_id,
        None,
        LeadStatus::Pending,
        Some("Lead created"),
        Some(req.referrer_id),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        lead_id = %lead_id,
        tenant_id = %req.tenant_id,
        referrer_id = %req.referrer_id,
        is_broadcast = is_broadcast,
        recipients = recipient_ids.len(),
        "Lead created"
    );

    Ok(fetch_lead(db, lead_id).await?.into())
}

// ============================================================================
// Status transitions
// ============================================================================

/// Append one audit-trail entry. Exactly one call per accepted transition.
pub(crate) async fn append_history(
    tx: &mut Transaction<'_, Postgres>,
    lead_id: Uuid,
    previous: Option<LeadStatus>,
    new_status: LeadStatus,
    notes: Option<&str>,
    created_by: Option<Uuid>,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO lead_status_history (lead_id, previous_status, new_status, notes, created_by)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(lead_id)
    .bind(previous)
    .bind(new_status)
    .bind(notes)
    .bind(created_by)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Validate and apply one transition inside an open transaction. The caller
/// must hold the row lock on the lead; `lead` is the locked snapshot.
pub(crate) async fn apply_transition(
    tx: &mut Transaction<'_, Postgres>,
    lead: &LeadRow,
    target: LeadStatus,
    actor_id: Option<Uuid>,
    note: Option<&str>,
    now: DateTime<Utc>,
) -> ApiResult<()> {
    if !lead.status.can_transition_to(target) {
        return Err(ApiError::invalid_transition(format!(
            "Cannot move lead from {} to {}",
            lead.status, target
        )));
    }

    let updated = match target {
        LeadStatus::Accepted => {
            let minutes = response_time_minutes(lead.shared_at, now);
            sqlx::query(
                r#"
                UPDATE leads
                SET status = $2, accepted_at = $3, response_time_minutes = $4, updated_at = $3
                WHERE id = $1 AND status = $5
                "#,
            )
            .bind(lead.id)
            .bind(target)
            .bind(now)
            .bind(minutes)
            .bind(lead.status)
            .execute(&mut **tx)
            .await?
        }
        LeadStatus::Contacted => {
            sqlx::query(
                "UPDATE leads SET status = $2, contacted_at = $3, updated_at = $3 WHERE id = $1 AND status = $4",
            )
            .bind(lead.id)
            .bind(target)
            .bind(now)
            .bind(lead.status)
            .execute(&mut **tx)
            .await?
        }
        LeadStatus::Quoted => {
            sqlx::query(
                "UPDATE leads SET status = $2, quoted_at = $3, updated_at = $3 WHERE id = $1 AND status = $4",
            )
            .bind(lead.id)
            .bind(target)
            .bind(now)
            .bind(lead.status)
            .execute(&mut **tx)
            .await?
        }
        LeadStatus::Won | LeadStatus::Lost => {
            sqlx::query(
                "UPDATE leads SET status = $2, completed_at = $3, updated_at = $3 WHERE id = $1 AND status = $4",
            )
            .bind(lead.id)
            .bind(target)
            .bind(now)
            .bind(lead.status)
            .execute(&mut **tx)
            .await?
        }
        _ => {
            sqlx::query(
                "UPDATE leads SET status = $2, updated_at = $3 WHERE id = $1 AND status = $4",
            )
            .bind(lead.id)
            .bind(target)
            .bind(now)
            .bind(lead.status)
            .execute(&mut **tx)
            .await?
        }
    };

    if updated.rows_affected() != 1 {
        return Err(ApiError::internal("Lead changed under an open transaction"));
    }

    append_history(tx, lead.id, Some(lead.status), target, note, actor_id).await?;

    Ok(())
}

/// Transition a pending-but-overdue lead to expired, including its pending
/// broadcast registrations. Caller holds the row lock.
pub(crate) async fn expire_locked(
    tx: &mut Transaction<'_, Postgres>,
    lead: &LeadRow,
    now: DateTime<Utc>,
) -> ApiResult<()> {
    apply_transition(
        tx,
        lead,
        LeadStatus::Expired,
        None,
        Some("Auto-declined after expiration window"),
        now,
    )
    .await?;

    sqlx::query("UPDATE lead_recipients SET status = 'expired' WHERE lead_id = $1 AND status = 'pending'")
        .bind(lead.id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

pub async fn transition_lead(
    db: &PgPool,
    lead_id: Uuid,
    req: TransitionLeadRequest,
) -> ApiResult<LeadResponse> {
    let now = Utc::now();
    let mut tx = db.begin().await?;

    let mut lead = fetch_lead_for_update(&mut tx, lead_id).await?;

    // Lazy expiration: an overdue pending lead expires before the requested
    // transition is judged, so callers see the same outcome a sweep would
    // have produced.
    if expiry_due(lead.status, lead.expires_at, now) {
        expire_locked(&mut tx, &lead, now).await?;
        lead.status = LeadStatus::Expired;
    }

    apply_transition(&mut tx, &lead, req.status, req.actor_id, req.note.as_deref(), now).await?;

    tx.commit().await?;

    tracing::info!(
        lead_id = %lead_id,
        from = %lead.status,
        to = %req.status,
        "Lead status updated"
    );

    if req.status == LeadStatus::Won {
        stats::refresh_after_won(db, lead.referrer_id, lead.recipient_id).await;
    }

    Ok(fetch_lead(db, lead_id).await?.into())
}

// ============================================================================
// Job value / commission
// ============================================================================

pub async fn record_job_value(
    db: &PgPool,
    cache: &RedisCache,
    lead_id: Uuid,
    req: RecordJobValueRequest,
) -> ApiResult<LeadResponse> {
    if !req.job_value.is_finite() {
        return Err(ApiError::invalid_argument("Job value is not a valid amount"));
    }
    let job_value = Decimal::from_f64_retain(req.job_value)
        .ok_or_else(|| ApiError::invalid_argument("Job value is not a valid amount"))?
        .round_dp(2);

    let now = Utc::now();
    let mut tx = db.begin().await?;

    let lead = fetch_lead_for_update(&mut tx, lead_id).await?;
    let settings = tenants::get_settings(db, cache, lead.tenant_id).await?;

    // Commission uses the rate snapshotted at creation, not the tenant's
    // current one.
    let amount = commission::calculate_commission(job_value, lead.commission_rate)?;
    let locked_at = now + Duration::days(settings.dispute_period_days);

    sqlx::query(
        r#"
        UPDATE leads
        SET job_value = $2, commission_amount = $3, commission_status = 'calculated',
            commission_locked_at = $4, updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(lead_id)
    .bind(job_value)
    .bind(amount)
    .bind(locked_at)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        lead_id = %lead_id,
        job_value = %job_value,
        commission_amount = %amount,
        "Job value recorded, commission calculated"
    );

    Ok(fetch_lead(db, lead_id).await?.into())
}

// ============================================================================
// Expiration
// ============================================================================

/// Expire one lead if it is pending and overdue. Safe to call redundantly;
/// returns whether this call performed the expiration.
pub async fn maybe_expire(db: &PgPool, lead_id: Uuid, now: DateTime<Utc>) -> ApiResult<bool> {
    let mut tx = db.begin().await?;

    let expired: Option<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE leads SET status = 'expired', updated_at = $2
        WHERE id = $1 AND status = 'pending' AND expires_at IS NOT NULL AND expires_at < $2
        RETURNING id
        "#,
    )
    .bind(lead_id)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(lead_id) = expired else {
        return Ok(false);
    };

    append_history(
        &mut tx,
        lead_id,
        Some(LeadStatus::Pending),
        LeadStatus::Expired,
        Some("Auto-declined after expiration window"),
        None,
    )
    .await?;

    sqlx::query("UPDATE lead_recipients SET status = 'expired' WHERE lead_id = $1 AND status = 'pending'")
        .bind(lead_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(lead_id = %lead_id, "Lead expired");
    Ok(true)
}

/// Expire every overdue pending lead. Idempotent: a second sweep with the
/// same `now` finds nothing left to expire.
pub async fn sweep_expired(db: &PgPool, now: DateTime<Utc>) -> ApiResult<u64> {
    let mut tx = db.begin().await?;

    let expired: Vec<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE leads SET status = 'expired', updated_at = $1
        WHERE status = 'pending' AND expires_at IS NOT NULL AND expires_at < $1
        RETURNING id
        "#,
    )
    .bind(now)
    .fetch_all(&mut *tx)
    .await?;

    if !expired.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO lead_status_history (lead_id, previous_status, new_status, notes)
            SELECT t.lead_id, 'pending'::lead_status, 'expired'::lead_status, $2
            FROM UNNEST($1::uuid[]) AS t(lead_id)
            "#,
        )
        .bind(&expired)
        .bind("Auto-declined after expiration window")
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE lead_recipients SET status = 'expired' WHERE status = 'pending' AND lead_id = ANY($1)",
        )
        .bind(&expired)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    if !expired.is_empty() {
        tracing::info!(count = expired.len(), "Expired overdue leads");
    }

    Ok(expired.len() as u64)
}
