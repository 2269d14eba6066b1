//! Broadcast distribution
//!
//! Fans one lead out to multiple candidate recipients and resolves the
//! acceptance race. First acceptance wins: the winning update only succeeds
//! while the registration and the parent lead are still pending, and the same
//! transaction declines every other pending registration. A partial unique
//! index on (lead_id) WHERE status = 'accepted' backstops the invariant
//! against writers that bypass this path.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::leads::{
    expiry_due, BroadcastReply, LeadRecipientResponse, LeadStatus, RecipientStatus,
    RespondToBroadcastRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::services::lifecycle;

#[derive(Debug, sqlx::FromRow)]
struct RegistrationRow {
    id: Uuid,
    lead_id: Uuid,
    contractor_id: Uuid,
    company_name: Option<String>,
    status: String,
    notified_at: Option<DateTime<Utc>>,
    responded_at: Option<DateTime<Utc>>,
}

impl From<RegistrationRow> for LeadRecipientResponse {
    fn from(row: RegistrationRow) -> Self {
        Self {
            id: row.id,
            lead_id: row.lead_id,
            contractor_id: row.contractor_id,
            company_name: row.company_name,
            status: RecipientStatus::parse(&row.status),
            notified_at: row.notified_at,
            responded_at: row.responded_at,
        }
    }
}

const REGISTRATION_SELECT: &str = r#"
    SELECT r.id, r.lead_id, r.contractor_id, c.company_name, r.status,
           r.notified_at, r.responded_at
    FROM lead_recipients r
    JOIN contractor_profiles c ON c.id = r.contractor_id
"#;

/// Create one pending registration per candidate at lead-broadcast time.
pub(crate) async fn register_recipients(
    tx: &mut Transaction<'_, Postgres>,
    lead_id: Uuid,
    recipient_ids: &[Uuid],
    now: DateTime<Utc>,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO lead_recipients (lead_id, contractor_id, status, notified_at)
        SELECT $1, t.contractor_id, 'pending', $2
        FROM UNNEST($3::uuid[]) AS t(contractor_id)
        "#,
    )
    .bind(lead_id)
    .bind(now)
    .bind(recipient_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Fetch all registrations for a lead with contractor names.
pub async fn list_registrations(
    db: &PgPool,
    lead_id: Uuid,
) -> ApiResult<Vec<LeadRecipientResponse>> {
    let rows = sqlx::query_as::<_, RegistrationRow>(&format!(
        "{} WHERE r.lead_id = $1 ORDER BY r.created_at",
        REGISTRATION_SELECT
    ))
    .bind(lead_id)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Record one recipient's response to a broadcast lead.
pub async fn respond(
    db: &PgPool,
    lead_id: Uuid,
    req: RespondToBroadcastRequest,
) -> ApiResult<LeadRecipientResponse> {
    let now = Utc::now();
    let mut tx = db.begin().await?;

    // Locking the parent lead serializes concurrent responders; the
    // conditional registration update below stays in place for writers that
    // reach the table without this lock.
    let mut lead = lifecycle::fetch_lead_for_update(&mut tx, lead_id).await?;

    if !lead.is_broadcast {
        return Err(ApiError::invalid_argument("Lead is not a broadcast lead"));
    }

    if expiry_due(lead.status, lead.expires_at, now) {
        lifecycle::expire_locked(&mut tx, &lead, now).await?;
        lead.status = LeadStatus::Expired;
    }

    let registration: Option<RegistrationRow> = sqlx::query_as(&format!(
        "{} WHERE r.lead_id = $1 AND r.contractor_id = $2",
        REGISTRATION_SELECT
    ))
    .bind(lead_id)
    .bind(req.contractor_id)
    .fetch_optional(&mut *tx)
    .await?;

    let registration =
        registration.ok_or_else(|| ApiError::not_found("Recipient registration not found"))?;

    match req.response {
        BroadcastReply::Accepted => {
            match lead.status {
                LeadStatus::Pending => {}
                LeadStatus::Accepted => {
                    return Err(ApiError::already_claimed(
                        "Lead was already accepted by another recipient",
                    ));
                }
                other => {
                    return Err(ApiError::invalid_transition(format!(
                        "Lead is no longer open (status: {})",
                        other
                    )));
                }
            }

            let claimed = sqlx::query(
                r#"
                UPDATE lead_recipients SET status = 'accepted', responded_at = $2
                WHERE id = $1 AND status = 'pending'
                "#,
            )
            .bind(registration.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if claimed.rows_affected() != 1 {
                return Err(ApiError::already_claimed(
                    "Lead was already accepted by another recipient",
                ));
            }

            // Everyone else still pending loses the race in the same
            // transaction as the win.
            sqlx::query(
                r#"
                UPDATE lead_recipients SET status = 'declined', responded_at = $2
                WHERE lead_id = $1 AND status = 'pending'
                "#,
            )
            .bind(lead_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            lifecycle::apply_transition(
                &mut tx,
                &lead,
                LeadStatus::Accepted,
                Some(req.contractor_id),
                Some("Accepted broadcast lead"),
                now,
            )
            .await?;
        }
        BroadcastReply::Declined => {
            let declined = sqlx::query(
                r#"
                UPDATE lead_recipients SET status = 'declined', responded_at = $2
                WHERE id = $1 AND status = 'pending'
                "#,
            )
            .bind(registration.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if declined.rows_affected() != 1 {
                return Err(ApiError::invalid_transition(
                    "Registration has already been resolved",
                ));
            }
        }
    }

    let row: RegistrationRow = sqlx::query_as(&format!(
        "{} WHERE r.id = $1",
        REGISTRATION_SELECT
    ))
    .bind(registration.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        lead_id = %lead_id,
        contractor_id = %req.contractor_id,
        response = ?req.response,
        "Broadcast response recorded"
    );

    Ok(row.into())
}
