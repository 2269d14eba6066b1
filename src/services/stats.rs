//! Contractor aggregate refresh
//!
//! Keeps the denormalized counters on contractor_profiles in line with the
//! leads table after a lead is won. Recomputes from source rows rather than
//! incrementing, so re-running after a retry or crash converges to the same
//! values. Callers treat every failure here as log-and-continue; a counter
//! refresh must never fail a lead update.

use sqlx::PgPool;
use uuid::Uuid;

/// Recompute all aggregates for one contractor from the leads table.
pub async fn refresh_contractor_stats(db: &PgPool, contractor_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE contractor_profiles c
        SET total_leads_sent = s.sent_won,
            total_leads_received = s.received_won,
            total_earnings = s.earnings,
            average_response_time = s.avg_response,
            reciprocity_score = COALESCE(
                ROUND(s.sent_won::numeric / NULLIF(s.received_won, 0), 2),
                1.00
            ),
            updated_at = NOW()
        FROM (
            SELECT
                COUNT(*) FILTER (WHERE l.referrer_id = $1 AND l.status = 'won') AS sent_won,
                COUNT(*) FILTER (WHERE l.recipient_id = $1 AND l.status = 'won') AS received_won,
                COALESCE(
                    SUM(l.commission_amount)
                        FILTER (WHERE l.referrer_id = $1 AND l.status = 'won'),
                    0
                ) AS earnings,
                CAST(
                    AVG(l.response_time_minutes) FILTER (WHERE l.recipient_id = $1) AS INTEGER
                ) AS avg_response
            FROM leads l
            WHERE l.referrer_id = $1 OR l.recipient_id = $1
        ) s
        WHERE c.id = $1
        "#,
    )
    .bind(contractor_id)
    .execute(db)
    .await?;

    tracing::debug!(contractor_id = %contractor_id, "Contractor stats refreshed");
    Ok(())
}

/// Best-effort refresh for both sides of a won lead. Broadcast leads keep a
/// null recipient on the parent row, so only the referrer side runs for them.
pub async fn refresh_after_won(db: &PgPool, referrer_id: Uuid, recipient_id: Option<Uuid>) {
    if let Err(e) = refresh_contractor_stats(db, referrer_id).await {
        tracing::warn!(contractor_id = %referrer_id, error = %e, "Referrer stats refresh failed");
    }

    if let Some(recipient_id) = recipient_id {
        if let Err(e) = refresh_contractor_stats(db, recipient_id).await {
            tracing::warn!(contractor_id = %recipient_id, error = %e, "Recipient stats refresh failed");
        }
    }
}
