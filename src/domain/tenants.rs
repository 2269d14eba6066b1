//! Tenant domain types
//!
//! One tenant per trade association. The settings jsonb carries the lead
//! engine configuration; unknown or malformed values fall back to defaults so
//! a half-edited settings blob can never take lead creation down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Engine configuration resolved from the tenant settings jsonb.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantSettings {
    /// Commission percentage owed to the referrer on a won job.
    pub commission_rate: f64,
    /// Hours before an unaccepted lead auto-expires.
    pub auto_decline_hours: i64,
    /// Days after commission calculation during which it may be disputed.
    pub dispute_period_days: i64,
    pub allow_broadcast_leads: bool,
    pub max_broadcast_recipients: usize,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            commission_rate: 10.0,
            auto_decline_hours: 2,
            dispute_period_days: 7,
            allow_broadcast_leads: true,
            max_broadcast_recipients: 5,
        }
    }
}

impl TenantSettings {
    /// Resolve settings from the raw jsonb column. Missing keys take the
    /// defaults; an unreadable blob resolves to all defaults.
    pub fn from_json(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

/// Full tenant record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantResponse {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub domain: Option<String>,
    pub settings: TenantSettings,
    pub branding: serde_json::Value,
    pub status: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Public subset returned for slug lookups (branded landing pages).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTenantResponse {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub branding: serde_json::Value,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantRequest {
    pub name: String,
    pub slug: String,
    pub domain: Option<String>,
    pub settings: Option<TenantSettings>,
    pub branding: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenantSettingsRequest {
    pub settings: TenantSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_settings_resolve_to_defaults() {
        let settings = TenantSettings::from_json(&json!({}));
        assert_eq!(settings, TenantSettings::default());
        assert_eq!(settings.commission_rate, 10.0);
        assert_eq!(settings.auto_decline_hours, 2);
        assert_eq!(settings.dispute_period_days, 7);
        assert_eq!(settings.max_broadcast_recipients, 5);
    }

    #[test]
    fn partial_settings_keep_remaining_defaults() {
        let settings = TenantSettings::from_json(&json!({
            "commissionRate": 12.5,
            "maxBroadcastRecipients": 8
        }));
        assert_eq!(settings.commission_rate, 12.5);
        assert_eq!(settings.max_broadcast_recipients, 8);
        assert_eq!(settings.auto_decline_hours, 2);
        assert!(settings.allow_broadcast_leads);
    }

    #[test]
    fn malformed_settings_fall_back_instead_of_erroring() {
        let settings = TenantSettings::from_json(&json!({"commissionRate": "lots"}));
        assert_eq!(settings, TenantSettings::default());
    }
}
