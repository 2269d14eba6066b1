pub mod contractors;
pub mod dashboard;
pub mod health;
pub mod leads;
pub mod tenants;
pub mod trades;

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Leads (the lifecycle engine surface)
        .route("/leads", post(leads::create_lead))
        .route("/leads", get(leads::list_leads))
        .route("/leads/sweep-expired", post(leads::sweep_expired))
        .route("/leads/:lead_id", get(leads::get_lead))
        .route("/leads/:lead_id/status", patch(leads::transition_lead))
        .route("/leads/:lead_id/job-value", post(leads::record_job_value))
        .route("/leads/:lead_id/respond", post(leads::respond_to_broadcast))
        // Tenants
        .route("/tenants", get(tenants::get_tenant_by_slug))
        .route("/tenants", post(tenants::create_tenant))
        .route("/tenants/:tenant_id", get(tenants::get_tenant))
        .route(
            "/tenants/:tenant_id/settings",
            patch(tenants::update_tenant_settings),
        )
        // Contractor directory
        .route("/contractors", get(contractors::list_contractors))
        .route("/contractors/:contractor_id", get(contractors::get_contractor))
        // Trade catalog
        .route("/trades", get(trades::list_trades))
        // Association admin
        .route("/admin/dashboard", get(dashboard::get_dashboard))
}
