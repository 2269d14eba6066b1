//! Domain types and DTOs
//!
//! Data structures for the referral network entities: tenants, contractors,
//! trades, leads and the dashboard read models.

pub mod contractors;
pub mod dashboard;
pub mod leads;
pub mod tenants;
pub mod trades;
