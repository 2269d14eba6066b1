//! Service layer
//!
//! The lead lifecycle engine (orchestration, state transitions, broadcast
//! race resolution, commission math, stats refresh) plus the Redis cache and
//! tenant-configuration resolution it leans on.

pub mod broadcast;
pub mod cache;
pub mod commission;
pub mod lifecycle;
pub mod stats;
pub mod tenants;

pub use cache::RedisCache;
