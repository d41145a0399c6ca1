//! API layer
//!
//! HTTP handlers for:
//! - Registration and local login
//! - Profile (session check)
//! - Metrics (Prometheus)

mod accounts;
mod metrics;
mod profile;

pub use accounts::account_router;
pub use metrics::metrics_router;
pub use profile::profile_router;
