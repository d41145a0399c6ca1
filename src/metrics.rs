//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Authentication Metrics
    pub static ref AUTH_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("gatehouse_auth_attempts_total", "Total number of authentication attempts"),
        &["strategy", "outcome"]
    ).expect("metric can be created");

    // Session Metrics
    pub static ref SESSIONS_ESTABLISHED_TOTAL: IntCounter = IntCounter::new(
        "gatehouse_sessions_established_total",
        "Total number of sessions established"
    ).expect("metric can be created");
    pub static ref SESSIONS_PURGED_TOTAL: IntCounter = IntCounter::new(
        "gatehouse_sessions_purged_total",
        "Total number of expired sessions purged"
    ).expect("metric can be created");

    // Application Metrics
    pub static ref USERS_TOTAL: IntGauge = IntGauge::new(
        "gatehouse_users_total",
        "Total number of registered users"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("gatehouse_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(AUTH_ATTEMPTS_TOTAL.clone()))
        .expect("AUTH_ATTEMPTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_ESTABLISHED_TOTAL.clone()))
        .expect("SESSIONS_ESTABLISHED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_PURGED_TOTAL.clone()))
        .expect("SESSIONS_PURGED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(USERS_TOTAL.clone()))
        .expect("USERS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
