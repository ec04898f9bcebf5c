//! System utilities and monitoring

/// Prometheus metrics
pub mod metrics;
