//! Core application configuration

/// Application configuration
pub mod config;

// Re-export commonly used items
pub use config::{Config, ConfigSource, StoreBackend, StoreConfig, DEFAULT_CONFIG_FILE};
