use log::{error, info, warn};

use crate::config::Config;

pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

pub fn validate(config: &Config) -> bool {
    info!("Starting configuration validation...");

    // --- Validate Log level ---
    if !VALID_LOG_LEVELS
        .iter()
        .any(|lvl| lvl.eq_ignore_ascii_case(&config.log.level))
    {
        error!("Invalid log level: {}", config.log.level);
        return false;
    }

    // --- Validate listen address ---
    if config.listen.address.is_empty() {
        error!("Listen address is empty");
        return false;
    }

    // --- Validate listen port ---
    if config.listen.port == 0 || config.listen.port > 65535 {
        error!(
            "Invalid listen port: {} (must be between 1 and 65535)",
            config.listen.port
        );
        return false;
    }

    // --- Validate upstream settings ---
    if config.upstream.connect_timeout_ms == 0 {
        error!("Upstream connect timeout is invalid (0)");
        return false;
    }

    // Backend URLs themselves are parsed when the pool is built; a zero-entry
    // list is legal and only means every proxied request gets a 503.
    if config.backends.is_empty() {
        warn!("No backends configured; proxied requests will fail until one is added");
    }

    info!("Configuration validation passed successfully");

    true
}
