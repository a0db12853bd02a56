use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Monitor interval, move timeout and pending TTL are non-zero
/// - Resolver poll intervals are non-zero and deadlines are not shorter than them
/// - Notifier URL, when set, parses as an absolute URL
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    let monitor = &config.monitor;
    if monitor.scan_interval_ms == 0 {
        return Err(invalid("monitor.scan_interval_ms must be greater than 0"));
    }
    if monitor.move_timeout_secs == 0 {
        return Err(invalid("monitor.move_timeout_secs must be greater than 0"));
    }
    if monitor.pending_ttl_secs == 0 {
        return Err(invalid("monitor.pending_ttl_secs must be greater than 0"));
    }

    let resolver = &config.resolver;
    for (name, interval, deadline) in [
        (
            "magnet",
            resolver.magnet_poll_interval_ms,
            resolver.magnet_deadline_ms,
        ),
        (
            "remote",
            resolver.remote_poll_interval_ms,
            resolver.remote_deadline_ms,
        ),
    ] {
        if interval == 0 {
            return Err(invalid(&format!(
                "resolver.{}_poll_interval_ms must be greater than 0",
                name
            )));
        }
        if deadline < interval {
            return Err(invalid(&format!(
                "resolver.{}_deadline_ms ({}) is shorter than its poll interval ({})",
                name, deadline, interval
            )));
        }
    }
    if resolver.recent_window == 0 {
        return Err(invalid("resolver.recent_window must be greater than 0"));
    }

    if let Some(url) = &config.notifier.url {
        reqwest::Url::parse(url)
            .map_err(|e| invalid(&format!("notifier.url is not a valid URL: {}", e)))?;
    }
    if config.notifier.timeout_ms == 0 {
        return Err(invalid("notifier.timeout_ms must be greater than 0"));
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
