use reqwest::Url;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Target host is an absolute URL
/// - Request timeout is not 0
/// - Session identifiers and endpoints are non-empty
/// - Think-time range is not inverted
/// - At least one user is configured
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    Url::parse(&config.target.host).map_err(|e| {
        ConfigError::ValidationError(format!(
            "target.host '{}' is not a valid URL: {}",
            config.target.host, e
        ))
    })?;

    if config.target.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "target.timeout_secs cannot be 0".to_string(),
        ));
    }

    let session = &config.session;
    let required = [
        ("session.room", &session.room),
        ("session.cookie_name", &session.cookie_name),
        ("session.poll_url", &session.poll_url),
        ("session.refresh_url", &session.refresh_url),
        ("session.redirect_path", &session.redirect_path),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
    }

    if config.timing.think_time_min_ms > config.timing.think_time_max_ms {
        return Err(ConfigError::ValidationError(
            "timing.think_time_min_ms cannot exceed timing.think_time_max_ms".to_string(),
        ));
    }

    if config.backoff.max_admission_attempts == Some(0) {
        return Err(ConfigError::ValidationError(
            "backoff.max_admission_attempts must be at least 1 when set".to_string(),
        ));
    }

    if config.swarm.users == 0 {
        return Err(ConfigError::ValidationError(
            "swarm.users cannot be 0".to_string(),
        ));
    }

    Ok(())
}
