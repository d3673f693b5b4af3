use figment::{
    providers::{Env, Format, Toml},
    value::Uncased,
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Unprefixed variables older deployments set, and where they land.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("ROOM", "session.room"),
    ("COOKIE_NAME", "session.cookie_name"),
    ("TICKET_POLL_URL", "session.poll_url"),
    ("TICKET_REFRESH_URL", "session.refresh_url"),
    ("REDIRECT_PATH", "session.redirect_path"),
];

fn legacy_env() -> Env {
    let names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        LEGACY_ENV
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, path)| Uncased::from(*path))
            .unwrap_or_else(|| Uncased::from(key.as_str().to_string()))
    })
}

/// Load configuration from file with environment variable overrides.
///
/// Later sources win: the TOML file, then the legacy variables
/// (`ROOM`, `COOKIE_NAME`, ...), then `WAITROOM_` prefixed variables with
/// `__` separating nested keys (e.g. `WAITROOM_SWARM__USERS=100`).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(legacy_env())
        .merge(
            Env::prefixed("WAITROOM_")
                .ignore(&["config"])
                .split("__"),
        )
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
