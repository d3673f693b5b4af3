use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub target: TargetConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub swarm: SwarmConfig,
}

/// Where the waiting room and the protected site live.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Base URL relative paths are resolved against (e.g., "http://localhost:8080").
    pub host: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Per-visit settings shared read-only by every virtual user of a run.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SessionConfig {
    /// Room identifier sent when joining the queue.
    pub room: String,
    /// Cookie the protected site expects the admission token under.
    pub cookie_name: String,
    /// Ticket request endpoint (POST, `?room=` appended).
    pub poll_url: String,
    /// Ticket check-in endpoint (PUT).
    pub refresh_url: String,
    /// Protected path fetched with the admission cookie.
    pub redirect_path: String,
    /// Static documents fetched before joining the queue.
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,
    /// Retry on 503/429 from the ticket request instead of failing.
    #[serde(default = "default_true")]
    pub poll_backoff: bool,
    /// Release the ticket (DELETE) once it has been processed.
    #[serde(default)]
    pub release_on_processed: bool,
}

fn default_assets() -> Vec<String> {
    vec!["/".to_string(), "/main.css".to_string(), "/main.js".to_string()]
}

fn default_true() -> bool {
    true
}

/// Admission backoff settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BackoffConfig {
    /// Fixed wait after a 503 (queue at capacity).
    #[serde(default = "default_busy_interval")]
    pub busy_interval_ms: u64,
    /// Upper bound (exclusive) of the random wait after a 429.
    #[serde(default = "default_rate_limited_max")]
    pub rate_limited_max_ms: u64,
    /// Give up after this many consecutive admission signals (absent = never).
    #[serde(default)]
    pub max_admission_attempts: Option<u32>,
}

fn default_busy_interval() -> u64 {
    10_000
}

fn default_rate_limited_max() -> u64 {
    2_000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            busy_interval_ms: default_busy_interval(),
            rate_limited_max_ms: default_rate_limited_max(),
            max_admission_attempts: None,
        }
    }
}

impl BackoffConfig {
    pub fn busy_interval(&self) -> Duration {
        Duration::from_millis(self.busy_interval_ms)
    }

    pub fn rate_limited_max(&self) -> Duration {
        Duration::from_millis(self.rate_limited_max_ms)
    }
}

/// Session pacing.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "default_think_min")]
    pub think_time_min_ms: u64,
    #[serde(default = "default_think_max")]
    pub think_time_max_ms: u64,
    /// Pause applied before a failed iteration is reported.
    #[serde(default = "default_cooldown")]
    pub failure_cooldown_ms: u64,
}

fn default_think_min() -> u64 {
    2_000
}

fn default_think_max() -> u64 {
    4_000
}

fn default_cooldown() -> u64 {
    5_000
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            think_time_min_ms: default_think_min(),
            think_time_max_ms: default_think_max(),
            failure_cooldown_ms: default_cooldown(),
        }
    }
}

impl TimingConfig {
    pub fn think_time_min(&self) -> Duration {
        Duration::from_millis(self.think_time_min_ms)
    }

    pub fn think_time_max(&self) -> Duration {
        Duration::from_millis(self.think_time_max_ms)
    }

    pub fn failure_cooldown(&self) -> Duration {
        Duration::from_millis(self.failure_cooldown_ms)
    }
}

/// How many virtual users to run and for how long.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SwarmConfig {
    #[serde(default = "default_users")]
    pub users: usize,
    /// Delay between spawning consecutive users.
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval_ms: u64,
    /// Iterations per user (absent = until shutdown).
    #[serde(default)]
    pub iterations: Option<u64>,
}

fn default_users() -> usize {
    1
}

fn default_spawn_interval() -> u64 {
    100
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            users: default_users(),
            spawn_interval_ms: default_spawn_interval(),
            iterations: None,
        }
    }
}
