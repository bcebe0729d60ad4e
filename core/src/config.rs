use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

pub const DEFAULT_BASE_URL: &str = "http://117.72.126.49/backend/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_RECOMMEND_TIMEOUT_MS: u64 = 30_000;

/// Connection settings for the meican backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Recommendations run a slow backend computation.
    pub recommend_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            recommend_timeout: Duration::from_millis(DEFAULT_RECOMMEND_TIMEOUT_MS),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            base_url: try_load(&lookup, "MEICAN_API_BASE_URL", DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_millis(try_load(&lookup, "MEICAN_API_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)),
            recommend_timeout: Duration::from_millis(try_load(
                &lookup,
                "MEICAN_RECOMMEND_TIMEOUT_MS",
                DEFAULT_RECOMMEND_TIMEOUT_MS,
            )),
        }
    }
}

fn try_load<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };
    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}
