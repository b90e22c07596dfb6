//! Configuration
//!
//! Connection details come from the environment; everything else is a
//! code-level default.

use std::env;
use std::time::Duration;

use crate::memory::CacheConfig;
use crate::remote::RetryPolicy;

pub const API_URL_VAR: &str = "FIELD_API_URL";
pub const API_KEY_VAR: &str = "FIELD_API_KEY";

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
}

impl AppConfig {
    /// Read once at start. Blank values count as unset.
    pub fn from_env() -> Self {
        Self {
            api_url: non_blank(env::var(API_URL_VAR).ok()),
            api_key: non_blank(env::var(API_KEY_VAR).ok()),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.api_url.is_some()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Knobs of the remote client stack.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub retry: RetryPolicy,
    /// Upper bound on a single attempt.
    pub request_timeout: Duration,
    pub cache: CacheConfig,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
            cache: CacheConfig::default(),
        }
    }
}
