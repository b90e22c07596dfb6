//! Resilient Client
//!
//! Runs a remote call under a fixed attempt budget. Connection failures,
//! timeouts and 502/503/504 are retried after an exponential pause; every
//! other failure is returned to the caller on the spot.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::error::{FetchError, TransientFailure};
use super::transport::{ApiResponse, Method, Transport, TransportError};

/// Statuses meaning "server overloaded or unavailable".
pub const RETRYABLE_STATUSES: [u16; 3] = [502, 503, 504];

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first one included.
    pub max_attempts: u32,
    /// Pause after failed attempt `n` (0-indexed) is `2^n` units.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(2u32.saturating_pow(attempt))
    }
}

pub struct ResilientClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl ResilientClient {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Send until success, a fatal failure, or the attempt budget runs out.
    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<ApiResponse, FetchError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let failure = match self.transport.send(method, endpoint, body).await {
                Ok(resp) if resp.is_success() => {
                    debug!("{} succeeded on attempt {}", endpoint, attempt + 1);
                    return Ok(resp);
                }
                Ok(resp) if RETRYABLE_STATUSES.contains(&resp.status) => {
                    TransientFailure::Status(resp.status)
                }
                Ok(resp) => {
                    return Err(FetchError::Status {
                        endpoint: endpoint.to_string(),
                        status: resp.status,
                        detail: resp.detail(),
                    });
                }
                Err(TransportError::Connect(msg)) => TransientFailure::Connect(msg),
                Err(TransportError::Timeout) => TransientFailure::Timeout,
                Err(TransportError::Other(message)) => {
                    return Err(FetchError::Transport {
                        endpoint: endpoint.to_string(),
                        message,
                    });
                }
            };

            attempt += 1;
            if attempt >= attempts {
                return Err(FetchError::Exhausted {
                    endpoint: endpoint.to_string(),
                    attempts,
                    last: failure,
                });
            }

            let delay = self.policy.delay(attempt - 1);
            warn!(
                "{} attempt {}/{} failed ({}), retrying in {:?}",
                endpoint, attempt, attempts, failure, delay
            );
            sleep(delay).await;
        }
    }

    /// POST a JSON body and parse the JSON reply.
    pub async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value, FetchError> {
        let resp = self.call(endpoint, Method::Post, Some(body)).await?;
        serde_json::from_str(&resp.body).map_err(|e| FetchError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}
