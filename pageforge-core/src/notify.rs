//! Result notification: best-effort delivery of the build result to the
//! caller-supplied callback URL.
//!
//! Delivery retries transient failures with capped exponential backoff and
//! jitter, and never raises past this boundary: the caller always gets a
//! definitive [`NotifyOutcome`] to report.

use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::contract::TaskReport;

const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Backoff configuration for callback delivery.
///
/// Delay formula: `min(base_delay * 2^attempt, max_delay) + jitter`.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Total number of delivery attempts.
    pub max_attempts: u32,
    /// Base delay for exponential backoff (milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay between attempts (milliseconds).
    pub max_delay_ms: u64,
    /// Jitter factor to add randomness (0.0 - 1.0).
    pub jitter_factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            jitter_factor: 0.1,
        }
    }
}

impl BackoffPolicy {
    /// Delay before the retry following `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt));
        let capped = exponential.min(self.max_delay_ms);

        let jitter_ms = if self.jitter_factor > 0.0 {
            let range = (capped as f64 * self.jitter_factor).floor() as u64;
            if range > 0 {
                rand::thread_rng().gen_range(0..=range)
            } else {
                0
            }
        } else {
            0
        };

        Duration::from_millis(capped.saturating_add(jitter_ms))
    }
}

/// Definitive delivery outcome. `note` summarizes the last failure when
/// delivery gave up.
#[derive(Debug, Clone)]
pub struct NotifyOutcome {
    pub delivered: bool,
    pub note: Option<String>,
}

/// POST the result payload to `url`, retrying on network errors and
/// non-success statuses until the policy's attempts are exhausted. Never
/// raises; notification failure is never fatal to the request.
pub async fn deliver(
    client: &reqwest::Client,
    url: &str,
    payload: &TaskReport,
    policy: &BackoffPolicy,
) -> NotifyOutcome {
    let mut last_failure = String::from("no attempts made");

    for attempt in 0..policy.max_attempts {
        let result = client
            .post(url)
            .timeout(ATTEMPT_TIMEOUT)
            .json(payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!(url, attempt, "Delivered result notification");
                return NotifyOutcome {
                    delivered: true,
                    note: None,
                };
            }
            Ok(response) => {
                last_failure = format!("callback returned status {}", response.status());
                warn!(url, attempt, status = %response.status(), "Notification attempt rejected");
            }
            Err(e) => {
                last_failure = format!("callback request failed: {e}");
                warn!(url, attempt, error = %e, "Notification attempt failed");
            }
        }

        if attempt + 1 < policy.max_attempts {
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }
    }

    warn!(
        url,
        attempts = policy.max_attempts,
        last_failure = %last_failure,
        "Giving up on result notification"
    );
    NotifyOutcome {
        delivered: false,
        note: Some(format!(
            "notification not delivered after {} attempts: {}",
            policy.max_attempts, last_failure
        )),
    }
}
