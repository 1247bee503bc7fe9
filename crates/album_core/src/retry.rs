use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NetworkErrorKind;

/// Transport retry budget with linearly increasing backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one.
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// No retries and no backoff; used for tests and one-shot fetches.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Backoff before retry number `retry` (1-based): `retry × base_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(u64::from(retry)))
    }

    pub fn start(&self) -> RetryState {
        RetryState {
            attempt: 0,
            max_attempts: self.max_attempts(),
            last_error_kind: None,
        }
    }
}

/// Progress through one article's fetch chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// 0-based index of the attempt about to run (or that just ran).
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_error_kind: Option<NetworkErrorKind>,
}

impl RetryState {
    /// Records a failed attempt and returns true when another one is allowed.
    pub fn record_failure(&mut self, kind: NetworkErrorKind) -> bool {
        self.last_error_kind = Some(kind);
        if !kind.is_retryable() || self.attempt + 1 >= self.max_attempts {
            return false;
        }
        self.attempt += 1;
        true
    }

    /// Number of attempts made so far, counting the current one.
    pub fn attempts_made(&self) -> u32 {
        self.attempt + 1
    }
}
