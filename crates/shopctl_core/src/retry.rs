use std::thread::sleep;
use std::time::Duration;

use anyhow::{Result, bail};

/// Error-message fragments the remote database emits under transient lock
/// contention. Anything else is treated as a real failure.
const TRANSIENT_LOCK_SIGNATURES: [&str; 2] = ["SQLITE_BUSY", "database is locked"];

pub fn is_transient_lock(error: &anyhow::Error) -> bool {
    let message = format!("{error:#}");
    TRANSIENT_LOCK_SIGNATURES
        .iter()
        .any(|signature| message.contains(signature))
}

/// Linear-backoff retry for single-resource creation against a remote store
/// that occasionally reports lock contention. Contention is rare and these
/// commands run interactively, so the policy stays simple: wait
/// `base_delay * attempt` between tries and give up after `max_attempts`.
#[derive(Debug, Clone)]
pub struct LockRetryPolicy {
    pub base_delay: Duration,
    pub max_attempts: usize,
}

impl Default for LockRetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_attempts: 8,
        }
    }
}

impl LockRetryPolicy {
    pub fn run<T>(&self, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        if self.max_attempts == 0 {
            bail!("retry policy requires at least one attempt");
        }
        for attempt in 1..=self.max_attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !is_transient_lock(&error) || attempt == self.max_attempts {
                        return Err(error);
                    }
                    let wait = self
                        .base_delay
                        .saturating_mul(u32::try_from(attempt).unwrap_or(u32::MAX));
                    sleep(wait);
                }
            }
        }
        bail!("retry policy exhausted its attempt budget")
    }
}
