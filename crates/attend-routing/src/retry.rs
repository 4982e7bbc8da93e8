// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded retry for transient storage failures.
//!
//! Only [`AttendError::Transient`] is retried. Conflicts and every other
//! error surface on the first attempt.

use std::future::Future;
use std::time::Duration;

use attend_core::AttendError;
use tracing::warn;

/// How many times, and how patiently, a transient failure is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    retries: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self { retries, backoff }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Run `attempt` until it succeeds, fails permanently, or retries run out.
    ///
    /// The delay doubles after each failed attempt.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, AttendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttendError>>,
    {
        let mut retried = 0u32;
        loop {
            match attempt().await {
                Err(e) if e.is_retryable() && retried < self.retries => {
                    let delay = self.backoff.saturating_mul(2u32.saturating_pow(retried));
                    retried += 1;
                    warn!(operation, attempt = retried, error = %e, "transient storage failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1, Duration::from_millis(25))
    }
}
