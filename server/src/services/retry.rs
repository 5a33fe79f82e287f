use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::TicketingError;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BACKOFF_MS: u64 = 20;

/// Bounded retry of transactions aborted by store contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Run `transaction` until it succeeds, fails for a non-retryable reason, or the
    /// attempt budget is spent. Each attempt must open and commit its own transaction.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        mut transaction: F,
    ) -> Result<T, TicketingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TicketingError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match transaction().await {
                Err(TicketingError::Store(err)) if err.is_retryable() => {
                    if attempt >= max_attempts {
                        warn!(operation, attempts = attempt, error = %err, "Transaction retries exhausted");
                        return Err(TicketingError::Transient { attempts: attempt });
                    }
                    debug!(operation, attempt, error = %err, "Retrying aborted transaction");
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}
