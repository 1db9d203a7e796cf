use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Caps the number of requests in flight against one remote service.
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
}

static EDINET_RATE_LIMITER: OnceCell<RateLimiter> = OnceCell::new();

impl RateLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        RateLimiter {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| anyhow!("Rate limiter semaphore closed"))
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Process-wide limiter for the EDINET API. The first caller fixes the
    /// limit.
    pub fn edinet(max_concurrent: usize) -> &'static RateLimiter {
        EDINET_RATE_LIMITER.get_or_init(|| RateLimiter::new(max_concurrent))
    }
}
