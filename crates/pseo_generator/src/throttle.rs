use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fixed pauses that keep a sequential batch under upstream rate limits.
#[derive(Clone)]
pub struct RateLimiter {
    between_calls: Duration,
    between_items: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("between_calls", &self.between_calls)
            .field("between_items", &self.between_items)
            .finish()
    }
}

impl RateLimiter {
    pub fn new(between_calls: Duration, between_items: Duration) -> Self {
        Self::with_sleeper(between_calls, between_items, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        between_calls: Duration,
        between_items: Duration,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            between_calls,
            between_items,
            sleeper,
        }
    }

    /// Pause after a call to the model or image API.
    pub async fn after_call(&self) {
        if !self.between_calls.is_zero() {
            self.sleeper.sleep(self.between_calls).await;
        }
    }

    /// Pause before starting the next work item.
    pub async fn between_items(&self) {
        if !self.between_items.is_zero() {
            self.sleeper.sleep(self.between_items).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(5))
    }
}
