//! Politeness pacing between series page requests
//!
//! A `Pacer` remembers when the last request was let through and makes the next
//! caller wait out the rest of the interval. Waiting is an async sleep, so a run
//! deadline or shutdown signal can still cancel it.

use std::time::Duration;
use tokio::time::Instant;

/// Minimum-interval gate for sequential requests
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How long a request issued at `now` would have to wait
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        let last = self.last?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.interval {
            Some(self.interval - elapsed)
        } else {
            None
        }
    }

    /// Waits until the interval since the previous request has passed, then
    /// records the current instant as the latest request
    pub async fn ready(&mut self) {
        if let Some(wait) = self.time_until_ready(Instant::now()) {
            tracing::trace!(wait_ms = wait.as_millis() as u64, "Pacing");
            tokio::time::sleep(wait).await;
        }
        self.last = Some(Instant::now());
    }

    /// Delay before retry number `attempt` (1-based): the interval times the attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.interval.saturating_mul(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_until_ready() {
        let mut pacer = Pacer::new(Duration::from_millis(1000));
        let now = Instant::now();

        // No previous request
        assert!(pacer.time_until_ready(now).is_none());

        pacer.last = Some(now);
        assert_eq!(pacer.time_until_ready(now), Some(Duration::from_millis(1000)));

        let soon = now + Duration::from_millis(400);
        assert_eq!(pacer.time_until_ready(soon), Some(Duration::from_millis(600)));

        let later = now + Duration::from_millis(1100);
        assert!(pacer.time_until_ready(later).is_none());
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let pacer = Pacer::new(Duration::from_millis(3000));
        assert_eq!(pacer.backoff(1), Duration::from_millis(3000));
        assert_eq!(pacer.backoff(2), Duration::from_millis(6000));
    }

    #[tokio::test]
    async fn test_ready_spaces_requests() {
        let mut pacer = Pacer::new(Duration::from_millis(50));

        let start = Instant::now();
        pacer.ready().await;
        assert!(start.elapsed() < Duration::from_millis(50));

        pacer.ready().await;
        pacer.ready().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
