use std::time::Duration;

/// Enforces the minimum wall-clock gap between successive publishes.
///
/// One `tick` per published row, regardless of whether the previous publish
/// has been acknowledged: throughput is bounded below by the interval and
/// never increased by fast acknowledgments.
pub struct Pacer {
    interval: Duration,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn tick(&self) {
        if self.interval.is_zero() {
            return;
        }
        tokio::time::sleep(self.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_tick_waits_at_least_the_interval() {
        let pacer = Pacer::new(Duration::from_millis(50));

        let start = Instant::now();
        pacer.tick().await;
        pacer.tick().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_zero_interval_returns_immediately() {
        let pacer = Pacer::new(Duration::ZERO);

        let start = Instant::now();
        for _ in 0..100 {
            pacer.tick().await;
        }
        // no timer is armed at all for a zero interval
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
