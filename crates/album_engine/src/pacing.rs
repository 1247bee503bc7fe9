use std::time::Duration;

use rand::Rng;

/// Uniform random duration in `[min_ms, max_ms]`.
pub(crate) fn jitter(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
}

/// Sleeps for `duration`; zero durations return immediately.
pub(crate) async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
