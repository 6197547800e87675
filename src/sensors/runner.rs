use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Cadence gate for a polling loop. Every sensor loop body is
/// "poll, evaluate, pause"; the pause observes the shared cancellation
/// token so loops exit within one polling interval of shutdown.
pub struct PollCadence {
    interval: Duration,
    token: CancellationToken,
}

impl PollCadence {
    pub fn new(interval: Duration, token: CancellationToken) -> Self {
        Self { interval, token }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when shutdown is requested. Queue pushes are guarded
    /// with this so a producer blocked on a full queue (Block policy)
    /// still exits promptly.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Sleep one interval. Returns false when cancellation was observed,
    /// telling the loop to exit.
    pub async fn pause(&self) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => false,
            _ = sleep(self.interval) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Instant};

    #[tokio::test]
    async fn test_pause_runs_full_interval() {
        let cadence = PollCadence::new(Duration::from_millis(30), CancellationToken::new());
        let started = Instant::now();
        assert!(cadence.pause().await);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_pause_exits_early_on_cancel() {
        let token = CancellationToken::new();
        let cadence = PollCadence::new(Duration::from_secs(60), token.clone());

        token.cancel();
        let result = timeout(Duration::from_millis(100), cadence.pause())
            .await
            .expect("cancelled pause must not run the full interval");
        assert!(!result);
        assert!(cadence.is_cancelled());
    }
}
