use crate::event::RawEvent;
use crate::queue::EventQueue;
use crate::sensors::input::DigitalInput;
use crate::sensors::runner::PollCadence;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Level-triggered evaluation: smoke is a persistent hazard, so an event
/// fires on every poll cycle the input is active — deliberately not
/// debounced, unlike the edge-triggered motion policy.
pub fn evaluate(active: bool) -> Option<RawEvent> {
    active.then(RawEvent::smoke)
}

/// Polling loop for the smoke detector output
pub struct SmokeMonitor {
    input: Box<dyn DigitalInput>,
    queue: Arc<EventQueue>,
    cadence: PollCadence,
}

impl SmokeMonitor {
    pub fn new(input: Box<dyn DigitalInput>, queue: Arc<EventQueue>, cadence: PollCadence) -> Self {
        Self {
            input,
            queue,
            cadence,
        }
    }

    pub async fn run(mut self) {
        info!("Smoke monitor started");

        loop {
            if self.cadence.is_cancelled() {
                break;
            }

            match self.input.read_level().await {
                Ok(active) => {
                    if let Some(event) = evaluate(active) {
                        warn!("Smoke detected");
                        tokio::select! {
                            _ = self.cadence.cancelled() => break,
                            _ = self.queue.push(event) => {}
                        }
                    }
                }
                Err(e) => {
                    debug!("Smoke read failed, skipping cycle: {}", e);
                }
            }

            if !self.cadence.pause().await {
                break;
            }
        }

        info!("Smoke monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::queue::OverflowPolicy;
    use crate::sensors::input::MockDigitalInput;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_fires_on_every_active_poll() {
        // level-triggered: consecutive active cycles all fire
        assert!(evaluate(true).is_some());
        assert!(evaluate(true).is_some());
        assert!(evaluate(false).is_none());
        assert!(evaluate(true).is_some());
    }

    #[test]
    fn test_smoke_event_shape() {
        let event = evaluate(true).unwrap();
        assert_eq!(event.kind, EventKind::Smoke);
        assert!(event.measurement.is_none());
        assert!(!event.request_capture);
    }

    #[tokio::test]
    async fn test_loop_reports_repeatedly_while_active() {
        let queue = Arc::new(EventQueue::new(16, OverflowPolicy::Block));
        let token = CancellationToken::new();

        // three consecutive active polls, then inactive
        let input = MockDigitalInput::new(vec![true, true, true, false]);
        let monitor = SmokeMonitor::new(
            Box::new(input),
            Arc::clone(&queue),
            PollCadence::new(Duration::from_millis(5), token.clone()),
        );

        let handle = tokio::spawn(monitor.run());
        tokio::time::sleep(Duration::from_millis(80)).await;
        token.cancel();
        handle.await.unwrap();

        // one event per active cycle, distinguishing this from the
        // edge-triggered motion policy
        assert_eq!(queue.stats().events_pushed, 3);
    }

    #[tokio::test]
    async fn test_producer_blocked_on_full_queue_exits_on_cancel() {
        // Block policy, capacity 1, nothing consuming: the monitor ends
        // up suspended inside push. Cancellation must still stop it
        // within one polling interval.
        let queue = Arc::new(EventQueue::new(1, OverflowPolicy::Block));
        let token = CancellationToken::new();

        // permanently active input keeps producing events
        let input = MockDigitalInput::new(vec![true]);
        let monitor = SmokeMonitor::new(
            Box::new(input),
            Arc::clone(&queue),
            PollCadence::new(Duration::from_millis(1), token.clone()),
        );

        let handle = tokio::spawn(monitor.run());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(queue.len(), 1);

        token.cancel();
        tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("blocked producer must observe cancellation")
            .unwrap();
    }
}
