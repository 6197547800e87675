use crate::actuator::{Actuator, BeepPattern, IndicatorPattern};
use crate::capture::{CaptureProvider, FaceDetector};
use crate::config::{ActuatorConfig, CaptureConfig};
use crate::event::{EnrichedEvent, EventKind, RawEvent};
use crate::publish::Publisher;
use crate::queue::EventQueue;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the dispatcher is doing right now, exposed for health reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Enriching,
    Publishing,
}

/// Single consumer of the event queue.
///
/// Events are handled strictly one at a time in arrival order: physical
/// feedback first, then optional image enrichment, then publishing. Any
/// stage may fail without losing the event; a failed enrichment degrades
/// to publishing the bare event, and a failed publish is logged and
/// dropped rather than retried inline.
pub struct Dispatcher {
    queue: Arc<EventQueue>,
    capture: Arc<dyn CaptureProvider>,
    detector: Arc<dyn FaceDetector>,
    publisher: Arc<dyn Publisher>,
    actuator: Arc<dyn Actuator>,
    capture_enabled: bool,
    capture_timeout: Duration,
    face_timeout: Duration,
    feedback_hold: Duration,
    token: CancellationToken,
    state: Mutex<DispatcherState>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<EventQueue>,
        capture: Arc<dyn CaptureProvider>,
        detector: Arc<dyn FaceDetector>,
        publisher: Arc<dyn Publisher>,
        actuator: Arc<dyn Actuator>,
        capture_config: &CaptureConfig,
        actuator_config: &ActuatorConfig,
        token: CancellationToken,
    ) -> Self {
        Self {
            queue,
            capture,
            detector,
            publisher,
            actuator,
            capture_enabled: capture_config.enabled,
            capture_timeout: capture_config.timeout(),
            face_timeout: capture_config.face_timeout(),
            feedback_hold: actuator_config.feedback_hold(),
            token,
            state: Mutex::new(DispatcherState::Idle),
        }
    }

    pub fn state(&self) -> DispatcherState {
        *self.state.lock()
    }

    pub async fn run(&self) {
        info!("Dispatcher started");

        loop {
            let event = tokio::select! {
                _ = self.token.cancelled() => break,
                event = self.queue.pop() => event,
            };
            self.handle_event(event).await;
        }

        *self.state.lock() = DispatcherState::Idle;
        info!("Dispatcher stopped");
    }

    /// Feedback shown while an event is being processed. Climate samples
    /// are routine telemetry and leave the indicators alone.
    fn feedback_for(kind: EventKind) -> Option<(IndicatorPattern, BeepPattern)> {
        match kind {
            EventKind::Smoke | EventKind::HighTemperature => {
                Some((IndicatorPattern::Alarm, BeepPattern::Long))
            }
            EventKind::Noise => Some((IndicatorPattern::Alarm, BeepPattern::Short)),
            EventKind::Motion => Some((IndicatorPattern::Caution, BeepPattern::Short)),
            EventKind::ClimateSample => None,
        }
    }

    async fn handle_event(&self, raw: RawEvent) {
        debug!("Dispatching {}", raw.description());

        let feedback = Self::feedback_for(raw.kind);
        if let Some((pattern, beep)) = feedback {
            self.actuator.set_indicator(pattern).await;
            self.actuator.beep(beep).await;
        }

        *self.state.lock() = DispatcherState::Enriching;
        let enriched = self.enrich(raw).await;

        *self.state.lock() = DispatcherState::Publishing;
        let payload = enriched.to_payload();
        if let Err(e) = self.publisher.publish(&payload).await {
            warn!(
                "Publish failed for {} ({}): {}",
                payload.event_kind.as_str(),
                payload.event_id,
                e
            );
        }

        if feedback.is_some() {
            tokio::select! {
                _ = self.token.cancelled() => {}
                _ = tokio::time::sleep(self.feedback_hold) => {}
            }
            self.actuator.set_indicator(IndicatorPattern::Baseline).await;
        }

        *self.state.lock() = DispatcherState::Idle;
    }

    /// Attach a still image and face verdict to the event when it asked
    /// for one. Every stage is best-effort; whatever was obtained before
    /// the first failure is kept.
    async fn enrich(&self, raw: RawEvent) -> EnrichedEvent {
        let mut enriched = EnrichedEvent::bare(raw);

        if !enriched.raw.request_capture || !self.capture_enabled {
            return enriched;
        }

        let tag = enriched.raw.kind.as_str();
        let path = match timeout(self.capture_timeout, self.capture.capture(tag)).await {
            Ok(Ok(path)) => path,
            Ok(Err(e)) => {
                warn!("Capture failed for {}: {}", tag, e);
                return enriched;
            }
            Err(_) => {
                warn!("Capture timed out for {}", tag);
                return enriched;
            }
        };
        enriched.image_path = Some(path.clone());

        let face = match timeout(self.face_timeout, self.detector.detect(&path)).await {
            Ok(Ok(face)) => face,
            Ok(Err(e)) => {
                warn!("Face check failed for {}: {}", path.display(), e);
                return enriched;
            }
            Err(_) => {
                warn!("Face check timed out for {}", path.display());
                return enriched;
            }
        };
        enriched.face_detected = Some(face);

        // Image bytes ride along only when someone was actually seen
        if face {
            match tokio::fs::read(&path).await {
                Ok(bytes) => enriched.image_payload = Some(bytes),
                Err(e) => warn!("Could not read captured image {}: {}", path.display(), e),
            }
        }

        enriched
    }
}
