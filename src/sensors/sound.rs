use crate::audio::{AudioBlockSource, AudioLevelEstimator};
use crate::event::RawEvent;
use crate::queue::EventQueue;
use crate::sensors::runner::PollCadence;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info};

/// Cooldown state for the noise gate
#[derive(Debug, Clone, Copy, Default)]
pub struct SoundState {
    pub cooldown_until: Option<Instant>,
}

/// Threshold-plus-cooldown evaluator for estimated sound levels
#[derive(Debug, Clone, Copy)]
pub struct NoiseGate {
    threshold_db: f64,
    cooldown: Duration,
}

impl NoiseGate {
    pub fn new(threshold_db: f64, cooldown: Duration) -> Self {
        Self {
            threshold_db,
            cooldown,
        }
    }

    /// Decide whether a Noise event fires for this level.
    ///
    /// Fires when the level reaches the threshold and no cooldown is
    /// pending; firing arms a cooldown window measured from `now` so
    /// sustained sound cannot flood the queue. Capture is requested only
    /// when the co-located presence signal is true at evaluation time —
    /// the event itself fires either way.
    pub fn evaluate(
        &self,
        level_db: f64,
        presence: bool,
        now: Instant,
        state: SoundState,
    ) -> (Option<RawEvent>, SoundState) {
        if let Some(until) = state.cooldown_until {
            if now < until {
                return (None, state);
            }
        }

        if level_db >= self.threshold_db {
            let event = RawEvent::noise(level_db, presence);
            let next = SoundState {
                cooldown_until: Some(now + self.cooldown),
            };
            (Some(event), next)
        } else {
            (None, SoundState {
                cooldown_until: None,
            })
        }
    }
}

/// Polling loop for the sound level source. Each cycle acquires one audio
/// block, estimates its level and runs it through the noise gate. A
/// failed acquisition degrades to the estimator floor and the loop keeps
/// polling.
pub struct SoundMonitor {
    source: Box<dyn AudioBlockSource>,
    estimator: AudioLevelEstimator,
    gate: NoiseGate,
    state: SoundState,
    queue: Arc<EventQueue>,
    presence_rx: watch::Receiver<bool>,
    cadence: PollCadence,
}

impl SoundMonitor {
    pub fn new(
        source: Box<dyn AudioBlockSource>,
        estimator: AudioLevelEstimator,
        gate: NoiseGate,
        queue: Arc<EventQueue>,
        presence_rx: watch::Receiver<bool>,
        cadence: PollCadence,
    ) -> Self {
        Self {
            source,
            estimator,
            gate,
            state: SoundState::default(),
            queue,
            presence_rx,
            cadence,
        }
    }

    pub async fn run(mut self) {
        info!("Sound monitor started");

        loop {
            if self.cadence.is_cancelled() {
                break;
            }

            let level_db = match self.source.read_block().await {
                Ok(samples) => self.estimator.estimate(&samples),
                Err(e) => {
                    // device busy or unavailable: neutral low value,
                    // keep polling
                    debug!("Audio block unavailable, using floor: {}", e);
                    self.estimator.floor_db()
                }
            };

            let presence = *self.presence_rx.borrow();
            let (event, next) = self
                .gate
                .evaluate(level_db, presence, Instant::now(), self.state);
            self.state = next;

            if let Some(event) = event {
                info!(
                    "Noise detected at {:.1} dB (capture: {})",
                    level_db, event.request_capture
                );
                tokio::select! {
                    _ = self.cadence.cancelled() => break,
                    _ = self.queue.push(event) => {}
                }
            }

            if !self.cadence.pause().await {
                break;
            }
        }

        info!("Sound monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MockAudioSource;
    use crate::event::{EventKind, Measurement};
    use crate::queue::OverflowPolicy;
    use tokio_util::sync::CancellationToken;

    fn gate() -> NoiseGate {
        // cooldown covers 2 polling cycles at 1ms per cycle
        NoiseGate::new(70.0, Duration::from_millis(2))
    }

    #[test]
    fn test_noise_series_with_cooldown() {
        // series [50, 75, 80, 40, 76] against threshold 70 with a
        // cooldown spanning 2 cycles: fires at index 1 and index 4 only
        let gate = gate();
        let base = Instant::now();
        let cycle = Duration::from_millis(1);
        let series = [50.0, 75.0, 80.0, 40.0, 76.0];

        let mut state = SoundState::default();
        let mut fired = Vec::new();
        for (i, &level) in series.iter().enumerate() {
            let now = base + cycle * i as u32;
            let (event, next) = gate.evaluate(level, false, now, state);
            state = next;
            if event.is_some() {
                fired.push(i);
            }
        }

        assert_eq!(fired, vec![1, 4]);
    }

    #[test]
    fn test_cooldown_suppresses_above_threshold() {
        let gate = gate();
        let base = Instant::now();

        let (event, state) = gate.evaluate(75.0, false, base, SoundState::default());
        assert!(event.is_some());

        // 80 dB one cycle later is still inside the cooldown window
        let (event, _) = gate.evaluate(80.0, false, base + Duration::from_millis(1), state);
        assert!(event.is_none());
    }

    #[test]
    fn test_presence_gates_capture_not_event() {
        let gate = gate();
        let now = Instant::now();

        let (event, _) = gate.evaluate(75.0, false, now, SoundState::default());
        let event = event.unwrap();
        assert_eq!(event.kind, EventKind::Noise);
        assert!(!event.request_capture);

        let (event, _) = gate.evaluate(75.0, true, now, SoundState::default());
        assert!(event.unwrap().request_capture);
    }

    #[test]
    fn test_event_carries_measured_level() {
        let gate = gate();
        let (event, _) = gate.evaluate(82.5, false, Instant::now(), SoundState::default());
        assert!(matches!(
            event.unwrap().measurement,
            Some(Measurement::Decibels(db)) if db == 82.5
        ));
    }

    #[tokio::test]
    async fn test_loop_survives_read_errors() {
        let estimator = AudioLevelEstimator::new(94.0, -30.0);
        let queue = Arc::new(EventQueue::new(16, OverflowPolicy::Block));
        let token = CancellationToken::new();
        let (_presence_tx, presence_rx) = watch::channel(false);

        // one loud block, then the source fails on every further poll
        let source = MockAudioSource::from_levels(&[80.0], &estimator);
        let monitor = SoundMonitor::new(
            Box::new(source),
            estimator,
            NoiseGate::new(70.0, Duration::from_millis(1)),
            Arc::clone(&queue),
            presence_rx,
            PollCadence::new(Duration::from_millis(5), token.clone()),
        );

        let handle = tokio::spawn(monitor.run());
        tokio::time::sleep(Duration::from_millis(80)).await;
        token.cancel();
        handle.await.unwrap();

        // exactly one event from the loud block; failed reads produced
        // the floor and never fired
        assert_eq!(queue.stats().events_pushed, 1);
        assert_eq!(queue.pop().await.kind, EventKind::Noise);
    }
}
