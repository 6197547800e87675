use crate::event::RawEvent;
use crate::queue::EventQueue;
use crate::sensors::input::{ClimateInput, ClimateReading};
use crate::sensors::runner::PollCadence;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Threshold evaluator for climate samples
#[derive(Debug, Clone, Copy)]
pub struct ClimateEvaluator {
    high_temperature_c: f64,
}

impl ClimateEvaluator {
    pub fn new(high_temperature_c: f64) -> Self {
        Self { high_temperature_c }
    }

    /// Every valid reading emits a ClimateSample; a reading above the
    /// temperature threshold additionally emits HighTemperature.
    pub fn evaluate(&self, reading: ClimateReading) -> Vec<RawEvent> {
        let mut events = vec![RawEvent::climate(
            reading.temperature_c,
            reading.humidity_pct,
        )];

        if reading.temperature_c > self.high_temperature_c {
            events.push(RawEvent::high_temperature(reading.temperature_c));
        }

        events
    }
}

/// Polling loop for the temperature/humidity sensor, on a slower cadence
/// than the digital inputs. A failed read is skipped silently and
/// retried next cycle.
pub struct ClimateMonitor {
    input: Box<dyn ClimateInput>,
    evaluator: ClimateEvaluator,
    queue: Arc<EventQueue>,
    cadence: PollCadence,
}

impl ClimateMonitor {
    pub fn new(
        input: Box<dyn ClimateInput>,
        evaluator: ClimateEvaluator,
        queue: Arc<EventQueue>,
        cadence: PollCadence,
    ) -> Self {
        Self {
            input,
            evaluator,
            queue,
            cadence,
        }
    }

    pub async fn run(mut self) {
        info!("Climate monitor started");

        'poll: loop {
            if self.cadence.is_cancelled() {
                break;
            }

            match self.input.read_sample().await {
                Ok(Some(reading)) => {
                    debug!(
                        "Climate sample: {:.1} °C / {:.0}%",
                        reading.temperature_c, reading.humidity_pct
                    );
                    for event in self.evaluator.evaluate(reading) {
                        if event.kind == crate::event::EventKind::HighTemperature {
                            warn!("High temperature: {:.1} °C", reading.temperature_c);
                        }
                        tokio::select! {
                            _ = self.cadence.cancelled() => break 'poll,
                            _ = self.queue.push(event) => {}
                        }
                    }
                }
                Ok(None) => {
                    debug!("Climate sensor returned no valid value, retrying next cycle");
                }
                Err(e) => {
                    debug!("Climate read failed, skipping cycle: {}", e);
                }
            }

            if !self.cadence.pause().await {
                break;
            }
        }

        info!("Climate monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::queue::OverflowPolicy;
    use crate::sensors::input::MockClimateInput;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn reading(temperature_c: f64) -> ClimateReading {
        ClimateReading {
            temperature_c,
            humidity_pct: 50.0,
        }
    }

    #[test]
    fn test_sample_always_emitted() {
        let evaluator = ClimateEvaluator::new(60.0);
        let events = evaluator.evaluate(reading(22.0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::ClimateSample);
    }

    #[test]
    fn test_high_temperature_emitted_additionally() {
        let evaluator = ClimateEvaluator::new(60.0);
        let events = evaluator.evaluate(reading(65.0));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::ClimateSample);
        assert_eq!(events[1].kind, EventKind::HighTemperature);
    }

    #[test]
    fn test_threshold_series() {
        // readings [55, 65, 58] against threshold 60: three samples,
        // exactly one high-temperature event (at the second reading)
        let evaluator = ClimateEvaluator::new(60.0);
        let mut samples = 0;
        let mut high = 0;
        for t in [55.0, 65.0, 58.0] {
            for event in evaluator.evaluate(reading(t)) {
                match event.kind {
                    EventKind::ClimateSample => samples += 1,
                    EventKind::HighTemperature => high += 1,
                    _ => panic!("unexpected event kind"),
                }
            }
        }
        assert_eq!(samples, 3);
        assert_eq!(high, 1);
    }

    #[tokio::test]
    async fn test_loop_skips_failed_reads() {
        let queue = Arc::new(EventQueue::new(16, OverflowPolicy::Block));
        let token = CancellationToken::new();

        // valid, missing, valid: two samples total, no errors surfaced
        let input = MockClimateInput::new(vec![
            Some(reading(21.0)),
            None,
            Some(reading(22.0)),
            None,
        ]);
        let monitor = ClimateMonitor::new(
            Box::new(input),
            ClimateEvaluator::new(60.0),
            Arc::clone(&queue),
            PollCadence::new(Duration::from_millis(5), token.clone()),
        );

        let handle = tokio::spawn(monitor.run());
        tokio::time::sleep(Duration::from_millis(80)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(queue.stats().events_pushed, 2);
    }
}
