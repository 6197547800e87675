use crate::event::RawEvent;
use crate::queue::EventQueue;
use crate::sensors::input::DigitalInput;
use crate::sensors::runner::PollCadence;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Debounce state for the PIR input
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionState {
    pub previous: bool,
}

/// Rising-edge evaluation: an event fires only on a false->true
/// transition. A held-high input produces nothing; re-triggering after a
/// drop is intentional — it tracks object presence.
pub fn evaluate(current: bool, state: MotionState) -> (Option<RawEvent>, MotionState) {
    let event = if current && !state.previous {
        Some(RawEvent::motion())
    } else {
        None
    };
    (event, MotionState { previous: current })
}

/// Polling loop for the PIR motion input. Besides queueing events it
/// publishes the raw level on a watch channel so the sound monitor can
/// gate its capture requests on co-located presence.
pub struct MotionMonitor {
    input: Box<dyn DigitalInput>,
    state: MotionState,
    queue: Arc<EventQueue>,
    presence_tx: watch::Sender<bool>,
    cadence: PollCadence,
}

impl MotionMonitor {
    pub fn new(
        input: Box<dyn DigitalInput>,
        queue: Arc<EventQueue>,
        presence_tx: watch::Sender<bool>,
        cadence: PollCadence,
    ) -> Self {
        Self {
            input,
            state: MotionState::default(),
            queue,
            presence_tx,
            cadence,
        }
    }

    pub async fn run(mut self) {
        info!("Motion monitor started");

        loop {
            if self.cadence.is_cancelled() {
                break;
            }

            match self.input.read_level().await {
                Ok(level) => {
                    let _ = self.presence_tx.send(level);

                    let (event, next) = evaluate(level, self.state);
                    self.state = next;

                    if let Some(event) = event {
                        info!("Motion detected");
                        tokio::select! {
                            _ = self.cadence.cancelled() => break,
                            _ = self.queue.push(event) => {}
                        }
                    }
                }
                Err(e) => {
                    // transient read error, retry next cycle
                    debug!("Motion read failed, skipping cycle: {}", e);
                }
            }

            if !self.cadence.pause().await {
                break;
            }
        }

        info!("Motion monitor stopped");
    }
}
