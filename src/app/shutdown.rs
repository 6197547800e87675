use super::{ComponentState, VigilOrchestrator};
use crate::actuator::IndicatorPattern;
use crate::error::Result;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

impl VigilOrchestrator {
    /// Perform graceful shutdown of all components.
    ///
    /// Cancellation reaches every task through the shared token; each
    /// sensor loop notices it within one polling interval and the
    /// dispatcher as soon as it is between events. Tasks that ignore the
    /// token are aborted after a bounded wait.
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();

        let mut exit_code = 0;
        let tasks: Vec<_> = self.tasks.drain(..).collect();

        for (name, mut handle) in tasks {
            self.set_component_state(name, ComponentState::Stopping);

            match timeout(STOP_TIMEOUT, &mut handle).await {
                Ok(Ok(())) => {
                    self.set_component_state(name, ComponentState::Stopped);
                    info!("{} component stopped", name);
                }
                Ok(Err(e)) => {
                    self.set_component_state(name, ComponentState::Failed);
                    error!("{} task ended abnormally: {}", name, e);
                    exit_code = 1;
                }
                Err(_) => {
                    self.set_component_state(name, ComponentState::Failed);
                    warn!("{} did not stop within {:?}, aborting", name, STOP_TIMEOUT);
                    handle.abort();
                    exit_code = 1;
                }
            }
        }

        // Leave the hardware dark regardless of how the tasks went down
        self.actuator.set_indicator(IndicatorPattern::Off).await;

        let leftover = self.queue.len();
        if leftover > 0 {
            info!("Discarding {} undispatched events", leftover);
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }
}
