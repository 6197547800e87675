use super::{ComponentState, VigilOrchestrator};
use crate::actuator::IndicatorPattern;
use crate::error::{Result, VigilError};
use std::sync::Arc;
use tracing::{error, info};

const COMPONENTS: [&str; 5] = ["sound", "motion", "smoke", "climate", "dispatcher"];

impl VigilOrchestrator {
    /// Initialize all system components
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing monitoring node components");

        for component in COMPONENTS {
            self.set_component_state(component, ComponentState::Stopped);
        }

        if self.config.capture.enabled {
            self.capture.prepare().map_err(|e| {
                error!("Capture preparation failed: {}", e);
                e
            })?;
        }

        // Green from the moment we are ready to observe
        self.actuator.set_indicator(IndicatorPattern::Baseline).await;

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start all system components
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting monitoring node");

        // Dispatcher first so producers never find the queue unattended
        self.set_component_state("dispatcher", ComponentState::Starting);
        let dispatcher = Arc::clone(&self.dispatcher);
        self.tasks.push((
            "dispatcher",
            tokio::spawn(async move { dispatcher.run().await }),
        ));
        self.set_component_state("dispatcher", ComponentState::Running);

        self.set_component_state("motion", ComponentState::Starting);
        let motion = take_monitor(self.motion_monitor.take(), "motion")?;
        self.tasks
            .push(("motion", tokio::spawn(async move { motion.run().await })));
        self.set_component_state("motion", ComponentState::Running);

        self.set_component_state("sound", ComponentState::Starting);
        let sound = take_monitor(self.sound_monitor.take(), "sound")?;
        self.tasks
            .push(("sound", tokio::spawn(async move { sound.run().await })));
        self.set_component_state("sound", ComponentState::Running);

        self.set_component_state("smoke", ComponentState::Starting);
        let smoke = take_monitor(self.smoke_monitor.take(), "smoke")?;
        self.tasks
            .push(("smoke", tokio::spawn(async move { smoke.run().await })));
        self.set_component_state("smoke", ComponentState::Running);

        self.set_component_state("climate", ComponentState::Starting);
        let climate = take_monitor(self.climate_monitor.take(), "climate")?;
        self.tasks
            .push(("climate", tokio::spawn(async move { climate.run().await })));
        self.set_component_state("climate", ComponentState::Running);

        info!("Monitoring node started successfully");
        Ok(())
    }
}

fn take_monitor<T>(monitor: Option<T>, name: &str) -> Result<T> {
    monitor.ok_or_else(|| {
        VigilError::component(name.to_string(), "monitor already started".to_string())
    })
}
