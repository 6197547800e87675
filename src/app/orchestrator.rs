use super::types::{ComponentState, ShutdownReason};
use crate::actuator::{Actuator, GpioActuator};
use crate::audio::{AudioBlockSource, AudioLevelEstimator, PcmStreamSource};
use crate::capture::{CaptureProvider, CommandFaceDetector, FaceDetector, StillCameraCapture};
use crate::config::VigilConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::publish::{BlynkPublisher, LogPublisher, Publisher};
use crate::queue::EventQueue;
use crate::sensors::{
    ClimateEvaluator, ClimateInput, ClimateMonitor, DigitalInput, IioClimateInput, MotionMonitor,
    NoiseGate, PollCadence, SmokeMonitor, SoundMonitor, SysfsDigitalInput,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Hardware-facing collaborators the orchestrator wires together.
///
/// Production instances come from [`Components::from_config`]; tests hand
/// in mocks instead.
pub struct Components {
    pub audio_source: Box<dyn AudioBlockSource>,
    pub motion_input: Box<dyn DigitalInput>,
    pub smoke_input: Box<dyn DigitalInput>,
    pub climate_input: Box<dyn ClimateInput>,
    pub capture: Arc<dyn CaptureProvider>,
    pub detector: Arc<dyn FaceDetector>,
    pub publisher: Arc<dyn Publisher>,
    pub actuator: Arc<dyn Actuator>,
}

impl Components {
    /// Build the real sensor and sink implementations for this node
    pub fn from_config(config: &VigilConfig) -> Result<Self> {
        let publisher: Arc<dyn Publisher> = if config.telemetry.token.is_empty() {
            info!("No telemetry token configured, publishing to log only");
            Arc::new(LogPublisher)
        } else {
            Arc::new(BlynkPublisher::new(&config.telemetry)?)
        };

        Ok(Self {
            audio_source: Box::new(PcmStreamSource::new(
                &config.audio.pcm_path,
                config.audio.block_samples,
            )),
            motion_input: Box::new(SysfsDigitalInput::new(&config.motion.gpio_value_path)),
            smoke_input: Box::new(SysfsDigitalInput::new(&config.smoke.gpio_value_path)),
            climate_input: Box::new(IioClimateInput::new(
                &config.climate.temperature_path,
                &config.climate.humidity_path,
            )),
            capture: Arc::new(StillCameraCapture::new(config.capture.clone())),
            detector: Arc::new(CommandFaceDetector::new(&config.capture)),
            publisher,
            actuator: Arc::new(GpioActuator::new(config.actuator.clone())),
        })
    }
}

/// Main application coordinator that manages all system components
pub struct VigilOrchestrator {
    pub(super) config: VigilConfig,
    pub(super) queue: Arc<EventQueue>,
    pub(super) capture: Arc<dyn CaptureProvider>,
    pub(super) actuator: Arc<dyn Actuator>,
    pub(super) dispatcher: Arc<Dispatcher>,

    // Monitors are held here until start() moves them into their tasks
    pub(super) sound_monitor: Option<SoundMonitor>,
    pub(super) motion_monitor: Option<MotionMonitor>,
    pub(super) smoke_monitor: Option<SmokeMonitor>,
    pub(super) climate_monitor: Option<ClimateMonitor>,
    pub(super) tasks: Vec<(&'static str, JoinHandle<()>)>,

    // Lifecycle management
    pub(super) component_states: Mutex<HashMap<&'static str, ComponentState>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl VigilOrchestrator {
    /// Create a new orchestrator with the given configuration
    pub fn new(config: VigilConfig) -> Result<Self> {
        let components = Components::from_config(&config)?;
        Ok(Self::with_components(config, components))
    }

    /// Wire up the pipeline from explicitly provided components
    pub fn with_components(config: VigilConfig, components: Components) -> Self {
        let queue = Arc::new(EventQueue::new(
            config.queue.capacity,
            config.queue.overflow_policy,
        ));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        let cancellation_token = CancellationToken::new();

        // Presence signal flows from the motion monitor to the sound
        // monitor, which uses it to decide whether noise warrants a capture
        let (presence_tx, presence_rx) = watch::channel(false);

        let sound_monitor = SoundMonitor::new(
            components.audio_source,
            AudioLevelEstimator::new(config.audio.calibration_offset_db, config.audio.floor_db),
            NoiseGate::new(config.audio.decibel_threshold, config.audio.cooldown()),
            Arc::clone(&queue),
            presence_rx,
            PollCadence::new(config.audio.cadence(), cancellation_token.clone()),
        );

        let motion_monitor = MotionMonitor::new(
            components.motion_input,
            Arc::clone(&queue),
            presence_tx,
            PollCadence::new(config.motion.cadence(), cancellation_token.clone()),
        );

        let smoke_monitor = SmokeMonitor::new(
            components.smoke_input,
            Arc::clone(&queue),
            PollCadence::new(config.smoke.cadence(), cancellation_token.clone()),
        );

        let climate_monitor = ClimateMonitor::new(
            components.climate_input,
            ClimateEvaluator::new(config.climate.high_temperature_c),
            Arc::clone(&queue),
            PollCadence::new(config.climate.cadence(), cancellation_token.clone()),
        );

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&queue),
            Arc::clone(&components.capture),
            components.detector,
            components.publisher,
            Arc::clone(&components.actuator),
            &config.capture,
            &config.actuator,
            cancellation_token.clone(),
        ));

        Self {
            config,
            queue,
            capture: components.capture,
            actuator: components.actuator,
            dispatcher,
            sound_monitor: Some(sound_monitor),
            motion_monitor: Some(motion_monitor),
            smoke_monitor: Some(smoke_monitor),
            climate_monitor: Some(climate_monitor),
            tasks: Vec::new(),
            component_states: Mutex::new(HashMap::new()),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token,
        }
    }

    pub fn queue(&self) -> Arc<EventQueue> {
        Arc::clone(&self.queue)
    }

    pub fn dispatcher_state(&self) -> crate::dispatch::DispatcherState {
        self.dispatcher.state()
    }

    /// Take the one-shot sender that makes `run` return without a
    /// signal. `None` once taken.
    pub fn shutdown_trigger(&mut self) -> Option<oneshot::Sender<ShutdownReason>> {
        self.shutdown_sender.take()
    }

    /// Record a component lifecycle transition
    pub fn set_component_state(&self, component: &'static str, state: ComponentState) {
        debug!("Component '{}' is now {:?}", component, state);
        self.component_states.lock().insert(component, state);
    }

    pub fn component_state(&self, component: &str) -> Option<ComponentState> {
        self.component_states.lock().get(component).cloned()
    }

    pub fn component_states(&self) -> HashMap<&'static str, ComponentState> {
        self.component_states.lock().clone()
    }
}
