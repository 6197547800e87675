pub mod actuator;
pub mod app;
pub mod audio;
pub mod capture;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod publish;
pub mod queue;
pub mod sensors;

pub use app::{ComponentState, Components, ShutdownReason, VigilOrchestrator};
pub use config::VigilConfig;
pub use dispatch::{Dispatcher, DispatcherState};
pub use error::{Result, VigilError};
pub use event::{EnrichedEvent, EventKind, Measurement, RawEvent, TelemetryPayload};
pub use queue::{EventQueue, OverflowPolicy, QueueStatsSnapshot};
