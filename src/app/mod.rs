mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod types;


pub use orchestrator::{Components, VigilOrchestrator};
pub use types::{ComponentState, ShutdownReason};
