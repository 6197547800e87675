pub mod climate;
pub mod input;
pub mod motion;
pub mod runner;
pub mod smoke;
pub mod sound;

pub use climate::{ClimateEvaluator, ClimateMonitor};
pub use input::{
    ClimateInput, ClimateReading, DigitalInput, IioClimateInput, MockClimateInput,
    MockDigitalInput, SysfsDigitalInput,
};
pub use motion::{MotionMonitor, MotionState};
pub use runner::PollCadence;
pub use smoke::SmokeMonitor;
pub use sound::{NoiseGate, SoundMonitor, SoundState};
