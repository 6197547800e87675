use crate::queue::OverflowPolicy;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Static calibration for the whole node; read once at startup, a change
/// requires a restart
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VigilConfig {
    pub audio: AudioConfig,
    pub motion: MotionConfig,
    pub smoke: SmokeConfig,
    pub climate: ClimateConfig,
    pub queue: QueueConfig,
    pub capture: CaptureConfig,
    pub telemetry: TelemetryConfig,
    pub actuator: ActuatorConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AudioConfig {
    /// Polling cadence for the sound level source in milliseconds
    #[serde(default = "default_audio_cadence_ms")]
    pub cadence_ms: u64,

    /// Number of samples per analyzed block
    #[serde(default = "default_block_samples")]
    pub block_samples: usize,

    /// Sound level at or above which a Noise event fires, in dB
    #[serde(default = "default_decibel_threshold")]
    pub decibel_threshold: f64,

    /// Suppression window after a Noise event fires, in milliseconds
    #[serde(default = "default_noise_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Fixed offset added to the RMS estimate, determined empirically
    /// for the capture hardware
    #[serde(default = "default_calibration_offset_db")]
    pub calibration_offset_db: f64,

    /// Value returned for silent or unreadable blocks; must stay below
    /// the decibel threshold
    #[serde(default = "default_floor_db")]
    pub floor_db: f64,

    /// Path the audio capture hardware streams raw normalized samples to
    #[serde(default = "default_pcm_path")]
    pub pcm_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MotionConfig {
    /// Polling cadence for the PIR input in milliseconds
    #[serde(default = "default_motion_cadence_ms")]
    pub cadence_ms: u64,

    /// Sysfs value file for the PIR digital input
    #[serde(default = "default_motion_gpio")]
    pub gpio_value_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SmokeConfig {
    /// Polling cadence for the smoke input in milliseconds
    #[serde(default = "default_smoke_cadence_ms")]
    pub cadence_ms: u64,

    /// Sysfs value file for the smoke digital input
    #[serde(default = "default_smoke_gpio")]
    pub gpio_value_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClimateConfig {
    /// Polling cadence for climate samples in milliseconds; deliberately
    /// slower than the other sensors
    #[serde(default = "default_climate_cadence_ms")]
    pub cadence_ms: u64,

    /// Temperature above which a HighTemperature event fires, in °C
    #[serde(default = "default_high_temperature_c")]
    pub high_temperature_c: f64,

    /// IIO sysfs file for temperature (milli-°C)
    #[serde(default = "default_temperature_path")]
    pub temperature_path: String,

    /// IIO sysfs file for relative humidity (milli-%)
    #[serde(default = "default_humidity_path")]
    pub humidity_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QueueConfig {
    /// Maximum number of queued events before the overflow policy applies
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,

    /// What `push` does against a full queue
    #[serde(default = "default_overflow_policy")]
    pub overflow_policy: OverflowPolicy,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureConfig {
    /// Whether enrichment attempts image captures at all
    #[serde(default = "default_capture_enabled")]
    pub enabled: bool,

    /// Directory captured stills are written to
    #[serde(default = "default_capture_path")]
    pub path: String,

    /// Capture width in pixels
    #[serde(default = "default_capture_width")]
    pub width: u32,

    /// Capture height in pixels
    #[serde(default = "default_capture_height")]
    pub height: u32,

    /// Hard deadline for the capture process in milliseconds
    #[serde(default = "default_capture_timeout_ms")]
    pub timeout_ms: u64,

    /// External still-camera command
    #[serde(default = "default_capture_command")]
    pub command: String,

    /// External face-presence check; exit 0 means a face was found
    #[serde(default = "default_face_command")]
    pub face_command: String,

    /// Hard deadline for the face check in milliseconds
    #[serde(default = "default_face_timeout_ms")]
    pub face_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelemetryConfig {
    /// Base URL of the telemetry sink
    #[serde(default = "default_telemetry_endpoint")]
    pub endpoint: String,

    /// Device auth token; empty disables the HTTP sink and logs payloads
    /// locally instead
    #[serde(default)]
    pub token: String,

    /// Hard deadline per publish request in milliseconds
    #[serde(default = "default_telemetry_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ActuatorConfig {
    /// Sysfs value files for the indicator LEDs and buzzer
    #[serde(default = "default_led_green")]
    pub led_green_path: String,
    #[serde(default = "default_led_yellow")]
    pub led_yellow_path: String,
    #[serde(default = "default_led_red")]
    pub led_red_path: String,
    #[serde(default = "default_buzzer")]
    pub buzzer_path: String,

    /// How long event feedback is held before returning to baseline,
    /// in milliseconds
    #[serde(default = "default_feedback_hold_ms")]
    pub feedback_hold_ms: u64,

    #[serde(default = "default_beep_short_ms")]
    pub beep_short_ms: u64,
    #[serde(default = "default_beep_long_ms")]
    pub beep_long_ms: u64,
}

impl VigilConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("vigil.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let defaults = toml::to_string(&Self::default())
            .map_err(|e| ConfigError::Message(format!("defaults not serializable: {}", e)))?;

        let settings = Config::builder()
            .add_source(File::from_str(&defaults, config::FileFormat::Toml))
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with VIGIL_ prefix. Keys within a
            // section contain underscores themselves (cadence_ms), so the
            // section separator is a double underscore:
            // VIGIL_AUDIO__CADENCE_MS=125
            .add_source(
                Environment::with_prefix("VIGIL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: VigilConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.cadence_ms == 0
            || self.motion.cadence_ms == 0
            || self.smoke.cadence_ms == 0
            || self.climate.cadence_ms == 0
        {
            return Err(ConfigError::Message(
                "Sensor cadences must be greater than 0".to_string(),
            ));
        }

        if self.audio.block_samples == 0 {
            return Err(ConfigError::Message(
                "Audio block size must be greater than 0".to_string(),
            ));
        }

        if self.audio.floor_db >= self.audio.decibel_threshold {
            return Err(ConfigError::Message(format!(
                "Audio floor ({} dB) must be below the noise threshold ({} dB)",
                self.audio.floor_db, self.audio.decibel_threshold
            )));
        }

        if self.queue.capacity == 0 {
            return Err(ConfigError::Message(
                "Queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(ConfigError::Message(
                "Capture resolution must be greater than 0".to_string(),
            ));
        }

        if self.capture.timeout_ms == 0 || self.capture.face_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Capture timeouts must be greater than 0".to_string(),
            ));
        }

        if self.telemetry.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Telemetry timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl AudioConfig {
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl MotionConfig {
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms)
    }
}

impl SmokeConfig {
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms)
    }
}

impl ClimateConfig {
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms)
    }
}

impl CaptureConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn face_timeout(&self) -> Duration {
        Duration::from_millis(self.face_timeout_ms)
    }
}

impl TelemetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ActuatorConfig {
    pub fn feedback_hold(&self) -> Duration {
        Duration::from_millis(self.feedback_hold_ms)
    }

    pub fn beep_short(&self) -> Duration {
        Duration::from_millis(self.beep_short_ms)
    }

    pub fn beep_long(&self) -> Duration {
        Duration::from_millis(self.beep_long_ms)
    }
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig {
                cadence_ms: default_audio_cadence_ms(),
                block_samples: default_block_samples(),
                decibel_threshold: default_decibel_threshold(),
                cooldown_ms: default_noise_cooldown_ms(),
                calibration_offset_db: default_calibration_offset_db(),
                floor_db: default_floor_db(),
                pcm_path: default_pcm_path(),
            },
            motion: MotionConfig {
                cadence_ms: default_motion_cadence_ms(),
                gpio_value_path: default_motion_gpio(),
            },
            smoke: SmokeConfig {
                cadence_ms: default_smoke_cadence_ms(),
                gpio_value_path: default_smoke_gpio(),
            },
            climate: ClimateConfig {
                cadence_ms: default_climate_cadence_ms(),
                high_temperature_c: default_high_temperature_c(),
                temperature_path: default_temperature_path(),
                humidity_path: default_humidity_path(),
            },
            queue: QueueConfig {
                capacity: default_queue_capacity(),
                overflow_policy: default_overflow_policy(),
            },
            capture: CaptureConfig {
                enabled: default_capture_enabled(),
                path: default_capture_path(),
                width: default_capture_width(),
                height: default_capture_height(),
                timeout_ms: default_capture_timeout_ms(),
                command: default_capture_command(),
                face_command: default_face_command(),
                face_timeout_ms: default_face_timeout_ms(),
            },
            telemetry: TelemetryConfig {
                endpoint: default_telemetry_endpoint(),
                token: String::new(),
                timeout_ms: default_telemetry_timeout_ms(),
            },
            actuator: ActuatorConfig {
                led_green_path: default_led_green(),
                led_yellow_path: default_led_yellow(),
                led_red_path: default_led_red(),
                buzzer_path: default_buzzer(),
                feedback_hold_ms: default_feedback_hold_ms(),
                beep_short_ms: default_beep_short_ms(),
                beep_long_ms: default_beep_long_ms(),
            },
        }
    }
}

// Default value functions
fn default_audio_cadence_ms() -> u64 {
    200
}
fn default_block_samples() -> usize {
    1024
}
fn default_decibel_threshold() -> f64 {
    70.0
}
fn default_noise_cooldown_ms() -> u64 {
    2000
}
fn default_calibration_offset_db() -> f64 {
    94.0
}
fn default_floor_db() -> f64 {
    -30.0
}
fn default_pcm_path() -> String {
    "/run/vigil/audio.pcm".to_string()
}

fn default_motion_cadence_ms() -> u64 {
    200
}
fn default_motion_gpio() -> String {
    "/sys/class/gpio/gpio17/value".to_string()
}

fn default_smoke_cadence_ms() -> u64 {
    3000
}
fn default_smoke_gpio() -> String {
    "/sys/class/gpio/gpio22/value".to_string()
}

fn default_climate_cadence_ms() -> u64 {
    10_000
}
fn default_high_temperature_c() -> f64 {
    60.0
}
fn default_temperature_path() -> String {
    "/sys/bus/iio/devices/iio:device0/in_temp_input".to_string()
}
fn default_humidity_path() -> String {
    "/sys/bus/iio/devices/iio:device0/in_humidityrelative_input".to_string()
}

fn default_queue_capacity() -> usize {
    64
}
fn default_overflow_policy() -> OverflowPolicy {
    OverflowPolicy::DropOldest
}

fn default_capture_enabled() -> bool {
    true
}
fn default_capture_path() -> String {
    "./captures".to_string()
}
fn default_capture_width() -> u32 {
    1280
}
fn default_capture_height() -> u32 {
    720
}
fn default_capture_timeout_ms() -> u64 {
    3000
}
fn default_capture_command() -> String {
    "rpicam-still".to_string()
}
fn default_face_command() -> String {
    "vigil-facecheck".to_string()
}
fn default_face_timeout_ms() -> u64 {
    5000
}

fn default_telemetry_endpoint() -> String {
    "https://blynk.cloud".to_string()
}
fn default_telemetry_timeout_ms() -> u64 {
    5000
}

fn default_led_green() -> String {
    "/sys/class/gpio/gpio5/value".to_string()
}
fn default_led_yellow() -> String {
    "/sys/class/gpio/gpio6/value".to_string()
}
fn default_led_red() -> String {
    "/sys/class/gpio/gpio13/value".to_string()
}
fn default_buzzer() -> String {
    "/sys/class/gpio/gpio27/value".to_string()
}
fn default_feedback_hold_ms() -> u64 {
    2000
}
fn default_beep_short_ms() -> u64 {
    200
}
fn default_beep_long_ms() -> u64 {
    1000
}
