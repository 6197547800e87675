use crate::config::ActuatorConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::warn;

/// Indicator LED states. Exactly one pattern is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorPattern {
    /// All clear, green on
    Baseline,
    /// Motion noticed, yellow on
    Caution,
    /// Smoke, noise or over-temperature, red on
    Alarm,
    /// Everything dark, used on shutdown
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeepPattern {
    Short,
    Long,
}

/// Physical feedback collaborator. Implementations swallow their own
/// hardware errors; a dead LED must never take the dispatch loop down
/// with it.
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn set_indicator(&self, pattern: IndicatorPattern);
    async fn beep(&self, pattern: BeepPattern);
}

/// Drives LEDs and a buzzer through sysfs GPIO value files
pub struct GpioActuator {
    config: ActuatorConfig,
}

impl GpioActuator {
    pub fn new(config: ActuatorConfig) -> Self {
        Self { config }
    }

    async fn write_pin(&self, path: &str, high: bool) {
        let value = if high { "1" } else { "0" };
        if let Err(e) = tokio::fs::write(path, value).await {
            warn!("GPIO write to {} failed: {}", path, e);
        }
    }
}

#[async_trait]
impl Actuator for GpioActuator {
    async fn set_indicator(&self, pattern: IndicatorPattern) {
        let (green, yellow, red) = match pattern {
            IndicatorPattern::Baseline => (true, false, false),
            IndicatorPattern::Caution => (false, true, false),
            IndicatorPattern::Alarm => (false, false, true),
            IndicatorPattern::Off => (false, false, false),
        };

        self.write_pin(&self.config.led_green_path, green).await;
        self.write_pin(&self.config.led_yellow_path, yellow).await;
        self.write_pin(&self.config.led_red_path, red).await;
    }

    async fn beep(&self, pattern: BeepPattern) {
        let duration = match pattern {
            BeepPattern::Short => self.config.beep_short(),
            BeepPattern::Long => self.config.beep_long(),
        };

        self.write_pin(&self.config.buzzer_path, true).await;
        tokio::time::sleep(duration).await;
        self.write_pin(&self.config.buzzer_path, false).await;
    }
}

/// Recording actuator for tests
pub struct MockActuator {
    pub indicators: Mutex<Vec<IndicatorPattern>>,
    pub beeps: Mutex<Vec<BeepPattern>>,
}

impl MockActuator {
    pub fn new() -> Self {
        Self {
            indicators: Mutex::new(Vec::new()),
            beeps: Mutex::new(Vec::new()),
        }
    }

    pub fn last_indicator(&self) -> Option<IndicatorPattern> {
        self.indicators.lock().last().copied()
    }

    pub fn beep_count(&self) -> usize {
        self.beeps.lock().len()
    }
}

impl Default for MockActuator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Actuator for MockActuator {
    async fn set_indicator(&self, pattern: IndicatorPattern) {
        self.indicators.lock().push(pattern);
    }

    async fn beep(&self, pattern: BeepPattern) {
        self.beeps.lock().push(pattern);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> ActuatorConfig {
        ActuatorConfig {
            led_green_path: dir.path().join("green").to_string_lossy().into_owned(),
            led_yellow_path: dir.path().join("yellow").to_string_lossy().into_owned(),
            led_red_path: dir.path().join("red").to_string_lossy().into_owned(),
            buzzer_path: dir.path().join("buzzer").to_string_lossy().into_owned(),
            feedback_hold_ms: 10,
            beep_short_ms: 1,
            beep_long_ms: 2,
        }
    }

    #[tokio::test]
    async fn test_indicator_sets_exactly_one_led() {
        let dir = TempDir::new().unwrap();
        let actuator = GpioActuator::new(test_config(&dir));

        actuator.set_indicator(IndicatorPattern::Alarm).await;

        assert_eq!(std::fs::read_to_string(dir.path().join("green")).unwrap(), "0");
        assert_eq!(std::fs::read_to_string(dir.path().join("yellow")).unwrap(), "0");
        assert_eq!(std::fs::read_to_string(dir.path().join("red")).unwrap(), "1");
    }

    #[tokio::test]
    async fn test_off_clears_all_leds() {
        let dir = TempDir::new().unwrap();
        let actuator = GpioActuator::new(test_config(&dir));

        actuator.set_indicator(IndicatorPattern::Alarm).await;
        actuator.set_indicator(IndicatorPattern::Off).await;

        for pin in ["green", "yellow", "red"] {
            assert_eq!(std::fs::read_to_string(dir.path().join(pin)).unwrap(), "0");
        }
    }

    #[tokio::test]
    async fn test_beep_leaves_buzzer_low() {
        let dir = TempDir::new().unwrap();
        let actuator = GpioActuator::new(test_config(&dir));

        actuator.beep(BeepPattern::Short).await;

        assert_eq!(std::fs::read_to_string(dir.path().join("buzzer")).unwrap(), "0");
    }

    #[tokio::test]
    async fn test_missing_gpio_path_does_not_panic() {
        let config = ActuatorConfig {
            led_green_path: "/nonexistent/green".to_string(),
            led_yellow_path: "/nonexistent/yellow".to_string(),
            led_red_path: "/nonexistent/red".to_string(),
            buzzer_path: "/nonexistent/buzzer".to_string(),
            feedback_hold_ms: 10,
            beep_short_ms: 1,
            beep_long_ms: 1,
        };
        let actuator = GpioActuator::new(config);

        actuator.set_indicator(IndicatorPattern::Baseline).await;
        actuator.beep(BeepPattern::Long).await;
    }
}
