use crate::error::{Result, VigilError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;

/// One physical digital input (PIR, smoke detector output). `read_level`
/// is a pure read with no debounce applied; that happens in the monitor.
#[async_trait]
pub trait DigitalInput: Send {
    async fn read_level(&mut self) -> Result<bool>;
}

/// Climate reading from the temperature/humidity sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

/// One climate sensor. `Ok(None)` means the device returned no valid
/// value this cycle — a transient condition the caller skips and retries.
#[async_trait]
pub trait ClimateInput: Send {
    async fn read_sample(&mut self) -> Result<Option<ClimateReading>>;
}

/// Digital input backed by a sysfs GPIO value file
pub struct SysfsDigitalInput {
    path: PathBuf,
}

impl SysfsDigitalInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DigitalInput for SysfsDigitalInput {
    async fn read_level(&mut self) -> Result<bool> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        Ok(raw.trim() == "1")
    }
}

/// Climate input backed by Linux IIO sysfs files reporting milli-units
pub struct IioClimateInput {
    temperature_path: PathBuf,
    humidity_path: PathBuf,
}

impl IioClimateInput {
    pub fn new(temperature_path: impl Into<PathBuf>, humidity_path: impl Into<PathBuf>) -> Self {
        Self {
            temperature_path: temperature_path.into(),
            humidity_path: humidity_path.into(),
        }
    }

    async fn read_milli(path: &PathBuf) -> Result<Option<f64>> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(raw.trim().parse::<f64>().ok().map(|v| v / 1000.0))
    }
}

#[async_trait]
impl ClimateInput for IioClimateInput {
    async fn read_sample(&mut self) -> Result<Option<ClimateReading>> {
        let temperature = Self::read_milli(&self.temperature_path).await?;
        let humidity = Self::read_milli(&self.humidity_path).await?;

        // A partially valid reading is treated the same as no reading
        Ok(match (temperature, humidity) {
            (Some(temperature_c), Some(humidity_pct)) => Some(ClimateReading {
                temperature_c,
                humidity_pct,
            }),
            _ => None,
        })
    }
}

/// Scripted digital input for tests; holds the last level once the
/// script is exhausted
pub struct MockDigitalInput {
    levels: VecDeque<bool>,
    last: bool,
    fail_next: bool,
}

impl MockDigitalInput {
    pub fn new(levels: Vec<bool>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            last: false,
            fail_next: false,
        }
    }

    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }
}

#[async_trait]
impl DigitalInput for MockDigitalInput {
    async fn read_level(&mut self) -> Result<bool> {
        if self.fail_next {
            self.fail_next = false;
            return Err(VigilError::sensor(
                "mock".to_string(),
                "scripted read failure".to_string(),
            ));
        }
        if let Some(level) = self.levels.pop_front() {
            self.last = level;
        }
        Ok(self.last)
    }
}

/// Scripted climate input for tests
pub struct MockClimateInput {
    samples: VecDeque<Option<ClimateReading>>,
}

impl MockClimateInput {
    pub fn new(samples: Vec<Option<ClimateReading>>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }

    pub fn from_temperatures(temperatures: &[f64]) -> Self {
        Self::new(
            temperatures
                .iter()
                .map(|&temperature_c| {
                    Some(ClimateReading {
                        temperature_c,
                        humidity_pct: 50.0,
                    })
                })
                .collect(),
        )
    }
}

#[async_trait]
impl ClimateInput for MockClimateInput {
    async fn read_sample(&mut self) -> Result<Option<ClimateReading>> {
        Ok(self.samples.pop_front().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_digital_holds_last_level() {
        let mut input = MockDigitalInput::new(vec![true]);
        assert!(input.read_level().await.unwrap());
        assert!(input.read_level().await.unwrap());
    }

    #[tokio::test]
    async fn test_mock_digital_scripted_failure() {
        let mut input = MockDigitalInput::new(vec![true]);
        input.fail_next();
        assert!(input.read_level().await.is_err());
        assert!(input.read_level().await.unwrap());
    }

    #[tokio::test]
    async fn test_sysfs_digital_input_parses_value_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value");

        std::fs::write(&path, "1\n").unwrap();
        let mut input = SysfsDigitalInput::new(&path);
        assert!(input.read_level().await.unwrap());

        std::fs::write(&path, "0\n").unwrap();
        assert!(!input.read_level().await.unwrap());
    }

    #[tokio::test]
    async fn test_iio_climate_input_scales_milli_units() {
        let dir = tempfile::tempdir().unwrap();
        let temperature = dir.path().join("in_temp_input");
        let humidity = dir.path().join("in_humidityrelative_input");
        std::fs::write(&temperature, "23500\n").unwrap();
        std::fs::write(&humidity, "41000\n").unwrap();

        let mut input = IioClimateInput::new(&temperature, &humidity);
        let reading = input.read_sample().await.unwrap().unwrap();
        assert!((reading.temperature_c - 23.5).abs() < 1e-9);
        assert!((reading.humidity_pct - 41.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_iio_climate_input_garbage_is_transient() {
        let dir = tempfile::tempdir().unwrap();
        let temperature = dir.path().join("in_temp_input");
        let humidity = dir.path().join("in_humidityrelative_input");
        std::fs::write(&temperature, "not-a-number\n").unwrap();
        std::fs::write(&humidity, "41000\n").unwrap();

        let mut input = IioClimateInput::new(&temperature, &humidity);
        assert_eq!(input.read_sample().await.unwrap(), None);
    }
}
