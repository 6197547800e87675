use crate::error::{Result, VigilError};
use async_trait::async_trait;
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;

/// Supplies fixed-duration blocks of normalized audio samples (-1.0..1.0).
/// A failed acquisition is a transient condition, never fatal to the
/// sound polling loop.
#[async_trait]
pub trait AudioBlockSource: Send {
    async fn read_block(&mut self) -> Result<Vec<f64>>;
}

/// Maps one block of samples to a calibrated sound pressure level.
///
/// The floor value stands in for "no usable signal" and is configured
/// strictly below the noise threshold so it can never fire an event.
#[derive(Debug, Clone, Copy)]
pub struct AudioLevelEstimator {
    calibration_offset_db: f64,
    floor_db: f64,
}

impl AudioLevelEstimator {
    pub fn new(calibration_offset_db: f64, floor_db: f64) -> Self {
        Self {
            calibration_offset_db,
            floor_db,
        }
    }

    /// Estimate the sound pressure level of a sample block in dB.
    ///
    /// Root-mean-square over the block; silence (RMS <= 0, including an
    /// empty block) yields the floor value rather than a singularity from
    /// the logarithm.
    pub fn estimate(&self, samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return self.floor_db;
        }

        let sum_sq: f64 = samples.iter().map(|s| s * s).sum();
        let rms = (sum_sq / samples.len() as f64).sqrt();

        if rms <= 0.0 {
            return self.floor_db;
        }

        20.0 * rms.log10() + self.calibration_offset_db
    }

    pub fn floor_db(&self) -> f64 {
        self.floor_db
    }
}

/// Reads raw little-endian s16 PCM from a path the capture hardware
/// streams into (typically a FIFO fed by `arecord`). Samples are
/// normalized to -1.0..1.0 before estimation.
pub struct PcmStreamSource {
    path: PathBuf,
    block_samples: usize,
}

impl PcmStreamSource {
    pub fn new(path: impl Into<PathBuf>, block_samples: usize) -> Self {
        Self {
            path: path.into(),
            block_samples,
        }
    }
}

#[async_trait]
impl AudioBlockSource for PcmStreamSource {
    async fn read_block(&mut self) -> Result<Vec<f64>> {
        let path = self.path.clone();
        let block_samples = self.block_samples;

        // Blocking reads stay off the async worker threads
        let samples = tokio::task::spawn_blocking(move || -> Result<Vec<f64>> {
            let mut file = std::fs::File::open(&path)?;
            let mut buf = vec![0u8; block_samples * 2];
            file.read_exact(&mut buf)?;

            Ok(buf
                .chunks_exact(2)
                .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f64 / 32768.0)
                .collect())
        })
        .await
        .map_err(|e| VigilError::sensor("audio".to_string(), e.to_string()))??;

        debug!("Acquired audio block of {} samples", samples.len());
        Ok(samples)
    }
}

/// Scripted source for tests and dry runs
pub struct MockAudioSource {
    blocks: std::collections::VecDeque<Result<Vec<f64>>>,
}

impl MockAudioSource {
    pub fn new(blocks: Vec<Result<Vec<f64>>>) -> Self {
        Self {
            blocks: blocks.into_iter().collect(),
        }
    }

    /// A source whose blocks each produce the given dB estimate under the
    /// supplied estimator, one poll per entry
    pub fn from_levels(levels: &[f64], estimator: &AudioLevelEstimator) -> Self {
        let blocks = levels
            .iter()
            .map(|db| {
                // invert estimate(): constant-amplitude block with the RMS
                // that produces this level
                let rms = 10f64.powf((db - estimator.calibration_offset_db) / 20.0);
                Ok(vec![rms; 64])
            })
            .collect();
        Self::new(blocks)
    }
}

#[async_trait]
impl AudioBlockSource for MockAudioSource {
    async fn read_block(&mut self) -> Result<Vec<f64>> {
        self.blocks.pop_front().unwrap_or_else(|| {
            Err(VigilError::sensor(
                "audio".to_string(),
                "mock source exhausted".to_string(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> AudioLevelEstimator {
        AudioLevelEstimator::new(94.0, -30.0)
    }

    #[test]
    fn test_silence_returns_floor() {
        let est = estimator();
        assert_eq!(est.estimate(&[0.0; 512]), -30.0);
        assert_eq!(est.estimate(&[]), -30.0);
    }

    #[test]
    fn test_floor_below_realistic_thresholds() {
        let est = estimator();
        assert!(est.floor_db() < 70.0);
        assert!(est.estimate(&[0.0; 16]) < 70.0);
    }

    #[test]
    fn test_known_amplitude_block() {
        let est = estimator();
        // constant amplitude 0.1 -> RMS 0.1 -> 20*log10(0.1) = -20 dBFS
        let level = est.estimate(&[0.1; 256]);
        assert!((level - 74.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_is_monotonic_in_amplitude() {
        let est = estimator();
        let quiet = est.estimate(&[0.01; 256]);
        let loud = est.estimate(&[0.5; 256]);
        assert!(loud > quiet);
    }

    #[test]
    fn test_mock_source_round_trips_levels() {
        let est = estimator();
        let mut source = MockAudioSource::from_levels(&[50.0, 75.0], &est);

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        rt.block_on(async {
            let first = est.estimate(&source.read_block().await.unwrap());
            let second = est.estimate(&source.read_block().await.unwrap());
            assert!((first - 50.0).abs() < 1e-6);
            assert!((second - 75.0).abs() < 1e-6);
        });
    }
}
