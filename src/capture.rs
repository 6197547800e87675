use crate::config::CaptureConfig;
use crate::error::{Result, VigilError};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Still-image capture collaborator. The returned path correlates back to
/// the event through its tag; a failed capture must not leave partial
/// files visible to the caller.
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    /// One-time setup before the first capture, e.g. creating the
    /// output directory
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    async fn capture(&self, tag: &str) -> Result<PathBuf>;
}

/// Opaque face-presence check over a captured still
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, image: &Path) -> Result<bool>;
}

/// Capture via an external still-camera process (`rpicam-still` by
/// default).
///
/// The child is spawned with `kill_on_drop` so a timeout cannot leave a
/// camera process behind: when the timeout future wins, the `Child` is
/// dropped and the process receives SIGKILL.
pub struct StillCameraCapture {
    config: CaptureConfig,
}

impl StillCameraCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    fn target_path(&self, tag: &str) -> PathBuf {
        let ts = Utc::now().format("%Y%m%dT%H%M%SZ");
        PathBuf::from(&self.config.path).join(format!("{}_{}.jpg", tag, ts))
    }
}

#[async_trait]
impl CaptureProvider for StillCameraCapture {
    /// Create the capture directory if needed
    fn prepare(&self) -> Result<()> {
        let dir = PathBuf::from(&self.config.path);
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            info!("Created capture directory: {}", dir.display());
        }
        Ok(())
    }

    async fn capture(&self, tag: &str) -> Result<PathBuf> {
        let target = self.target_path(tag);
        debug!("Capturing still to {}", target.display());

        let child = Command::new(&self.config.command)
            .arg("-o")
            .arg(&target)
            .arg("--width")
            .arg(self.config.width.to_string())
            .arg("--height")
            .arg(self.config.height.to_string())
            .arg("--timeout")
            .arg("1000")
            .arg("--nopreview")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VigilError::capture(format!("capture spawn failed: {}", e)))?;

        let outcome = timeout(self.config.timeout(), child.wait_with_output()).await;

        match outcome {
            Ok(Ok(output)) if output.status.success() => {
                info!("Photo captured: {}", target.display());
                Ok(target)
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                remove_partial(&target);
                Err(VigilError::capture(format!(
                    "capture process failed: {}",
                    stderr.trim()
                )))
            }
            Ok(Err(e)) => {
                remove_partial(&target);
                Err(VigilError::capture(format!(
                    "capture execution failed: {}",
                    e
                )))
            }
            Err(_) => {
                // child was dropped and killed via kill_on_drop
                remove_partial(&target);
                Err(VigilError::capture(format!(
                    "capture timeout ({} ms)",
                    self.config.timeout_ms
                )))
            }
        }
    }
}

/// A failed capture must not leave a partial file behind
fn remove_partial(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove partial capture {}: {}", path.display(), e);
        }
    }
}

/// Face check via an external detector command: exit code 0 means a face
/// was found, 1 means none, anything else is an error.
pub struct CommandFaceDetector {
    command: String,
    timeout: std::time::Duration,
}

impl CommandFaceDetector {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            command: config.face_command.clone(),
            timeout: config.face_timeout(),
        }
    }
}

#[async_trait]
impl FaceDetector for CommandFaceDetector {
    async fn detect(&self, image: &Path) -> Result<bool> {
        let child = Command::new(&self.command)
            .arg(image)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VigilError::capture(format!("face check spawn failed: {}", e)))?;

        let status = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| VigilError::capture("face check timeout".to_string()))?
            .map_err(|e| VigilError::capture(format!("face check failed: {}", e)))?
            .status;

        match status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            other => Err(VigilError::capture(format!(
                "face check exited with {:?}",
                other
            ))),
        }
    }
}

/// Scripted capture provider for tests
pub struct MockCaptureProvider {
    directory: PathBuf,
    fail: bool,
    pub captures: Mutex<Vec<String>>,
}

impl MockCaptureProvider {
    pub fn succeeding(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            fail: false,
            captures: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            directory: PathBuf::new(),
            fail: true,
            captures: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CaptureProvider for MockCaptureProvider {
    async fn capture(&self, tag: &str) -> Result<PathBuf> {
        self.captures.lock().push(tag.to_string());
        if self.fail {
            return Err(VigilError::capture("mock capture failure".to_string()));
        }
        let path = self.directory.join(format!("{}.jpg", tag));
        std::fs::write(&path, [0xFFu8, 0xD8, 0xFF])?;
        Ok(path)
    }
}

/// Fixed-answer face detector for tests
pub struct MockFaceDetector {
    answer: Result<bool>,
}

impl MockFaceDetector {
    pub fn answering(answer: bool) -> Self {
        Self { answer: Ok(answer) }
    }

    pub fn failing() -> Self {
        Self {
            answer: Err(VigilError::capture("mock detector failure".to_string())),
        }
    }
}

#[async_trait]
impl FaceDetector for MockFaceDetector {
    async fn detect(&self, _image: &Path) -> Result<bool> {
        match &self.answer {
            Ok(v) => Ok(*v),
            Err(_) => Err(VigilError::capture("mock detector failure".to_string())),
        }
    }
}
