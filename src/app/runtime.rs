use super::{ShutdownReason, VigilOrchestrator};
use crate::error::{Result, VigilError};
use tracing::info;

impl VigilOrchestrator {
    /// Block until a termination signal or the programmatic shutdown
    /// trigger fires, then run the graceful shutdown sequence and return
    /// its exit code.
    pub async fn run(&mut self) -> Result<i32> {
        info!("Monitoring node is running");

        let trigger = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| VigilError::system("run() may only be called once".to_string()))?;

        let reason = tokio::select! {
            reason = wait_for_signal() => reason?,
            received = trigger => received
                .unwrap_or_else(|_| ShutdownReason::Error("shutdown trigger dropped".to_string())),
        };

        info!("Shutdown initiated: {:?}", reason);

        let exit_code = self.shutdown().await?;

        info!("Monitoring node shutdown complete");
        Ok(exit_code)
    }
}

/// Resolve on SIGTERM (systemd stop) or SIGINT (Ctrl+C)
#[cfg(unix)]
async fn wait_for_signal() -> Result<ShutdownReason> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
            Ok(ShutdownReason::Signal("SIGTERM".to_string()))
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Received SIGINT (Ctrl+C)");
            Ok(ShutdownReason::Signal("SIGINT".to_string()))
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<ShutdownReason> {
    tokio::signal::ctrl_c().await?;
    info!("Received SIGINT (Ctrl+C)");
    Ok(ShutdownReason::Signal("SIGINT".to_string()))
}
