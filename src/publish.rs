use crate::config::TelemetryConfig;
use crate::error::{Result, VigilError};
use crate::event::{EventKind, TelemetryPayload};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

/// Telemetry sink collaborator. A publish failure is reported to the
/// caller but must never be allowed to stall the pipeline; retry policy,
/// if any, belongs behind this trait.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, payload: &TelemetryPayload) -> Result<()>;
}

/// Blynk-style virtual-pin sink over HTTP.
///
/// Pin layout follows the deployed dashboard: V1 temperature, V2
/// humidity, V3 smoke state, V4 the event log as JSON. Every request
/// carries a bounded timeout configured on the client.
pub struct BlynkPublisher {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl BlynkPublisher {
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| VigilError::publish(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Virtual pin updates for one payload
    fn pin_updates(payload: &TelemetryPayload) -> Vec<(&'static str, String)> {
        let mut pins = Vec::new();

        if let Some(t) = payload.temperature_c {
            pins.push(("V1", format!("{:.1}", t)));
        }
        if let Some(h) = payload.humidity_pct {
            pins.push(("V2", format!("{:.0}", h)));
        }
        if payload.event_kind == EventKind::Smoke {
            pins.push(("V3", "1".to_string()));
        }

        let event_json =
            serde_json::to_string(payload).unwrap_or_else(|_| payload.event_kind.as_str().into());
        pins.push(("V4", event_json));

        pins
    }
}

#[async_trait]
impl Publisher for BlynkPublisher {
    async fn publish(&self, payload: &TelemetryPayload) -> Result<()> {
        let url = format!("{}/external/api/batch/update", self.endpoint);

        let mut query: Vec<(&str, String)> = vec![("token", self.token.clone())];
        query.extend(Self::pin_updates(payload));

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| VigilError::publish(format!("telemetry request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(VigilError::publish(format!(
                "telemetry sink returned {}",
                response.status()
            )));
        }

        debug!("Published {} telemetry", payload.event_kind.as_str());
        Ok(())
    }
}

/// Fallback sink used when no telemetry token is configured: payloads go
/// to the log instead of the network
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, payload: &TelemetryPayload) -> Result<()> {
        match serde_json::to_string(payload) {
            Ok(json) => info!("Telemetry (local only): {}", json),
            Err(e) => info!(
                "Telemetry (local only, unserializable {}): {}",
                payload.event_kind.as_str(),
                e
            ),
        }
        Ok(())
    }
}

/// Recording sink for tests
pub struct MockPublisher {
    pub published: Mutex<Vec<TelemetryPayload>>,
    fail: bool,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.published.lock().len()
    }
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, payload: &TelemetryPayload) -> Result<()> {
        self.published.lock().push(payload.clone());
        if self.fail {
            return Err(VigilError::publish("mock sink unreachable".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EnrichedEvent, RawEvent};

    #[test]
    fn test_pin_updates_for_climate() {
        let payload = EnrichedEvent::bare(RawEvent::climate(21.5, 48.0)).to_payload();
        let pins = BlynkPublisher::pin_updates(&payload);

        assert_eq!(pins[0], ("V1", "21.5".to_string()));
        assert_eq!(pins[1], ("V2", "48".to_string()));
        assert_eq!(pins[2].0, "V4");
    }

    #[test]
    fn test_pin_updates_for_smoke() {
        let payload = EnrichedEvent::bare(RawEvent::smoke()).to_payload();
        let pins = BlynkPublisher::pin_updates(&payload);

        assert_eq!(pins[0], ("V3", "1".to_string()));
        assert_eq!(pins[1].0, "V4");
    }

    #[test]
    fn test_pin_updates_for_motion_is_event_log_only() {
        let payload = EnrichedEvent::bare(RawEvent::motion()).to_payload();
        let pins = BlynkPublisher::pin_updates(&payload);

        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].0, "V4");
        assert!(pins[0].1.contains("motion"));
    }

    #[tokio::test]
    async fn test_mock_publisher_records_even_on_failure() {
        let publisher = MockPublisher::failing();
        let payload = EnrichedEvent::bare(RawEvent::motion()).to_payload();

        assert!(publisher.publish(&payload).await.is_err());
        assert_eq!(publisher.count(), 1);
    }
}
