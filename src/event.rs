use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

/// Sensor event kinds understood by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Noise,
    Motion,
    Smoke,
    HighTemperature,
    ClimateSample,
}

impl EventKind {
    /// Stable string form, used for telemetry and capture file tags
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Noise => "noise",
            EventKind::Motion => "motion",
            EventKind::Smoke => "smoke",
            EventKind::HighTemperature => "high_temperature",
            EventKind::ClimateSample => "climate_sample",
        }
    }
}

/// Numeric payload attached to an event; which variant applies is fixed
/// by the event kind at construction time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// Estimated sound pressure level
    Decibels(f64),
    /// Temperature reading that crossed the configured threshold
    Celsius(f64),
    /// Periodic climate sample
    Climate {
        temperature_c: f64,
        humidity_pct: f64,
    },
}

/// Immutable event produced by a sensor polling loop.
///
/// `monotonic` orders events and drives cooldown arithmetic; `timestamp`
/// is the wall-clock value reported in telemetry. The constructors are the
/// only way to build one, so the kind/measurement invariant holds by
/// construction: digital triggers (Motion, Smoke) carry no measurement,
/// everything else carries exactly the measurement its kind defines.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub kind: EventKind,
    pub monotonic: Instant,
    pub timestamp: DateTime<Utc>,
    pub measurement: Option<Measurement>,
    pub request_capture: bool,
}

impl RawEvent {
    fn new(kind: EventKind, measurement: Option<Measurement>, request_capture: bool) -> Self {
        Self {
            kind,
            monotonic: Instant::now(),
            timestamp: Utc::now(),
            measurement,
            request_capture,
        }
    }

    /// Sound level crossed the noise threshold. Capture is requested only
    /// when a co-located presence signal was active at evaluation time.
    pub fn noise(level_db: f64, presence: bool) -> Self {
        Self::new(EventKind::Noise, Some(Measurement::Decibels(level_db)), presence)
    }

    /// Rising edge on the PIR input
    pub fn motion() -> Self {
        Self::new(EventKind::Motion, None, true)
    }

    /// Smoke input active this poll cycle
    pub fn smoke() -> Self {
        Self::new(EventKind::Smoke, None, false)
    }

    /// Temperature above the configured threshold
    pub fn high_temperature(temperature_c: f64) -> Self {
        Self::new(
            EventKind::HighTemperature,
            Some(Measurement::Celsius(temperature_c)),
            false,
        )
    }

    /// Periodic climate reading
    pub fn climate(temperature_c: f64, humidity_pct: f64) -> Self {
        Self::new(
            EventKind::ClimateSample,
            Some(Measurement::Climate {
                temperature_c,
                humidity_pct,
            }),
            false,
        )
    }

    /// Human-readable description for logging
    pub fn description(&self) -> String {
        match (self.kind, &self.measurement) {
            (EventKind::Noise, Some(Measurement::Decibels(db))) => {
                format!("noise at {:.1} dB", db)
            }
            (EventKind::HighTemperature, Some(Measurement::Celsius(c))) => {
                format!("high temperature {:.1} °C", c)
            }
            (
                EventKind::ClimateSample,
                Some(Measurement::Climate {
                    temperature_c,
                    humidity_pct,
                }),
            ) => format!("climate {:.1} °C / {:.0}%", temperature_c, humidity_pct),
            (kind, _) => kind.as_str().to_string(),
        }
    }
}

/// Result of enriching a `RawEvent`; consumed once by the publisher
#[derive(Debug, Clone)]
pub struct EnrichedEvent {
    pub event_id: Uuid,
    pub raw: RawEvent,
    /// Present only if a capture was attempted and succeeded
    pub image_path: Option<PathBuf>,
    /// Present only if an image was captured and face detection ran
    pub face_detected: Option<bool>,
    /// Attached only when a face was detected; uninteresting frames are
    /// not transmitted
    pub image_payload: Option<Vec<u8>>,
}

impl EnrichedEvent {
    /// An event that went through enrichment without any image fields
    pub fn bare(raw: RawEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            raw,
            image_path: None,
            face_detected: None,
            image_payload: None,
        }
    }

    pub fn to_payload(&self) -> TelemetryPayload {
        let (sound_level_db, temperature_c, humidity_pct) = match self.raw.measurement {
            Some(Measurement::Decibels(db)) => (Some(db), None, None),
            Some(Measurement::Celsius(c)) => (None, Some(c), None),
            Some(Measurement::Climate {
                temperature_c,
                humidity_pct,
            }) => (None, Some(temperature_c), Some(humidity_pct)),
            None => (None, None, None),
        };

        TelemetryPayload {
            event_id: self.event_id,
            event_kind: self.raw.kind,
            timestamp: self.raw.timestamp,
            sound_level_db,
            temperature_c,
            humidity_pct,
            image_saved: self
                .image_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            image_has_face: self.face_detected,
            image_b64: self
                .image_payload
                .as_ref()
                .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes)),
        }
    }
}

/// Wire shape handed to the telemetry sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryPayload {
    /// Correlates the published record with capture logs for this event
    pub event_id: Uuid,
    pub event_kind: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_level_db: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_saved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_has_face: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_b64: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_determines_measurement() {
        assert!(RawEvent::motion().measurement.is_none());
        assert!(RawEvent::smoke().measurement.is_none());
        assert!(matches!(
            RawEvent::noise(72.5, false).measurement,
            Some(Measurement::Decibels(_))
        ));
        assert!(matches!(
            RawEvent::high_temperature(61.0).measurement,
            Some(Measurement::Celsius(_))
        ));
        assert!(matches!(
            RawEvent::climate(22.0, 40.0).measurement,
            Some(Measurement::Climate { .. })
        ));
    }

    #[test]
    fn test_capture_request_policy() {
        assert!(RawEvent::motion().request_capture);
        assert!(RawEvent::noise(80.0, true).request_capture);
        assert!(!RawEvent::noise(80.0, false).request_capture);
        assert!(!RawEvent::smoke().request_capture);
        assert!(!RawEvent::climate(20.0, 50.0).request_capture);
    }

    #[test]
    fn test_payload_omits_absent_fields() {
        let enriched = EnrichedEvent::bare(RawEvent::motion());
        let payload = enriched.to_payload();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["event_kind"], "motion");
        assert_eq!(json["event_id"], enriched.event_id.to_string());
        assert!(json.get("image_saved").is_none());
        assert!(json.get("image_has_face").is_none());
        assert!(json.get("image_b64").is_none());
        assert!(json.get("sound_level_db").is_none());
    }

    #[test]
    fn test_payload_encodes_image_when_face_found() {
        let mut enriched = EnrichedEvent::bare(RawEvent::motion());
        enriched.image_path = Some(PathBuf::from("/tmp/motion_x.jpg"));
        enriched.face_detected = Some(true);
        enriched.image_payload = Some(vec![0xFF, 0xD8, 0xFF]);

        let payload = enriched.to_payload();
        assert_eq!(payload.image_saved.as_deref(), Some("/tmp/motion_x.jpg"));
        assert_eq!(payload.image_has_face, Some(true));
        assert_eq!(payload.image_b64.as_deref(), Some("/9j/"));
    }

    #[test]
    fn test_climate_payload_fields() {
        let enriched = EnrichedEvent::bare(RawEvent::climate(21.5, 48.0));
        let payload = enriched.to_payload();
        assert_eq!(payload.temperature_c, Some(21.5));
        assert_eq!(payload.humidity_pct, Some(48.0));
        assert!(payload.sound_level_db.is_none());
    }
}
