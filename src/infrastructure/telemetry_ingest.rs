// Telemetry ingestion - decode and validate push-channel events
//
// Everything malformed is dropped here, logged, and never surfaced to the
// user; nothing past this boundary can fail on bad input.
use crate::domain::bearing;
use crate::domain::device::{DeviceId, Quantity, TelemetryEvent, TelemetryPayload};
use crate::domain::link::RadioStatus;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Push-channel event as delivered on the wire. `value` is a number for
/// readings, a state string for `connectionState`, and an object for
/// `radioStatus`.
#[derive(Debug, Deserialize)]
pub struct RawTelemetry {
    pub device: String,
    pub quantity: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error, PartialEq)]
pub enum IngestError {
    #[error("empty device id")]
    EmptyDevice,
    #[error("unknown quantity {0:?}")]
    UnknownQuantity(String),
    #[error("non-numeric {0} value")]
    NonNumeric(&'static str),
    #[error("non-finite {0} reading")]
    NonFinite(&'static str),
    #[error("unknown connection state {0:?}")]
    UnknownConnectionState(String),
    #[error("malformed status payload: {0}")]
    MalformedStatus(String),
}

/// Validate one raw event into a typed `TelemetryEvent`.
pub fn validate(raw: RawTelemetry) -> Result<TelemetryEvent, IngestError> {
    if raw.device.trim().is_empty() {
        return Err(IngestError::EmptyDevice);
    }
    let device = DeviceId::new(raw.device);
    let received_at = raw.received_at.unwrap_or_else(Utc::now);

    let payload = match raw.quantity.as_str() {
        "azimuth" => {
            let value = finite_number(&raw.value, "azimuth")?;
            TelemetryPayload::Reading {
                quantity: Quantity::Azimuth,
                value: bearing::normalize(value),
            }
        }
        "frequency" => {
            let value = finite_number(&raw.value, "frequency")?;
            TelemetryPayload::Reading {
                quantity: Quantity::Frequency,
                value,
            }
        }
        "connectionState" => {
            let state = serde_json::from_value(raw.value.clone())
                .map_err(|_| IngestError::UnknownConnectionState(raw.value.to_string()))?;
            TelemetryPayload::Connection(state)
        }
        "radioStatus" => {
            let status: RadioStatus = serde_json::from_value(raw.value)
                .map_err(|err| IngestError::MalformedStatus(err.to_string()))?;
            TelemetryPayload::Status(status)
        }
        other => return Err(IngestError::UnknownQuantity(other.to_string())),
    };

    Ok(TelemetryEvent {
        device,
        payload,
        received_at,
    })
}

fn finite_number(value: &serde_json::Value, what: &'static str) -> Result<f64, IngestError> {
    let number = value.as_f64().ok_or(IngestError::NonNumeric(what))?;
    if !number.is_finite() {
        return Err(IngestError::NonFinite(what));
    }
    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::ConnectionState;
    use serde_json::json;

    fn raw(device: &str, quantity: &str, value: serde_json::Value) -> RawTelemetry {
        RawTelemetry {
            device: device.to_string(),
            quantity: quantity.to_string(),
            value,
            received_at: None,
        }
    }

    #[test]
    fn test_azimuth_is_normalized_into_domain() {
        let event = validate(raw("rotator-1", "azimuth", json!(365.0))).unwrap();
        match event.payload {
            TelemetryPayload::Reading { quantity, value } => {
                assert_eq!(quantity, Quantity::Azimuth);
                assert_eq!(value, 5.0);
            }
            other => panic!("expected reading, got {:?}", other),
        }
    }

    #[test]
    fn test_connection_state_string_decodes() {
        let event = validate(raw("ic7300", "connectionState", json!("monitoring"))).unwrap();
        assert!(matches!(
            event.payload,
            TelemetryPayload::Connection(ConnectionState::Monitoring)
        ));
    }

    #[test]
    fn test_radio_status_object_decodes() {
        let event = validate(raw(
            "ic7300",
            "radioStatus",
            json!({"band": "20m", "mode": "FT8", "transmitting": false}),
        ))
        .unwrap();
        match event.payload {
            TelemetryPayload::Status(status) => assert_eq!(status.band, "20m"),
            other => panic!("expected status, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_device_is_rejected() {
        assert_eq!(
            validate(raw("  ", "azimuth", json!(10.0))).unwrap_err(),
            IngestError::EmptyDevice
        );
    }

    #[test]
    fn test_unknown_quantity_is_rejected() {
        assert_eq!(
            validate(raw("ic7300", "swr", json!(1.5))).unwrap_err(),
            IngestError::UnknownQuantity("swr".to_string())
        );
    }

    #[test]
    fn test_non_numeric_reading_is_rejected() {
        assert_eq!(
            validate(raw("rotator-1", "azimuth", json!("north"))).unwrap_err(),
            IngestError::NonNumeric("azimuth")
        );
    }

    #[test]
    fn test_unknown_connection_state_is_rejected() {
        assert!(matches!(
            validate(raw("ic7300", "connectionState", json!("sleeping"))).unwrap_err(),
            IngestError::UnknownConnectionState(_)
        ));
    }

    #[test]
    fn test_malformed_status_is_rejected() {
        assert!(matches!(
            validate(raw("ic7300", "radioStatus", json!({"band": "20m"}))).unwrap_err(),
            IngestError::MalformedStatus(_)
        ));
    }
}
