//! Wire payload for streamed distance readings.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Outcome tag carried by every reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadingStatus {
    #[serde(rename = "Success")]
    Success,
    #[serde(rename = "Error measuring distance")]
    Error,
}

/// One distance sample as pushed to streaming clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Distance in centimetres; 0.0 when the measurement failed
    pub distance: f64,
    pub status: ReadingStatus,
}

impl SensorReading {
    pub fn success(distance: f64) -> Self {
        Self {
            distance,
            status: ReadingStatus::Success,
        }
    }

    pub fn error() -> Self {
        Self {
            distance: 0.0,
            status: ReadingStatus::Error,
        }
    }

    pub fn from_measurement(measurement: &Result<f64>) -> Self {
        match measurement {
            Ok(distance) if distance.is_finite() && *distance >= 0.0 => Self::success(*distance),
            _ => Self::error(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReadingStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SystemError;

    #[test]
    fn test_payload_shape() {
        let json = serde_json::to_value(SensorReading::success(42.5)).unwrap();
        assert_eq!(json, serde_json::json!({"distance": 42.5, "status": "Success"}));

        let json = serde_json::to_value(SensorReading::error()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"distance": 0.0, "status": "Error measuring distance"})
        );
    }

    #[test]
    fn test_from_measurement() {
        assert!(SensorReading::from_measurement(&Ok(12.0)).is_success());

        let failed = SensorReading::from_measurement(&Err(SystemError::timeout_error("echo")));
        assert_eq!(failed, SensorReading::error());

        // Negative sentinels never reach the wire as distances.
        let negative = SensorReading::from_measurement(&Ok(-1.0));
        assert_eq!(negative.status, ReadingStatus::Error);
        assert!(negative.distance >= 0.0);
    }
}
