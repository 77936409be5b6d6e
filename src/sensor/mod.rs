//! Ultrasonic range sensor: pulse-timing measurement and the sampling loop.
//!
//! [`RangeSensor`] owns the trigger/echo pair and serializes measurements
//! internally, so two callers can never interleave trigger pulses.
//! [`SensorSampler`] is the only regular caller: one background producer that
//! measures at a fixed interval and broadcasts each [`SensorReading`] to every
//! streaming subscriber.

pub mod ranger;
pub mod reading;
pub mod sampler;

pub use ranger::{distance_cm, RangeSensor};
pub use reading::{ReadingStatus, SensorReading};
pub use sampler::{SensorFeed, SensorSampler};

use std::time::Duration;

/// Tunables for the range sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSettings {
    /// Speed of sound in centimetres per second
    pub speed_of_sound: f64,
    /// How long the trigger is held low, then high, to start a ranging cycle
    pub pulse_width: Duration,
    /// Upper bound on each of the two echo waits
    pub echo_timeout: Duration,
    /// Attempts per reading; only timeouts are retried
    pub max_attempts: u32,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            speed_of_sound: crate::config::DEFAULT_SPEED_OF_SOUND,
            pulse_width: Duration::from_micros(10),
            echo_timeout: Duration::from_millis(38),
            max_attempts: 3,
        }
    }
}
