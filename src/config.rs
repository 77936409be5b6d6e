//! Hardware configuration: pin assignments and tunables for both peripherals.
//!
//! Read once at startup and validated before any pin is claimed. Every
//! validation failure is fatal; nothing here is re-read at runtime.

use crate::actuator::ActuatorSettings;
use crate::error::{Result, SystemError};
use crate::sensor::SensorSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lowest usable GPIO number on the 40-pin header (0 and 1 are the HAT EEPROM bus).
pub const GPIO_PIN_MIN: u8 = 2;

/// Highest GPIO number broken out on the 40-pin header.
pub const GPIO_PIN_MAX: u8 = 27;

/// Longest accepted trigger pulse width, in microseconds.
pub const MAX_PULSE_WIDTH_US: u64 = 1_000;

/// Longest accepted echo wait, in milliseconds.
pub const MAX_ECHO_TIMEOUT_MS: u64 = 1_000;

/// Longest accepted interval between streamed readings, in milliseconds.
pub const MAX_SAMPLE_INTERVAL_MS: u64 = 60_000;

/// Speed of sound in air at ~20°C, in centimetres per second.
pub const DEFAULT_SPEED_OF_SOUND: f64 = 34_300.0;

/// Configuration for the servo and the ultrasonic ranger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// GPIO driving the servo signal line
    pub motor_pin: u8,
    /// GPIO wired to the ranger's trigger input
    pub trigger_pin: u8,
    /// GPIO wired to the ranger's echo output
    pub echo_pin: u8,
    /// Degrees added or subtracted per rotate command
    pub step_degrees: u32,
    /// Servo speed for rotate commands, degrees per second
    pub servo_speed: f64,
    /// Servo speed while loitering, degrees per second
    pub loiter_speed: f64,
    /// Speed of sound, centimetres per second
    pub speed_of_sound: f64,
    /// Trigger pulse width in microseconds
    pub pulse_width_us: u64,
    /// Upper bound on each echo wait in milliseconds
    pub echo_timeout_ms: u64,
    /// Measurement attempts per reading when the echo times out
    pub measure_attempts: u32,
    /// Interval between streamed readings in milliseconds
    pub sample_interval_ms: u64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            motor_pin: 18,
            trigger_pin: 23,
            echo_pin: 24,
            step_degrees: 15,
            servo_speed: 600.0,
            loiter_speed: 360.0,
            speed_of_sound: DEFAULT_SPEED_OF_SOUND,
            pulse_width_us: 10,
            echo_timeout_ms: 38,
            measure_attempts: 3,
            sample_interval_ms: crate::DEFAULT_SAMPLE_INTERVAL_MS,
        }
    }
}

impl HardwareConfig {
    /// Set the motor, trigger and echo pins.
    pub fn with_pins(mut self, motor_pin: u8, trigger_pin: u8, echo_pin: u8) -> Self {
        self.motor_pin = motor_pin;
        self.trigger_pin = trigger_pin;
        self.echo_pin = echo_pin;
        self
    }

    /// Set the rotation step in degrees.
    pub fn with_step_degrees(mut self, step_degrees: u32) -> Self {
        self.step_degrees = step_degrees;
        self
    }

    /// Set the loiter sweep speed in degrees per second.
    pub fn with_loiter_speed(mut self, loiter_speed: f64) -> Self {
        self.loiter_speed = loiter_speed;
        self
    }

    /// Check every value, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        for (name, pin) in [
            ("Motor", self.motor_pin),
            ("Trigger", self.trigger_pin),
            ("Echo", self.echo_pin),
        ] {
            if !(GPIO_PIN_MIN..=GPIO_PIN_MAX).contains(&pin) {
                return Err(SystemError::config_error(format!(
                    "{} pin: {}, out of GPIO map range [{} -> {}]",
                    name, pin, GPIO_PIN_MIN, GPIO_PIN_MAX
                )));
            }
        }

        if self.trigger_pin == self.echo_pin {
            return Err(SystemError::config_error(format!(
                "Echo pin: {}, & Trigger pin: {}, cannot be assigned to the same pin",
                self.echo_pin, self.trigger_pin
            )));
        }
        if self.motor_pin == self.trigger_pin || self.motor_pin == self.echo_pin {
            return Err(SystemError::config_error(format!(
                "Motor pin: {} is already used by the range sensor",
                self.motor_pin
            )));
        }

        if self.step_degrees == 0 || self.step_degrees > 180 {
            return Err(SystemError::config_error(format!(
                "Rotation step must be within 1..=180 degrees, got {}",
                self.step_degrees
            )));
        }
        for (name, speed) in [("Servo", self.servo_speed), ("Loiter", self.loiter_speed)] {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(SystemError::config_error(format!(
                    "{} speed must be a positive number of degrees per second, got {}",
                    name, speed
                )));
            }
        }

        if !self.speed_of_sound.is_finite() || self.speed_of_sound <= 0.0 {
            return Err(SystemError::config_error(format!(
                "Speed of sound must be positive, got {}",
                self.speed_of_sound
            )));
        }
        for (name, value, max, unit) in [
            ("Pulse width", self.pulse_width_us, MAX_PULSE_WIDTH_US, "µs"),
            ("Echo timeout", self.echo_timeout_ms, MAX_ECHO_TIMEOUT_MS, "ms"),
            ("Sample interval", self.sample_interval_ms, MAX_SAMPLE_INTERVAL_MS, "ms"),
        ] {
            if !(1..=max).contains(&value) {
                return Err(SystemError::config_error(format!(
                    "{} must be within 1..={}{}, got {}",
                    name, max, unit, value
                )));
            }
        }
        if self.measure_attempts == 0 {
            return Err(SystemError::config_error("Measurement attempts must be at least 1"));
        }

        Ok(())
    }

    /// Settings for the actuator controller.
    pub fn actuator_settings(&self) -> ActuatorSettings {
        ActuatorSettings {
            step_degrees: self.step_degrees,
            move_speed: self.servo_speed,
            loiter_speed: self.loiter_speed,
        }
    }

    /// Settings for the range sensor.
    pub fn sensor_settings(&self) -> SensorSettings {
        SensorSettings {
            speed_of_sound: self.speed_of_sound,
            pulse_width: Duration::from_micros(self.pulse_width_us),
            echo_timeout: Duration::from_millis(self.echo_timeout_ms),
            max_attempts: self.measure_attempts,
        }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(HardwareConfig::default().validate().is_ok());
    }

    #[test]
    fn test_pin_out_of_range() {
        let config = HardwareConfig::default().with_pins(28, 23, 24);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SystemError::Config(_)));
        assert!(err.to_string().contains("Motor pin: 28"));

        let config = HardwareConfig::default().with_pins(18, 1, 24);
        assert!(config.validate().unwrap_err().to_string().contains("Trigger pin: 1"));
    }

    #[test]
    fn test_trigger_and_echo_must_differ() {
        let config = HardwareConfig::default().with_pins(18, 23, 23);
        assert!(config.validate().unwrap_err().to_string().contains("same pin"));
    }

    #[test]
    fn test_motor_cannot_share_sensor_pin() {
        let config = HardwareConfig::default().with_pins(24, 23, 24);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_step_rejected() {
        let config = HardwareConfig::default().with_step_degrees(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timing_values_are_bounded() {
        let config = HardwareConfig {
            echo_timeout_ms: u64::MAX,
            ..HardwareConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SystemError::Config(_)));
        assert!(err.to_string().contains("Echo timeout"));

        let config = HardwareConfig {
            pulse_width_us: MAX_PULSE_WIDTH_US + 1,
            ..HardwareConfig::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("Pulse width"));

        let config = HardwareConfig {
            sample_interval_ms: 0,
            ..HardwareConfig::default()
        };
        assert!(config.validate().is_err());

        let config = HardwareConfig {
            echo_timeout_ms: MAX_ECHO_TIMEOUT_MS,
            pulse_width_us: MAX_PULSE_WIDTH_US,
            ..HardwareConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_positive_speed_rejected() {
        let config = HardwareConfig::default().with_loiter_speed(0.0);
        assert!(config.validate().is_err());

        let config = HardwareConfig::default().with_loiter_speed(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_settings() {
        let config = HardwareConfig::default();
        let actuator = config.actuator_settings();
        assert_eq!(actuator.step_degrees, 15);
        assert_eq!(actuator.loiter_speed, 360.0);

        let sensor = config.sensor_settings();
        assert_eq!(sensor.pulse_width, Duration::from_micros(10));
        assert_eq!(sensor.echo_timeout, Duration::from_millis(38));
        assert_eq!(sensor.max_attempts, 3);
    }
}
