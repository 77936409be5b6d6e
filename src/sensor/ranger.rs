//! HC-SR04 pulse-timing measurement.

use super::SensorSettings;
use crate::error::{Result, SystemError};
use crate::hardware::{EchoPin, TriggerPin};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

struct SensorPins {
    trigger: Box<dyn TriggerPin>,
    echo: Box<dyn EchoPin>,
}

/// Ultrasonic ranger on a trigger/echo pin pair.
pub struct RangeSensor {
    pins: Mutex<SensorPins>,
    settings: SensorSettings,
}

/// Distance in centimetres for a round-trip echo of `echo` duration.
pub fn distance_cm(echo: Duration, speed_of_sound: f64) -> f64 {
    echo.as_secs_f64() * speed_of_sound / 2.0
}

impl RangeSensor {
    pub fn new(
        mut trigger: Box<dyn TriggerPin>,
        echo: Box<dyn EchoPin>,
        settings: SensorSettings,
    ) -> Self {
        trigger.set_low();
        Self {
            pins: Mutex::new(SensorPins { trigger, echo }),
            settings,
        }
    }

    pub fn settings(&self) -> &SensorSettings {
        &self.settings
    }

    /// Take one measurement, in centimetres.
    ///
    /// Blocks for the trigger pulse plus the echo (tens of milliseconds at
    /// most); call it from a blocking context. Concurrent callers queue on an
    /// internal lock. Each echo wait is bounded by `echo_timeout` and reports
    /// [`SystemError::Timeout`] when exceeded.
    pub fn measure_distance(&self) -> Result<f64> {
        let mut pins = self
            .pins
            .lock()
            .map_err(|_| SystemError::hardware_error("range sensor lock poisoned"))?;
        let pulse_width = self.settings.pulse_width;

        pins.trigger.set_low();
        thread::sleep(pulse_width);
        pins.trigger.set_high();
        thread::sleep(pulse_width);
        pins.trigger.set_low();

        let timeout = self.settings.echo_timeout;
        let start = wait_for_level(pins.echo.as_ref(), true, timeout)
            .ok_or_else(|| SystemError::timeout_error("echo pulse never started"))?;
        let end = wait_for_level(pins.echo.as_ref(), false, timeout)
            .ok_or_else(|| SystemError::timeout_error("echo pulse never ended"))?;

        Ok(distance_cm(end.duration_since(start), self.settings.speed_of_sound))
    }

    /// [`measure_distance`](Self::measure_distance), retrying timeouts up to
    /// `max_attempts` times in total.
    pub fn measure_with_retry(&self) -> Result<f64> {
        let mut attempt = 1;
        loop {
            match self.measure_distance() {
                Err(e) if e.is_transient() && attempt < self.settings.max_attempts => {
                    debug!("Measurement attempt {} failed: {}", attempt, e);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

/// Spin until the echo line reads `high`, returning when it did.
fn wait_for_level(echo: &dyn EchoPin, high: bool, timeout: Duration) -> Option<Instant> {
    let deadline = Instant::now() + timeout;
    loop {
        if echo.is_high() == high {
            return Some(Instant::now());
        }
        if Instant::now() >= deadline {
            return None;
        }
        std::hint::spin_loop();
    }
}
