//! Pin-level access to the servo and the ultrasonic ranger.
//!
//! The actuator and sensor components only talk to the traits in this module.
//! Real Raspberry Pi backends built on `rppal` are feature-gated behind `gpio`
//! so the crate still compiles (and runs against the [`sim`] backends) on
//! machines without GPIO.

pub mod sim;

#[cfg(feature = "gpio")]
pub mod raspberry_pi;

use crate::config::HardwareConfig;
use crate::error::Result;
use std::time::Duration;
use tracing::info;

/// Servo PWM period (50 Hz).
pub const SERVO_PWM_PERIOD: Duration = Duration::from_millis(20);

/// Pulse width that holds the servo at 0 degrees (SG90 class).
pub const SERVO_MIN_PULSE_US: f64 = 500.0;

/// Pulse width that holds the servo at 180 degrees.
pub const SERVO_MAX_PULSE_US: f64 = 2500.0;

/// A positional servo.
pub trait Servo: Send {
    /// Drive the horn to `angle` degrees at roughly `speed` degrees per second
    /// and block until the move has completed.
    fn move_to(&mut self, angle: f64, speed: f64) -> Result<()>;
}

/// The trigger line of an ultrasonic ranger (output).
pub trait TriggerPin: Send {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

/// The echo line of an ultrasonic ranger (input).
pub trait EchoPin: Send {
    fn is_high(&self) -> bool;
}

/// Map an angle in [0, 180] to the PWM pulse width that holds it.
pub fn angle_to_pulse_width(angle: f64) -> Duration {
    let angle = angle.clamp(0.0, 180.0);
    let pulse_us = SERVO_MIN_PULSE_US + (angle / 180.0) * (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US);
    Duration::from_secs_f64(pulse_us / 1_000_000.0)
}

/// Time a servo needs to sweep from `from` to `to` at `speed` degrees per second.
pub fn travel_time(from: f64, to: f64, speed: f64) -> Duration {
    if speed <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64((to - from).abs() / speed)
}

/// Every physical resource the process owns, opened once at startup.
pub struct Peripherals {
    pub servo: Box<dyn Servo>,
    pub trigger: Box<dyn TriggerPin>,
    pub echo: Box<dyn EchoPin>,
}

impl Peripherals {
    /// Claim the configured pins on the board.
    #[cfg(feature = "gpio")]
    pub fn open(config: &HardwareConfig) -> Result<Self> {
        let peripherals = raspberry_pi::open(config)?;
        info!(
            "GPIO opened: motor pin {}, trigger pin {}, echo pin {}",
            config.motor_pin, config.trigger_pin, config.echo_pin
        );
        Ok(peripherals)
    }

    /// Without the `gpio` feature there is no board to open; fall back to simulation.
    #[cfg(not(feature = "gpio"))]
    pub fn open(config: &HardwareConfig) -> Result<Self> {
        tracing::warn!("GPIO support not compiled in, using simulated peripherals");
        Ok(Self::simulated(config))
    }

    /// Simulated servo and ranger that behave like the real parts.
    pub fn simulated(config: &HardwareConfig) -> Self {
        let (trigger, echo, _target) =
            sim::ultrasonic(Some(sim::echo_for_distance(sim::DEFAULT_SIM_DISTANCE_CM, config.speed_of_sound)));
        info!("Using simulated peripherals");
        Self {
            servo: Box::new(sim::SimServo::new(sim::DEFAULT_SIM_MOVE_DELAY).0),
            trigger: Box::new(trigger),
            echo: Box::new(echo),
        }
    }
}
