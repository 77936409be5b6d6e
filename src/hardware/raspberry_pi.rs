//! Raspberry Pi backends using rppal.

use super::{angle_to_pulse_width, travel_time, EchoPin, Peripherals, Servo, TriggerPin, SERVO_PWM_PERIOD};
use crate::config::HardwareConfig;
use crate::error::{Result, SystemError};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use std::thread;
use tracing::debug;

/// Open the GPIO peripheral and claim the motor, trigger and echo pins.
pub fn open(config: &HardwareConfig) -> Result<Peripherals> {
    let gpio = Gpio::new()
        .map_err(|e| SystemError::gpio_error(format!("Failed to initialize GPIO: {}", e)))?;

    let servo = RppalServo::new(&gpio, config.motor_pin)?;
    let trigger = RppalTrigger(output_pin(&gpio, config.trigger_pin)?);
    let echo = RppalEcho(input_pin(&gpio, config.echo_pin)?);

    Ok(Peripherals {
        servo: Box::new(servo),
        trigger: Box::new(trigger),
        echo: Box::new(echo),
    })
}

fn output_pin(gpio: &Gpio, pin: u8) -> Result<OutputPin> {
    let mut output = gpio
        .get(pin)
        .map_err(|e| SystemError::gpio_error(format!("Failed to access pin {}: {}", pin, e)))?
        .into_output();
    output.set_low();
    Ok(output)
}

fn input_pin(gpio: &Gpio, pin: u8) -> Result<InputPin> {
    Ok(gpio
        .get(pin)
        .map_err(|e| SystemError::gpio_error(format!("Failed to access pin {}: {}", pin, e)))?
        .into_input())
}

/// Hobby servo driven by software PWM on any GPIO pin.
///
/// The servo gives no position feedback, so a move is considered complete once
/// the travel time for the commanded speed has elapsed.
pub struct RppalServo {
    pin: OutputPin,
    angle: Option<f64>,
}

impl RppalServo {
    pub fn new(gpio: &Gpio, pin: u8) -> Result<Self> {
        Ok(Self {
            pin: output_pin(gpio, pin)?,
            angle: None,
        })
    }
}

impl Servo for RppalServo {
    fn move_to(&mut self, angle: f64, speed: f64) -> Result<()> {
        self.pin
            .set_pwm(SERVO_PWM_PERIOD, angle_to_pulse_width(angle))
            .map_err(|e| SystemError::hardware_error(format!("Failed to drive servo: {}", e)))?;

        // Unknown start position: allow for a full sweep.
        let from = self.angle.unwrap_or(if angle >= 90.0 { 0.0 } else { 180.0 });
        let wait = travel_time(from, angle, speed);
        debug!("Servo moving {:.1} -> {:.1} over {:?}", from, angle, wait);
        thread::sleep(wait);

        self.angle = Some(angle);
        Ok(())
    }
}

impl Drop for RppalServo {
    fn drop(&mut self) {
        let _ = self.pin.clear_pwm();
    }
}

pub struct RppalTrigger(OutputPin);

impl TriggerPin for RppalTrigger {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }
}

pub struct RppalEcho(InputPin);

impl EchoPin for RppalEcho {
    fn is_high(&self) -> bool {
        self.0.is_high()
    }
}
