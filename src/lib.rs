//! # pi_sentry - Servo turret and ultrasonic ranger over HTTP
//!
//! Drives a hobby servo and an HC-SR04 style ultrasonic sensor wired to a
//! Raspberry Pi, and exposes them through a small HTTP/WebSocket API.
//!
//! ## Features
//!
//! - **Actuator control**: step the servo left/right or toggle an autonomous
//!   loiter sweep; all commands are linearized by a single actor task
//! - **Distance streaming**: one background sampler broadcasts readings to
//!   every `/sensor` WebSocket client
//! - **Bounded hardware waits**: a missing echo becomes a timeout, never a hang
//! - **Simulation**: runs without GPIO (feature `gpio` off, or `--simulate`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pi_sentry::{start_web_server, AppState, HardwareConfig, Peripherals, WebConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HardwareConfig::default();
//!     config.validate()?;
//!
//!     let web = WebConfig::default();
//!     let peripherals = Peripherals::open(&config)?;
//!     let state = AppState::start(peripherals, &config, web.max_websocket_connections).await?;
//!
//!     start_web_server(web, state).await?;
//!     Ok(())
//! }
//! ```

pub mod actuator;
pub mod config;
pub mod error;
pub mod hardware;
pub mod sensor;
pub mod web;

// Re-export public API
pub use actuator::{ActuatorController, ActuatorHandle, ActuatorSettings, ActuatorStatus, Direction};
pub use config::HardwareConfig;
pub use error::{Result, SystemError};
pub use hardware::{EchoPin, Peripherals, Servo, TriggerPin};
pub use sensor::{RangeSensor, SensorFeed, SensorReading, SensorSampler, SensorSettings};
pub use web::{start_web_server, AppState, WebConfig};

/// The default interval between streamed sensor readings in milliseconds
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;
