//! Shared application state handed to every handler.

use crate::actuator::{ActuatorController, ActuatorHandle};
use crate::config::HardwareConfig;
use crate::error::Result;
use crate::hardware::Peripherals;
use crate::sensor::{RangeSensor, SensorFeed, SensorSampler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Handles to the running components. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub actuator: ActuatorHandle,
    pub feed: SensorFeed,
    pub sessions: Arc<SessionLimit>,
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Start the actuator controller and sensor sampler on `peripherals`.
    ///
    /// The servo is centered before this returns.
    pub async fn start(
        peripherals: Peripherals,
        config: &HardwareConfig,
        max_sessions: usize,
    ) -> Result<Self> {
        let shutdown = CancellationToken::new();

        let actuator =
            ActuatorController::start(peripherals.servo, config.actuator_settings()).await?;

        let sensor = Arc::new(RangeSensor::new(
            peripherals.trigger,
            peripherals.echo,
            config.sensor_settings(),
        ));
        let (feed, _sampler) =
            SensorSampler::spawn(sensor, config.sample_interval(), shutdown.clone());

        Ok(Self::new(actuator, feed, max_sessions, shutdown))
    }

    pub fn new(
        actuator: ActuatorHandle,
        feed: SensorFeed,
        max_sessions: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            actuator,
            feed,
            sessions: Arc::new(SessionLimit::new(max_sessions)),
            shutdown,
        }
    }

    /// Stop accepting work: ends streams, the sampler, the server and the actuator.
    pub async fn shutdown(&self) {
        info!("Shutting down");
        self.shutdown.cancel();
        if let Err(e) = self.actuator.shutdown().await {
            warn!("Actuator shutdown: {}", e);
        }
    }
}

/// Caps the number of concurrent streaming sessions.
#[derive(Debug)]
pub struct SessionLimit {
    active: AtomicUsize,
    max: usize,
}

/// Holds one session slot; released on drop.
#[derive(Debug)]
pub struct SessionSlot {
    limit: Arc<SessionLimit>,
}

impl SessionLimit {
    pub fn new(max: usize) -> Self {
        Self {
            active: AtomicUsize::new(0),
            max,
        }
    }

    pub fn try_acquire(self: &Arc<Self>) -> Option<SessionSlot> {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| {
                (active < self.max).then_some(active + 1)
            })
            .ok()
            .map(|_| SessionSlot {
                limit: Arc::clone(self),
            })
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        self.limit.active.fetch_sub(1, Ordering::AcqRel);
    }
}
