//! Background producer broadcasting readings to streaming subscribers.

use super::{RangeSensor, SensorReading};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Readings buffered per subscriber before a slow client starts lagging.
const FEED_CAPACITY: usize = 16;

/// Subscription point for the sampler's readings.
#[derive(Clone)]
pub struct SensorFeed {
    tx: broadcast::Sender<SensorReading>,
}

impl SensorFeed {
    pub fn subscribe(&self) -> broadcast::Receiver<SensorReading> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// The single caller of [`RangeSensor::measure_with_retry`] while serving.
pub struct SensorSampler {
    sensor: Arc<RangeSensor>,
    interval: Duration,
    tx: broadcast::Sender<SensorReading>,
}

impl SensorSampler {
    /// Start sampling every `interval` until `shutdown` fires.
    ///
    /// The sensor is only pulsed while at least one subscriber is listening.
    pub fn spawn(
        sensor: Arc<RangeSensor>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> (SensorFeed, JoinHandle<()>) {
        let (tx, _rx) = broadcast::channel(FEED_CAPACITY);
        let feed = SensorFeed { tx: tx.clone() };
        let sampler = Self {
            sensor,
            interval,
            tx,
        };
        let task = tokio::spawn(sampler.run(shutdown));
        (feed, task)
    }

    async fn run(self, shutdown: CancellationToken) {
        info!("Sensor sampler started ({:?} interval)", self.interval);
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if self.tx.receiver_count() == 0 {
                continue;
            }

            let reading = self.sample().await;
            match self.tx.send(reading) {
                Ok(receivers) => debug!("Reading sent to {} subscribers", receivers),
                Err(_) => debug!("Subscribers left before the reading was sent"),
            }
        }

        info!("Sensor sampler stopped");
    }

    async fn sample(&self) -> SensorReading {
        let sensor = Arc::clone(&self.sensor);
        match tokio::task::spawn_blocking(move || sensor.measure_with_retry()).await {
            Ok(measurement) => {
                if let Err(e) = &measurement {
                    warn!("Distance measurement failed: {}", e);
                }
                SensorReading::from_measurement(&measurement)
            }
            Err(e) => {
                error!("Measurement task failed: {}", e);
                SensorReading::error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim;
    use crate::sensor::{distance_cm, ReadingStatus, SensorSettings};

    fn spawn_sim(
        echo: Option<Duration>,
        interval: Duration,
    ) -> (SensorFeed, JoinHandle<()>, sim::SimTarget, CancellationToken) {
        let (trigger, echo, target) = sim::ultrasonic(echo);
        let settings = SensorSettings {
            echo_timeout: Duration::from_millis(5),
            max_attempts: 1,
            ..SensorSettings::default()
        };
        let sensor = Arc::new(RangeSensor::new(Box::new(trigger), Box::new(echo), settings));
        let shutdown = CancellationToken::new();
        let (feed, task) = SensorSampler::spawn(sensor, interval, shutdown.clone());
        (feed, task, target, shutdown)
    }

    #[tokio::test]
    async fn test_subscribers_receive_readings() {
        let echo = Duration::from_millis(3);
        let (feed, task, _target, shutdown) = spawn_sim(Some(echo), Duration::from_millis(10));
        let mut first = feed.subscribe();
        let mut second = feed.subscribe();
        let expected = distance_cm(echo, 34_300.0);

        for _ in 0..3 {
            let reading = first.recv().await.unwrap();
            assert_eq!(reading.status, ReadingStatus::Success);
            assert!((reading.distance - expected).abs() < expected * 0.1);

            // Both subscribers see the same single measurement.
            assert_eq!(second.recv().await.unwrap(), reading);
        }

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_sampler_does_not_pulse() {
        let (feed, task, target, shutdown) =
            spawn_sim(Some(Duration::from_millis(1)), Duration::from_millis(5));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(target.pulses(), 0);
        assert_eq!(feed.subscriber_count(), 0);

        let mut rx = feed.subscribe();
        rx.recv().await.unwrap();
        assert!(target.pulses() >= 1);

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_timeouts_become_error_readings() {
        let (feed, task, _target, shutdown) = spawn_sim(None, Duration::from_millis(10));
        let mut rx = feed.subscribe();

        let reading = rx.recv().await.unwrap();
        assert_eq!(reading, SensorReading::error());

        shutdown.cancel();
        task.await.unwrap();
    }
}
