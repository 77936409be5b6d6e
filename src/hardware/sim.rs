//! Simulated peripherals for development machines and tests.

use super::{EchoPin, Servo, TriggerPin};
use crate::error::{Result, SystemError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// Per-move delay of the simulated servo used by `--simulate`.
pub const DEFAULT_SIM_MOVE_DELAY: Duration = Duration::from_millis(250);

/// Distance the simulated ranger reports when nothing else is configured.
pub const DEFAULT_SIM_DISTANCE_CM: f64 = 100.0;

/// Delay between the trigger falling edge and the echo rising edge.
pub const SIM_ECHO_LATENCY: Duration = Duration::from_micros(200);

/// Round-trip echo duration for a target `distance_cm` away.
pub fn echo_for_distance(distance_cm: f64, speed_of_sound: f64) -> Duration {
    Duration::from_secs_f64(2.0 * distance_cm / speed_of_sound)
}

#[derive(Debug, Default)]
struct ServoRecord {
    moves: Vec<f64>,
}

/// Servo that records every completed move and sleeps a fixed delay per move.
pub struct SimServo {
    move_delay: Duration,
    record: Arc<Mutex<ServoRecord>>,
    faulted: Arc<AtomicBool>,
}

/// Test-side view of a [`SimServo`].
#[derive(Clone)]
pub struct SimServoProbe {
    record: Arc<Mutex<ServoRecord>>,
    faulted: Arc<AtomicBool>,
}

impl SimServo {
    pub fn new(move_delay: Duration) -> (Self, SimServoProbe) {
        let record = Arc::new(Mutex::new(ServoRecord::default()));
        let faulted = Arc::new(AtomicBool::new(false));
        let probe = SimServoProbe {
            record: Arc::clone(&record),
            faulted: Arc::clone(&faulted),
        };
        (
            Self {
                move_delay,
                record,
                faulted,
            },
            probe,
        )
    }
}

impl Servo for SimServo {
    fn move_to(&mut self, angle: f64, _speed: f64) -> Result<()> {
        if self.faulted.load(Ordering::SeqCst) {
            return Err(SystemError::hardware_error("simulated servo fault"));
        }
        thread::sleep(self.move_delay);
        lock(&self.record).moves.push(angle);
        Ok(())
    }
}

impl SimServoProbe {
    /// Every completed move, oldest first.
    pub fn moves(&self) -> Vec<f64> {
        lock(&self.record).moves.clone()
    }

    pub fn last_move(&self) -> Option<f64> {
        lock(&self.record).moves.last().copied()
    }

    /// Make subsequent moves fail.
    pub fn set_faulted(&self, faulted: bool) {
        self.faulted.store(faulted, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct EchoState {
    trigger_high: bool,
    fired_at: Option<Instant>,
    echo: Option<Duration>,
    pulses: u64,
}

/// Trigger half of a simulated ranger. A high-to-low edge fires a ranging cycle.
pub struct SimTrigger {
    state: Arc<Mutex<EchoState>>,
}

/// Echo half of a simulated ranger.
pub struct SimEcho {
    state: Arc<Mutex<EchoState>>,
}

/// Controls what the simulated ranger "sees".
#[derive(Clone)]
pub struct SimTarget {
    state: Arc<Mutex<EchoState>>,
}

/// Build a connected trigger/echo pair. `echo` is the duration the echo line
/// stays high after each ranging cycle; `None` means the echo never arrives.
pub fn ultrasonic(echo: Option<Duration>) -> (SimTrigger, SimEcho, SimTarget) {
    let state = Arc::new(Mutex::new(EchoState {
        trigger_high: false,
        fired_at: None,
        echo,
        pulses: 0,
    }));
    (
        SimTrigger {
            state: Arc::clone(&state),
        },
        SimEcho {
            state: Arc::clone(&state),
        },
        SimTarget { state },
    )
}

impl TriggerPin for SimTrigger {
    fn set_high(&mut self) {
        lock(&self.state).trigger_high = true;
    }

    fn set_low(&mut self) {
        let mut state = lock(&self.state);
        if state.trigger_high {
            state.fired_at = Some(Instant::now());
            state.pulses += 1;
        }
        state.trigger_high = false;
    }
}

impl EchoPin for SimEcho {
    fn is_high(&self) -> bool {
        let state = lock(&self.state);
        match (state.fired_at, state.echo) {
            (Some(fired_at), Some(echo)) => {
                let since = fired_at.elapsed();
                since >= SIM_ECHO_LATENCY && since < SIM_ECHO_LATENCY + echo
            }
            _ => false,
        }
    }
}

impl SimTarget {
    pub fn set_echo(&self, echo: Option<Duration>) {
        lock(&self.state).echo = echo;
    }

    /// Number of ranging pulses emitted so far.
    pub fn pulses(&self) -> u64 {
        lock(&self.state).pulses
    }
}

// Simulation state is plain data, so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
