//! Actor task owning the servo and the actuator state machine.

use super::{
    next_angle, sweep, ActuatorSettings, ActuatorStatus, Direction, LoiterToggle, Rotation,
    NEUTRAL_ANGLE,
};
use crate::error::{Result, SystemError};
use crate::hardware::Servo;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Commands queued for the actor before callers start getting back-pressure.
const COMMAND_QUEUE_DEPTH: usize = 32;

pub(super) type SharedServo = Arc<Mutex<Box<dyn Servo>>>;

enum Command {
    Rotate {
        direction: Direction,
        reply: oneshot::Sender<Result<Rotation>>,
    },
    ToggleLoiter {
        reply: oneshot::Sender<Result<LoiterToggle>>,
    },
    Status {
        reply: oneshot::Sender<ActuatorStatus>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

enum Mode {
    Idle,
    Loitering {
        cancel: CancellationToken,
        sweep: JoinHandle<()>,
    },
}

/// The single owner of the servo and its state.
pub struct ActuatorController {
    servo: SharedServo,
    settings: ActuatorSettings,
    current_angle: f64,
    mode: Mode,
}

/// Cloneable handle for sending commands to a running [`ActuatorController`].
#[derive(Clone)]
pub struct ActuatorHandle {
    tx: mpsc::Sender<Command>,
}

impl ActuatorController {
    /// Center the servo, then start the actor task.
    ///
    /// Returns only after the servo has reached [`NEUTRAL_ANGLE`], so no
    /// command can observe an unpositioned actuator.
    pub async fn start(servo: Box<dyn Servo>, settings: ActuatorSettings) -> Result<ActuatorHandle> {
        let servo: SharedServo = Arc::new(Mutex::new(servo));
        drive(&servo, NEUTRAL_ANGLE, settings.move_speed).await?;
        info!(
            "Actuator centered at {}° (step {}°, loiter speed {}°/s)",
            NEUTRAL_ANGLE, settings.step_degrees, settings.loiter_speed
        );

        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let controller = Self {
            servo,
            settings,
            current_angle: NEUTRAL_ANGLE,
            mode: Mode::Idle,
        };
        tokio::spawn(controller.run(rx));

        Ok(ActuatorHandle { tx })
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Rotate { direction, reply } => {
                    let result = self.rotate(direction).await;
                    if let Err(e) = &result {
                        debug!("Rotate {} rejected: {}", direction, e);
                    }
                    let _ = reply.send(result);
                }
                Command::ToggleLoiter { reply } => {
                    let _ = reply.send(self.toggle_loiter().await);
                }
                Command::Status { reply } => {
                    let _ = reply.send(self.status());
                }
                Command::Shutdown { reply } => {
                    self.stop_sweep().await;
                    let _ = reply.send(());
                    break;
                }
            }
        }

        self.stop_sweep().await;
        info!("Actuator controller stopped at {}°", self.current_angle);
    }

    async fn rotate(&mut self, direction: Direction) -> Result<Rotation> {
        if matches!(self.mode, Mode::Loitering { .. }) {
            return Err(SystemError::conflict_error("cannot rotate while loitering"));
        }

        let target = next_angle(self.current_angle, self.settings.step_degrees, direction)?;
        drive(&self.servo, target, self.settings.move_speed).await?;
        self.current_angle = target;
        debug!("Rotated {} to {}°", direction, target);

        Ok(Rotation {
            direction,
            degree: target,
            step_degrees: self.settings.step_degrees,
        })
    }

    async fn toggle_loiter(&mut self) -> Result<LoiterToggle> {
        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Idle => {
                let cancel = CancellationToken::new();
                let sweep = sweep::spawn(
                    Arc::clone(&self.servo),
                    cancel.clone(),
                    self.settings.loiter_speed,
                );
                self.mode = Mode::Loitering { cancel, sweep };
                info!("Loiter started");

                Ok(LoiterToggle {
                    loitering: true,
                    degree: self.current_angle,
                })
            }
            Mode::Loitering { cancel, sweep } => {
                join_sweep(cancel, sweep).await;
                drive(&self.servo, self.current_angle, self.settings.move_speed).await?;
                info!("Loiter stopped, returned to {}°", self.current_angle);

                Ok(LoiterToggle {
                    loitering: false,
                    degree: self.current_angle,
                })
            }
        }
    }

    fn status(&self) -> ActuatorStatus {
        ActuatorStatus {
            degree: self.current_angle,
            loitering: matches!(self.mode, Mode::Loitering { .. }),
            step_degrees: self.settings.step_degrees,
        }
    }

    async fn stop_sweep(&mut self) {
        if let Mode::Loitering { cancel, sweep } = std::mem::replace(&mut self.mode, Mode::Idle) {
            join_sweep(cancel, sweep).await;
        }
    }
}

async fn join_sweep(cancel: CancellationToken, sweep: JoinHandle<()>) {
    cancel.cancel();
    if let Err(e) = sweep.await {
        warn!("Loiter sweep task failed: {}", e);
    }
}

/// Run one blocking servo move on the blocking pool and wait for it.
async fn drive(servo: &SharedServo, angle: f64, speed: f64) -> Result<()> {
    let servo = Arc::clone(servo);
    tokio::task::spawn_blocking(move || {
        let mut servo = servo
            .lock()
            .map_err(|_| SystemError::hardware_error("servo lock poisoned"))?;
        servo.move_to(angle, speed)
    })
    .await
    .map_err(|e| SystemError::hardware_error(format!("Servo task failed: {}", e)))?
}

impl ActuatorHandle {
    pub async fn rotate_right(&self) -> Result<Rotation> {
        self.rotate(Direction::Right).await
    }

    pub async fn rotate_left(&self) -> Result<Rotation> {
        self.rotate(Direction::Left).await
    }

    /// Step the servo once in `direction`, blocking until the move completes.
    pub async fn rotate(&self, direction: Direction) -> Result<Rotation> {
        self.request(|reply| Command::Rotate { direction, reply }).await?
    }

    /// Start loitering when idle, stop and return to the last angle when loitering.
    pub async fn toggle_loiter(&self) -> Result<LoiterToggle> {
        self.request(|reply| Command::ToggleLoiter { reply }).await?
    }

    pub async fn status(&self) -> Result<ActuatorStatus> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Stop any sweep and end the actor. Later commands fail with `Unavailable`.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| SystemError::unavailable_error("actuator controller is not running"))?;
        response
            .await
            .map_err(|_| SystemError::unavailable_error("actuator controller is not running"))
    }
}
