//! Background loiter sweep.

use super::controller::SharedServo;
use super::{MAX_ANGLE, MIN_ANGLE};
use crate::error::SystemError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Start sweeping between the travel limits on the blocking pool until `cancel` fires.
pub(super) fn spawn(servo: SharedServo, cancel: CancellationToken, speed: f64) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || run(&servo, &cancel, speed))
}

fn run(servo: &SharedServo, cancel: &CancellationToken, speed: f64) {
    let mut moves = 0u64;

    for target in [MAX_ANGLE, MIN_ANGLE].into_iter().cycle() {
        // Checked between moves only; a move in flight always completes.
        if cancel.is_cancelled() {
            break;
        }

        let result = match servo.lock() {
            Ok(mut servo) => servo.move_to(target, speed),
            Err(_) => Err(SystemError::hardware_error("servo lock poisoned")),
        };
        if let Err(e) = result {
            error!("Loiter sweep aborted: {}", e);
            break;
        }
        moves += 1;
    }

    debug!("Loiter sweep finished after {} moves", moves);
}
