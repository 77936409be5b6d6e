use pi_sentry::{
    actuator::{next_angle, ActuatorSettings, MAX_ANGLE, MIN_ANGLE, NEUTRAL_ANGLE},
    error::SystemError,
    hardware::sim::{self, SimServo},
    sensor::{distance_cm, ReadingStatus},
    ActuatorController, Direction, HardwareConfig, RangeSensor, SensorReading, SensorSettings,
    WebConfig,
};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn actuator_settings(step_degrees: u32) -> ActuatorSettings {
    ActuatorSettings {
        step_degrees,
        move_speed: 600.0,
        loiter_speed: 360.0,
    }
}

/// Angle after N right steps is min(180, 90 + N * step) for any step size
#[test]
fn test_rotate_right_sequence_property() {
    for step in [1u32, 7, 15, 20, 45, 90, 180] {
        let mut angle = NEUTRAL_ANGLE;
        let mut n = 0u32;
        loop {
            match next_angle(angle, step, Direction::Right) {
                Ok(next) => {
                    n += 1;
                    angle = next;
                    assert_eq!(angle, (NEUTRAL_ANGLE + f64::from(n * step)).min(MAX_ANGLE));
                }
                Err(SystemError::Range(_)) => break,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(angle, MAX_ANGLE, "step {}", step);
    }
}

/// Symmetric floor at 0 for left steps
#[test]
fn test_rotate_left_sequence_property() {
    for step in [1u32, 15, 20, 90] {
        let mut angle = NEUTRAL_ANGLE;
        let mut n = 0u32;
        while let Ok(next) = next_angle(angle, step, Direction::Left) {
            n += 1;
            angle = next;
            assert_eq!(angle, (NEUTRAL_ANGLE - f64::from(n * step)).max(MIN_ANGLE));
        }
        assert_eq!(angle, MIN_ANGLE, "step {}", step);
    }
}

/// The 15 degree scenario: six successful steps to 180, the seventh fails
#[tokio::test]
async fn test_fifteen_degree_scenario() {
    let (servo, probe) = SimServo::new(Duration::from_millis(1));
    let handle = ActuatorController::start(Box::new(servo), actuator_settings(15))
        .await
        .expect("Should start actuator");

    let mut angles = Vec::new();
    for _ in 0..6 {
        angles.push(assert_ok!(handle.rotate_right().await).degree);
    }
    assert_eq!(angles, vec![105.0, 120.0, 135.0, 150.0, 165.0, 180.0]);

    let err = assert_err!(handle.rotate_right().await);
    assert_eq!(err.to_string(), "max angle reached");
    assert_eq!(handle.status().await.unwrap().degree, 180.0);
    assert_eq!(probe.moves().len(), 7); // centering + six steps
}

/// Loiter on, then off, returns to the pre-loiter angle and mode
#[tokio::test]
async fn test_loiter_round_trip() {
    let (servo, probe) = SimServo::new(Duration::from_millis(1));
    let handle = ActuatorController::start(Box::new(servo), actuator_settings(30))
        .await
        .unwrap();
    handle.rotate_left().await.unwrap();
    let before = handle.status().await.unwrap();

    assert!(handle.toggle_loiter().await.unwrap().loitering);
    assert!(matches!(
        handle.rotate_left().await.unwrap_err(),
        SystemError::Conflict(_)
    ));
    assert!(!handle.toggle_loiter().await.unwrap().loitering);

    let after = handle.status().await.unwrap();
    assert_eq!(before, after);
    assert_eq!(probe.last_move(), Some(60.0));
}

/// A synthetic echo of known duration converts to D * speed / 2
#[test]
fn test_measure_synthetic_echo() {
    let echo = Duration::from_millis(4);
    let (trigger, echo_pin, _target) = sim::ultrasonic(Some(echo));
    let sensor = RangeSensor::new(Box::new(trigger), Box::new(echo_pin), SensorSettings::default());

    let distance = sensor.measure_distance().expect("Should measure");
    let expected = distance_cm(echo, 34_300.0);
    assert!(
        (distance - expected).abs() < expected * 0.05,
        "expected ~{:.1}, got {:.1}",
        expected,
        distance
    );
}

/// A stuck echo line is reported as a timeout instead of hanging
#[test]
fn test_stuck_echo_is_timeout() {
    let (trigger, echo_pin, _target) = sim::ultrasonic(None);
    let settings = SensorSettings {
        echo_timeout: Duration::from_millis(10),
        ..SensorSettings::default()
    };
    let sensor = RangeSensor::new(Box::new(trigger), Box::new(echo_pin), settings);

    assert!(matches!(
        sensor.measure_distance(),
        Err(SystemError::Timeout(_))
    ));
}

/// Reading payloads match the wire format
#[test]
fn test_reading_json_schema() {
    let json = serde_json::to_string(&SensorReading::success(33.3)).expect("Should serialize");
    let value: serde_json::Value = serde_json::from_str(&json).expect("Should parse JSON");
    assert!(value.get("distance").is_some());
    assert_eq!(value["status"], "Success");

    let parsed: SensorReading =
        serde_json::from_str(r#"{"distance":0.0,"status":"Error measuring distance"}"#).unwrap();
    assert_eq!(parsed.status, ReadingStatus::Error);
}

/// Test HardwareConfig validation failures are configuration errors
#[test]
fn test_hardware_config_validation() {
    assert!(HardwareConfig::default().validate().is_ok());

    for config in [
        HardwareConfig::default().with_pins(18, 30, 24),
        HardwareConfig::default().with_pins(18, 24, 24),
        HardwareConfig::default().with_step_degrees(0),
    ] {
        assert!(matches!(config.validate(), Err(SystemError::Config(_))));
    }
}

/// Test WebConfig builder pattern
#[test]
fn test_web_config() {
    let config = WebConfig::default()
        .with_host("127.0.0.1")
        .with_port(9090)
        .with_cors(false)
        .with_cors_origin(Some("http://localhost:3001".to_string()))
        .with_max_websocket_connections(50);

    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 9090);
    assert!(!config.enable_cors);
    assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:3001"));
    assert_eq!(config.max_websocket_connections, 50);
    assert_eq!(config.bind_address(), "127.0.0.1:9090");
}
