use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pi_sentry::{
    actuator::next_angle,
    hardware::{
        angle_to_pulse_width,
        sim::{self, SimServo},
    },
    sensor::distance_cm,
    ActuatorController, ActuatorSettings, Direction, RangeSensor, SensorReading, SensorSettings,
};
use std::hint::black_box;
use std::time::Duration;

/// Benchmark the echo-to-distance conversion
fn bench_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("distance_cm");
    for micros in [100u64, 1_000, 10_000, 38_000] {
        let echo = Duration::from_micros(micros);
        group.bench_with_input(BenchmarkId::from_parameter(micros), &echo, |b, echo| {
            b.iter(|| distance_cm(black_box(*echo), black_box(34_300.0)))
        });
    }
    group.finish();
}

/// Benchmark reading payload serialization
fn bench_reading_serialization(c: &mut Criterion) {
    let success = SensorReading::success(123.45);
    let failure = SensorReading::error();

    c.bench_function("reading_serialize_success", |b| {
        b.iter(|| serde_json::to_string(black_box(&success)).expect("Should serialize"))
    });

    c.bench_function("reading_serialize_error", |b| {
        b.iter(|| serde_json::to_string(black_box(&failure)).expect("Should serialize"))
    });
}

/// Benchmark angle stepping and pulse mapping
fn bench_angles(c: &mut Criterion) {
    c.bench_function("next_angle_sweep", |b| {
        b.iter(|| {
            let mut angle = 0.0;
            while let Ok(next) = next_angle(angle, black_box(15), Direction::Right) {
                angle = next;
            }
            angle
        })
    });

    c.bench_function("angle_to_pulse_width", |b| {
        b.iter(|| angle_to_pulse_width(black_box(135.0)))
    });
}

/// Benchmark a full trigger/echo measurement against the simulated sensor
fn bench_measurement(c: &mut Criterion) {
    let (trigger, echo, _target) = sim::ultrasonic(Some(Duration::from_micros(500)));
    let sensor = RangeSensor::new(Box::new(trigger), Box::new(echo), SensorSettings::default());

    c.bench_function("measure_distance_sim", |b| {
        b.iter(|| sensor.measure_distance().expect("Should measure"))
    });
}

/// Benchmark a rotate command round trip through the actuator task
fn bench_rotate_round_trip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");
    let handle = rt.block_on(async {
        let (servo, _probe) = SimServo::new(Duration::ZERO);
        ActuatorController::start(
            Box::new(servo),
            ActuatorSettings {
                step_degrees: 1,
                move_speed: 600.0,
                loiter_speed: 360.0,
            },
        )
        .await
        .expect("Should start actuator")
    });

    c.bench_function("rotate_round_trip", |b| {
        b.to_async(&rt).iter(|| async {
            if handle.rotate_right().await.is_err() {
                while handle.rotate_left().await.is_ok() {}
            }
        })
    });
}

criterion_group!(
    benches,
    bench_distance,
    bench_reading_serialization,
    bench_angles,
    bench_measurement,
    bench_rotate_round_trip
);
criterion_main!(benches);
