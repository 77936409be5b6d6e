//! pi_sentry binary
//!
//! Serves the servo and range sensor over HTTP/WebSocket.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pi_sentry::{
    start_web_server, AppState, HardwareConfig, Peripherals, RangeSensor, SensorReading, WebConfig,
    DEFAULT_WEB_PORT,
};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Env files checked at startup, first match wins.
const ENV_FILES: [&str; 2] = ["config/.env", ".env"];

#[derive(Parser)]
#[command(name = "pi_sentry")]
#[command(about = "Servo turret and ultrasonic range sensor over HTTP")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Controls a servo and streams ultrasonic distance readings from a Raspberry Pi")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, env = "HOST", default_value = "0.0.0.0", global = true)]
    host: String,

    /// Web server port
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_WEB_PORT, global = true)]
    port: u16,

    #[command(flatten)]
    hardware: HardwareArgs,

    #[command(flatten)]
    serve: ServeArgs,

    /// Use simulated peripherals instead of GPIO
    #[arg(long, global = true)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Args)]
struct HardwareArgs {
    /// GPIO pin driving the servo
    #[arg(long, env = "MOTOR_PIN", global = true)]
    motor_pin: Option<u8>,

    /// GPIO pin wired to the sensor trigger
    #[arg(long, env = "TRIGGER_PIN", global = true)]
    trigger_pin: Option<u8>,

    /// GPIO pin wired to the sensor echo
    #[arg(long, env = "ECHO_PIN", global = true)]
    echo_pin: Option<u8>,

    /// Degrees per rotate command
    #[arg(long, env = "ROTATE_DEGREE", global = true)]
    rotate_degree: Option<u32>,

    /// Servo speed for rotate commands (degrees per second)
    #[arg(long, env = "SERVO_SPEED", global = true)]
    servo_speed: Option<f64>,

    /// Servo speed while loitering (degrees per second)
    #[arg(long, env = "LOITER_SPEED", global = true)]
    loiter_speed: Option<f64>,

    /// Speed of sound (centimetres per second)
    #[arg(long, env = "SPEED_OF_SOUND", global = true)]
    speed_of_sound: Option<f64>,

    /// Trigger pulse width in microseconds
    #[arg(long, env = "PULSE_WIDTH_US", global = true)]
    pulse_width_us: Option<u64>,

    /// Echo wait timeout in milliseconds
    #[arg(long, env = "ECHO_TIMEOUT_MS", global = true)]
    echo_timeout_ms: Option<u64>,

    /// Measurement attempts per reading
    #[arg(long, env = "MEASURE_ATTEMPTS", global = true)]
    measure_attempts: Option<u32>,

    /// Interval between streamed readings in milliseconds
    #[arg(long, env = "SAMPLE_INTERVAL_MS", global = true)]
    sample_interval_ms: Option<u64>,
}

impl HardwareArgs {
    fn to_config(&self) -> HardwareConfig {
        let defaults = HardwareConfig::default();
        HardwareConfig {
            motor_pin: self.motor_pin.unwrap_or(defaults.motor_pin),
            trigger_pin: self.trigger_pin.unwrap_or(defaults.trigger_pin),
            echo_pin: self.echo_pin.unwrap_or(defaults.echo_pin),
            step_degrees: self.rotate_degree.unwrap_or(defaults.step_degrees),
            servo_speed: self.servo_speed.unwrap_or(defaults.servo_speed),
            loiter_speed: self.loiter_speed.unwrap_or(defaults.loiter_speed),
            speed_of_sound: self.speed_of_sound.unwrap_or(defaults.speed_of_sound),
            pulse_width_us: self.pulse_width_us.unwrap_or(defaults.pulse_width_us),
            echo_timeout_ms: self.echo_timeout_ms.unwrap_or(defaults.echo_timeout_ms),
            measure_attempts: self.measure_attempts.unwrap_or(defaults.measure_attempts),
            sample_interval_ms: self.sample_interval_ms.unwrap_or(defaults.sample_interval_ms),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    Serve,

    /// Take a single distance reading and exit
    Measure,

    /// Print the validated configuration as JSON
    Config,
}

/// Web server options, shared by `serve` and the default invocation.
#[derive(Args)]
struct ServeArgs {
    /// Disable CORS headers
    #[arg(long, global = true)]
    no_cors: bool,

    /// Only allow this origin (with credentials) instead of any origin
    #[arg(long, env = "CORS_ORIGIN", global = true)]
    cors_origin: Option<String>,

    /// Maximum concurrent sensor streams
    #[arg(long, default_value_t = 100, global = true)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = load_env_file();
    let cli = Cli::parse();

    init_logging(&cli)?;

    if let Some(path) = env_file {
        info!("Loaded environment from {}", path.display());
    }

    // Invalid configuration is fatal before any pin is touched.
    let hardware = cli.hardware.to_config();
    hardware
        .validate()
        .context("Invalid hardware configuration")?;

    match &cli.command {
        Some(Commands::Serve) | None => serve_command(&cli, &hardware).await?,
        Some(Commands::Measure) => measure_command(&cli, &hardware).await?,
        Some(Commands::Config) => config_command(&hardware)?,
    }

    Ok(())
}

fn load_env_file() -> Option<PathBuf> {
    ENV_FILES
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .and_then(|path| dotenv::from_path(path).ok().map(|_| path.to_path_buf()))
}

fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// Filter used when `RUST_LOG` is unset or invalid.
fn default_filter(cli: &Cli) -> EnvFilter {
    EnvFilter::new(log_level(cli).as_str().to_ascii_lowercase())
}

fn log_subscriber(filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync + 'static {
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish()
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(cli));
    tracing::subscriber::set_global_default(log_subscriber(filter))?;

    Ok(())
}

fn open_peripherals(cli: &Cli, hardware: &HardwareConfig) -> anyhow::Result<Peripherals> {
    if cli.simulate {
        return Ok(Peripherals::simulated(hardware));
    }
    Peripherals::open(hardware).context("Failed to open GPIO peripherals")
}

async fn serve_command(cli: &Cli, hardware: &HardwareConfig) -> anyhow::Result<()> {
    info!("Starting pi_sentry...");

    let args = &cli.serve;
    let web_config = WebConfig::new(&cli.host, cli.port)
        .with_cors(!args.no_cors)
        .with_cors_origin(args.cors_origin.clone())
        .with_max_websocket_connections(args.max_connections);

    info!("Hardware configuration:");
    info!("  - Motor pin: {}", hardware.motor_pin);
    info!("  - Trigger pin: {}, echo pin: {}", hardware.trigger_pin, hardware.echo_pin);
    info!("  - Rotation step: {}°", hardware.step_degrees);
    info!("  - Sample interval: {}ms", hardware.sample_interval_ms);

    let peripherals = open_peripherals(cli, hardware)?;
    let state = AppState::start(peripherals, hardware, web_config.max_websocket_connections).await?;

    let signal_state = state.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_state.shutdown().await;
        }
    });

    info!("Web server configuration:");
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - CORS enabled: {}", web_config.enable_cors);
    info!("  - Max WebSocket connections: {}", web_config.max_websocket_connections);

    start_web_server(web_config, state).await?;

    Ok(())
}

async fn measure_command(cli: &Cli, hardware: &HardwareConfig) -> anyhow::Result<()> {
    let peripherals = open_peripherals(cli, hardware)?;
    let sensor = RangeSensor::new(peripherals.trigger, peripherals.echo, hardware.sensor_settings());

    let measurement = tokio::task::spawn_blocking(move || sensor.measure_with_retry()).await?;
    let reading = SensorReading::from_measurement(&measurement);
    println!("{}", serde_json::to_string_pretty(&reading)?);

    measurement.context("Measurement failed")?;
    Ok(())
}

fn config_command(hardware: &HardwareConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(hardware)?);
    Ok(())
}
