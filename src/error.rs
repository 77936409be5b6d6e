//! Error handling for the pi_sentry crate.

/// A specialized `Result` type for pi_sentry operations.
pub type Result<T> = std::result::Result<T, SystemError>;

/// The main error type for actuator, sensor and server operations.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid startup configuration. Fatal: the process must not serve requests.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The command is not allowed in the actuator's current mode
    #[error("{0}")]
    Conflict(String),

    /// The command would drive the actuator past its travel limits
    #[error("{0}")]
    Range(String),

    /// A hardware signal did not arrive in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// GPIO pin acquisition or access failed
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// A peripheral failed while executing a command
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// A background component has stopped and can no longer take commands
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),
}

impl SystemError {
    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new conflict error
    pub fn conflict_error(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a new range error
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::Range(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout_error(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a new GPIO error
    pub fn gpio_error(msg: impl Into<String>) -> Self {
        Self::Gpio(msg.into())
    }

    /// Create a new hardware error
    pub fn hardware_error(msg: impl Into<String>) -> Self {
        Self::Hardware(msg.into())
    }

    /// Create a new unavailable error
    pub fn unavailable_error(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Whether retrying the same operation may succeed without any other change.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
