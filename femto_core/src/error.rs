use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LockError {
    #[error("timeout on {0}")]
    Timeout(String),
    #[error("channel {channel}: {message}")]
    Channel { channel: String, message: String },
    #[error("phase motor did not settle at {target_ns:.6} ns after {tries} polls")]
    ActuatorStuck { target_ns: f64, tries: u32 },
    #[error("insufficient calibration data: {good} good samples")]
    InsufficientData { good: usize },
    #[error("target rejected: {0}")]
    TargetRejected(String),
    #[error("watchdog initialization failed: {0}")]
    WatchdogInit(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

impl LockError {
    /// Transient faults the supervisor recovers from by reinitializing.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LockError::Timeout(_) | LockError::Channel { .. } | LockError::ActuatorStuck { .. }
        )
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing connection factory")]
    MissingFactory,
    #[error("missing locker config")]
    MissingConfig,
    #[error("missing channel map")]
    MissingChannels,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
