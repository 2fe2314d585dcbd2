use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("channel {0} timeout")]
    Timeout(String),
    #[error("channel {0} not connected")]
    Disconnected(String),
    #[error("unknown channel {0}")]
    UnknownChannel(String),
    #[error("connection refused: {0}")]
    Refused(String),
}

pub type Result<T> = std::result::Result<T, HwError>;
