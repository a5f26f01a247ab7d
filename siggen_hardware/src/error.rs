use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("instrument not connected")]
    NotConnected,
    #[error("instrument reply timeout")]
    Timeout,
    #[error("instrument rejected '{0}'")]
    Rejected(String),
    #[error("serial port error: {0}")]
    Serial(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
