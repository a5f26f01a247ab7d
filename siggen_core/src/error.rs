use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("cannot parse '{text}' for field '{field}'")]
    Parse { field: String, text: String },
    #[error("device error: {0}")]
    Device(String),
    #[error("device not connected")]
    Disconnected,
    #[error("timeout waiting for device reply")]
    Timeout,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unknown unit '{unit}' in family '{family}'")]
    UnknownUnit { family: String, unit: String },
    #[error("unknown unit family '{0}'")]
    UnknownFamily(String),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("unknown feature '{0}'")]
    UnknownFeature(String),
    #[error("malformed command template '{template}': {reason}")]
    Template { template: String, reason: String },
    #[error("channel {channel} out of range 1..={max}")]
    InvalidChannel { channel: u8, max: u8 },
}

impl EngineError {
    /// Failure talking to the instrument (recovered locally, never fatal).
    pub fn is_device(&self) -> bool {
        matches!(
            self,
            EngineError::Device(_) | EngineError::Disconnected | EngineError::Timeout
        )
    }

    /// Bad unit names, templates or tables; fatal at startup.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            EngineError::Config(_)
                | EngineError::UnknownUnit { .. }
                | EngineError::UnknownFamily(_)
                | EngineError::Template { .. }
        )
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing device proxy")]
    MissingDevice,
    #[error("missing presentation adapter")]
    MissingPresentation,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
