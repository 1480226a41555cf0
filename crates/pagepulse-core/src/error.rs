use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Capability not available: {0}")]
    Unsupported(String),

    #[error("Invalid monitor configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport failed: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
