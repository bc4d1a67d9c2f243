use thiserror::Error;

/// Failures the service surfaces to its callers.
///
/// Internals keep using `anyhow` and convert at this boundary.
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("invalid timer configuration: {0}")]
    InvalidConfig(String),

    #[error("no capture device could be opened (tried: {})", .tried.join(", "))]
    DeviceUnavailable { tried: Vec<String> },

    #[error("monitor is still stopping")]
    Busy,

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("{0}")]
    Internal(String),
}

pub type FocusResult<T> = std::result::Result<T, FocusError>;
