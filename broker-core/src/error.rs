use thiserror::Error;

/// Error taxonomy for the broker core.
///
/// Mirrors the four categories the HTTP adapter needs to map to status
/// codes: missing/invalid client input, an unreachable Device, an absent
/// resource, and everything else (I/O, serialization).
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("invalid input: {0}")]
    ClientInput(String),

    #[error("device unavailable")]
    DeviceUnavailable,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BrokerError>;

impl BrokerError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ClientInput(_) => 400,
            Self::DeviceUnavailable => 503,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
        }
    }
}
