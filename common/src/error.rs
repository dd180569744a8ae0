use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaproError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream timed out")]
    UpstreamTimeout,

    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CaproError {
    /// HTTP status a client sees when a request fails with this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Upstream(_) | Self::UpstreamStatus(_) => 502,
            Self::UpstreamTimeout => 504,
            _ => 500,
        }
    }

    /// Whether the error came from talking to the origin.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::UpstreamTimeout | Self::UpstreamStatus(_))
    }
}

pub type Result<T> = std::result::Result<T, CaproError>;
