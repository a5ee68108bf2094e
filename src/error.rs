use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecapError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Transcript too long ({len} characters, limit is {max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("{message}")]
    Provider { status: Option<u16>, message: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecapError {
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider {
                status: Some(status),
                ..
            } => *status == 429 || (500..600).contains(status),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_transient() {
        assert!(RecapError::provider(429, "slow down").is_transient());
        assert!(RecapError::provider(503, "unavailable").is_transient());
    }

    #[test]
    fn test_client_errors_are_terminal() {
        assert!(!RecapError::provider(401, "bad key").is_transient());
        assert!(!RecapError::provider(400, "bad request").is_transient());
        assert!(!RecapError::Cancelled.is_transient());
        assert!(!RecapError::InvalidInput("x".to_string()).is_transient());
    }

    #[test]
    fn test_payload_too_large_message() {
        let err = RecapError::PayloadTooLarge {
            len: 20001,
            max: 20000,
        };
        assert!(err.to_string().contains("20001"));
    }
}
