//! Errors for boat tracker client
use thiserror::Error;

use crate::models::ApiError;

#[derive(Error, Debug)]
pub enum BoatTrackerError {
    #[error("Serialization error")]
    SerdeError(#[from] serde_json::Error),

    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("IO error")]
    IoError(#[from] std::io::Error),

    #[error("Network error")]
    NetworkError(#[from] reqwest::Error),

    #[error("WebSocket error")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid URL")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP request failed with status {status}")]
    Http { status: u16, errors: Vec<ApiError> },

    #[error("Access token expired")]
    TokenExpired,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("No credentials stored for {0}")]
    MissingCredentials(String),

    #[error("Credentials already stored for {0}")]
    DuplicateCredentials(String),

    #[error("Invalid MMSI")]
    InvalidMmsi(String),
}

impl BoatTrackerError {
    /// Whether the error tells that the access token must be renewed
    pub fn is_token_expired(&self) -> bool {
        match self {
            BoatTrackerError::TokenExpired => true,
            BoatTrackerError::Http { status, errors } => {
                *status == 401 || errors.iter().any(|e| e.key == ApiError::TOKEN_EXPIRED)
            }
            _ => false,
        }
    }
}
