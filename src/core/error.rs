use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network-related errors
    #[error("Network error: {0}")]
    Network(reqwest::Error),
    /// Response parsing errors (missing fields, invalid format)
    #[error("Failed to parse response: {0}")]
    ResponseFormat(String),
    /// Non-success status returned by one of the services
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Missing, expired or rejected credentials
    #[error("Authentication error: {0}")]
    Authentication(String),
    /// Input rejected locally, before any request is made
    #[error("Invalid input: {0}")]
    Validation(String),
    /// Resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),
    /// Server error
    #[error("Server error: {0}")]
    ServerError(String),
    /// Stream-related errors
    #[error("Stream error: {0}")]
    StreamError(String),
    /// Persisted session errors
    #[error("Session error: {0}")]
    SessionError(String),
    /// I/O error
    #[error("I/O error: {0}")]
    IOError(String),
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Formatting error
    #[error("Formatting error: {0}")]
    FormatError(String),
}

impl ClientError {
    /// Maps a non-success status and the message extracted from its body.
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Authentication(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            500..=599 => Self::ServerError(message),
            code => Self::Api {
                status: code,
                message,
            },
        }
    }

    /// True for errors the user can only fix by logging in again.
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::ResponseFormat(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        // If the error has a status code, map it to a more specific error
        if let Some(status) = err.status() {
            Self::from_status(status, err.to_string())
        } else if err.is_decode() {
            Self::ResponseFormat(err.to_string())
        } else {
            Self::Network(err)
        }
    }
}
