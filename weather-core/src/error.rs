use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced to the user when a weather lookup cannot complete.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing {} in environment.", crate::config::API_KEY_ENV)]
    MissingApiKey,

    /// The upstream API does not know the requested city.
    #[error("{}", .0.as_deref().unwrap_or("City not found."))]
    CityNotFound(Option<String>),

    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimited,

    #[error("Weather API error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response from weather API: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Whether another attempt at the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Api { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
