use thiserror::Error;

/// Everything that can go wrong while talking to the World Bank APIs.
///
/// A call either returns its full result or exactly one of these; there are
/// no partial results and nothing is retried.
#[derive(Debug, Error)]
pub enum WbdError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed with HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("world bank api error: {0}")]
    Api(String),

    #[error("unknown place: {0:?}")]
    UnknownPlace(String),

    #[error("basin id must be between 1 and {max}, got {id}")]
    InvalidBasin { id: String, max: u16 },

    #[error("no data returned for {place}")]
    NoData { place: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl WbdError {
    pub(crate) fn decode(url: &str, message: impl std::fmt::Display) -> Self {
        WbdError::Decode {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WbdError>;
