use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Exchange API error: HTTP {status}: {body}")]
    Exchange { status: u16, body: String },

    #[error("Malformed payload: {0}")]
    Decode(String),

    #[error("Insufficient data for {symbol}: need {needed} records, got {got}")]
    InsufficientData {
        symbol: String,
        needed: usize,
        got: usize,
    },

    #[error("Unsupported venue operation: {0}")]
    UnsupportedVenue(String),

    #[error("Universe fetch failed: {0}")]
    UniverseFetchFailed(String),

    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    #[error("Scan already in progress for '{0}'")]
    ScanInProgress(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the failures that mean "skip this symbol": the provider
    /// timed out, refused, or sent something unusable.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_)
                | Error::Http(_)
                | Error::Exchange { .. }
                | Error::Decode(_)
                | Error::InsufficientData { .. }
        )
    }

    /// Short failure class used in structured log fields.
    pub fn class(&self) -> &'static str {
        match self {
            Error::Timeout(_) => "timeout",
            Error::Http(_) => "transport",
            Error::Exchange { .. } => "status",
            Error::Decode(_) => "decode",
            Error::InsufficientData { .. } => "insufficient_data",
            Error::UnsupportedVenue(_) => "unsupported_venue",
            Error::UniverseFetchFailed(_) => "universe",
            Error::NotifyFailed(_) => "notify",
            Error::ScanInProgress(_) => "in_progress",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
