//! Error types for the campus-card spending report.

/// All errors that can occur while fetching, aggregating, or charting
/// campus-card spending.
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    /// The HTTP transport failed (connection, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The report service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The report service served its empty-title login page instead of
    /// data, which means the hallticket is expired or invalid.
    #[error("hallticket rejected by the report service (expired or invalid)")]
    CredentialRejected,

    /// No hallticket was supplied when building a client.
    #[error("no hallticket provided")]
    MissingCredential,

    /// The response body was not a JSON object with a `rows` array.
    #[error("malformed response ({reason}): {body}")]
    MalformedResponse {
        /// What was wrong with the body.
        reason: String,
        /// The raw body as received.
        body: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cache backend failed.
    #[error("cache error: {0}")]
    Cache(Box<dyn core::error::Error + Send + Sync>),

    /// Credential or settings file could not be read, written, or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// A date string is not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid date {value:?}: {source}")]
    InvalidDate {
        /// The rejected input.
        value: String,
        /// Underlying parse failure.
        #[source]
        source: chrono::ParseError,
    },

    /// A date range ends before it starts.
    #[error("invalid date range: {start} is after {end}")]
    InvalidRange {
        /// Range start.
        start: chrono::NaiveDate,
        /// Range end.
        end: chrono::NaiveDate,
    },

    /// There is nothing to draw.
    #[error("no spending data to chart")]
    NoData,

    /// Chart rendering failed.
    #[error("chart error: {0}")]
    Chart(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, CardError>;
