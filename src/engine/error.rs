//! Engine-specific error types.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while talking to the query engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// A configured value could not be sent as an HTTP header.
    #[error("invalid value for header {0}")]
    InvalidHeader(&'static str),

    /// The request never produced a response.
    #[error("request to {uri} failed: {source}")]
    Transport {
        /// Target URI.
        uri: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The engine answered with a non-success HTTP status.
    #[error("engine returned HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// A response body could not be decoded.
    #[error("failed to decode engine response: {0}")]
    Decode(#[source] reqwest::Error),

    /// The engine reported a query failure.
    #[error("query failed: {message} ({name}, code {code})")]
    Query {
        /// Engine error name (e.g. `SYNTAX_ERROR`).
        name: String,
        /// Numeric engine error code.
        code: i64,
        /// Human-readable message.
        message: String,
    },

    /// Rows were requested before a statement was executed.
    #[error("no statement has been executed on this cursor")]
    NoStatement,

    /// The cursor was already closed.
    #[error("cursor is closed")]
    CursorClosed,
}

impl EngineError {
    /// Create a query error as reported by the engine.
    pub fn query(name: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self::Query {
            name: name.into(),
            code,
            message: message.into(),
        }
    }

    /// Check if the engine itself rejected the statement, as opposed to a
    /// transport or protocol failure.
    pub fn is_query_failure(&self) -> bool {
        matches!(self, Self::Query { .. })
    }

    /// Check if the coordinator was temporarily unavailable (HTTP 502, 503
    /// or 504), so the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http { status: 502..=504, .. })
    }
}
