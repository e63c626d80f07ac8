use thiserror::Error;

/// Top-level error type for the `smartcocoon-api` crate.
///
/// [`Error::Api`] is the structured failure reported by the cloud service
/// (`{"error": {"statusCode", "name", "message"}}`). Everything else is a
/// transport, decoding, or local precondition failure.
#[derive(Debug, Error)]
pub enum Error {
    // ── Remote ──────────────────────────────────────────────────────
    /// Structured error decoded from a non-success response body.
    #[error("SmartCocoon API error (status {status_code}, {name}): {message}")]
    Api {
        status_code: u16,
        name: String,
        message: String,
    },

    /// Non-success response whose body is not the expected error shape.
    #[error("unexpected response (HTTP {status}): {body}")]
    UnexpectedResponse { status: u16, body: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// A success body could not be decoded, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Persistence ─────────────────────────────────────────────────
    /// Writing a response to the persistence directory failed.
    #[error("failed to persist response: {0}")]
    Io(#[from] std::io::Error),

    // ── Local preconditions ─────────────────────────────────────────
    /// The resource fragment carries no `id`, so no request path can be built.
    #[error("{resource} has no id")]
    MissingId { resource: &'static str },

    /// The fan attribute key is not part of the capability table.
    #[error("unknown fan attribute '{key}'")]
    UnknownAttribute { key: String },

    /// The fan attribute exists but cannot be written.
    #[error("fan attribute '{key}' is read-only")]
    ReadOnlyAttribute { key: &'static str },
}

/// Message the service uses for an expired or rotated access token.
pub const INVALID_ACCESS_TOKEN: &str = "Invalid Access Token";

impl Error {
    /// Returns `true` if this is the one error class the client recovers
    /// from by silently logging in again.
    pub fn is_invalid_token(&self) -> bool {
        matches!(
            self,
            Self::Api { status_code: 401, message, .. } if message == INVALID_ACCESS_TOKEN
        )
    }

    /// Returns `true` for the structured remote error.
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    /// `(status_code, name, message)` of a structured remote error.
    pub fn api_parts(&self) -> Option<(u16, &str, &str)> {
        match self {
            Self::Api {
                status_code,
                name,
                message,
            } => Some((*status_code, name.as_str(), message.as_str())),
            _ => None,
        }
    }
}
