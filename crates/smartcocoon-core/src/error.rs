// ── Core error types ──
//
// Host-facing errors from smartcocoon-core. The `From<smartcocoon_api::Error>`
// impl translates client failures into the variants a host reports.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Refresh errors ───────────────────────────────────────────────
    #[error(
        "Error communicating with API, Status: {status_code}, Error Name: {name}, Error Message: {message}"
    )]
    UpdateFailed {
        status_code: u16,
        name: String,
        message: String,
    },

    #[error("Update timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Cannot reach the SmartCocoon service at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    // ── Entity errors ────────────────────────────────────────────────
    #[error("Fan not found: {identifier}")]
    FanNotFound { identifier: String },

    #[error("Unknown fan attribute: {key}")]
    UnknownAttribute { key: String },

    #[error("Fan attribute is read-only: {key}")]
    ReadOnlyAttribute { key: String },

    // ── API errors (wrapped) ─────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Build the refresh failure reported when the service rejected a
    /// request during an update.
    pub fn update_failed(err: &smartcocoon_api::Error) -> Self {
        match err.api_parts() {
            Some((status_code, name, message)) => Self::UpdateFailed {
                status_code,
                name: name.to_owned(),
                message: message.to_owned(),
            },
            None => Self::Internal(err.to_string()),
        }
    }
}

// ── Conversion from client errors ────────────────────────────────────

impl From<smartcocoon_api::Error> for CoreError {
    fn from(err: smartcocoon_api::Error) -> Self {
        use smartcocoon_api::Error;

        match err {
            Error::Api {
                status_code,
                message,
                ..
            } => CoreError::Api {
                message,
                status: Some(status_code),
            },
            Error::UnexpectedResponse { status, body } => CoreError::Api {
                message: format!("unexpected response: {body}"),
                status: Some(status),
            },
            Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            Error::UnknownAttribute { key } => CoreError::UnknownAttribute { key },
            Error::ReadOnlyAttribute { key } => CoreError::ReadOnlyAttribute { key: key.into() },
            Error::MissingId { resource } => CoreError::FanNotFound {
                identifier: format!("{resource} without an id"),
            },
            Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            Error::InvalidUrl(e) => CoreError::Internal(format!("Invalid URL: {e}")),
            Error::Io(e) => CoreError::Internal(format!("Saving response failed: {e}")),
        }
    }
}
