//! CLI error types with miette diagnostics.
//!
//! Maps client, core and config errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use smartcocoon_config::ConfigError;
use smartcocoon_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the SmartCocoon service at {url}: {reason}")]
    #[diagnostic(
        code(smartcocoon::connection_failed),
        help("Check your network connection, or the base_url in your profile.")
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Login failed for {email}")]
    #[diagnostic(
        code(smartcocoon::auth_failed),
        help(
            "Verify your email and password.\n\
             Run: smartcocoon setup"
        )
    )]
    AuthFailed { email: String },

    #[error("Too many failed login attempts for {email}")]
    #[diagnostic(
        code(smartcocoon::too_many_attempts),
        help("The account is temporarily locked. Wait a while before trying again.")
    )]
    TooManyAttempts { email: String },

    #[error("No password available for profile '{profile}'")]
    #[diagnostic(
        code(smartcocoon::no_credentials),
        help(
            "Run: smartcocoon setup\n\
             Or set the SMARTCOCOON_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(smartcocoon::not_found),
        help("Run: smartcocoon {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(smartcocoon::update_failed),
        help("The SmartCocoon service rejected the refresh. Try again later.")
    )]
    UpdateFailed { message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(smartcocoon::api_error))]
    ApiError { status: Option<u16>, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(smartcocoon::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(smartcocoon::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: smartcocoon setup"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(smartcocoon::config))]
    Config(Box<ConfigError>),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(smartcocoon::timeout),
        help("Increase the timeout in your profile or check your connection.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt failed: {0}")]
    #[diagnostic(code(smartcocoon::prompt))]
    Prompt(#[from] dialoguer::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::TooManyAttempts { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. }
            | Self::ProfileNotFound { .. }
            | Self::ApiError {
                status: Some(404), ..
            } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UpdateFailed { .. } => CliError::UpdateFailed {
                message: err.to_string(),
            },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::FanNotFound { identifier } => CliError::NotFound {
                resource_type: "fan".into(),
                identifier,
                list_command: "fans list".into(),
            },
            CoreError::UnknownAttribute { key } => CliError::Validation {
                field: "attribute".into(),
                reason: format!("unknown fan attribute '{key}'"),
            },
            CoreError::ReadOnlyAttribute { key } => CliError::Validation {
                field: key,
                reason: "attribute is read-only".into(),
            },
            CoreError::Api { message, status } => CliError::ApiError { status, message },
            CoreError::Internal(message) => CliError::ApiError {
                status: None,
                message,
            },
        }
    }
}

impl From<smartcocoon_api::Error> for CliError {
    fn from(err: smartcocoon_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            other => CliError::Config(Box::new(other)),
        }
    }
}
