use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

/// Response/request header carrying the access token.
pub const ACCESS_TOKEN_HEADER: &str = "access-token";
/// Response/request header carrying the token's client id.
pub const CLIENT_HEADER: &str = "client";
/// Response/request header carrying the account uid.
pub const UID_HEADER: &str = "uid";

/// Email/password pair retained after a successful login.
///
/// Held only in memory, used exclusively for silent re-authentication.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

/// The `(access-token, client, uid)` triple sent on every request.
///
/// The service rotates all three on each successful authenticated
/// response; they are only ever stored and replaced together.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: SecretString,
    pub client: String,
    pub uid: String,
}

impl TokenSet {
    pub fn new(access_token: impl Into<String>, client: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            client: client.into(),
            uid: uid.into(),
        }
    }

    /// Read the triple from response headers. `None` unless all three
    /// are present and valid UTF-8.
    pub(crate) fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        Some(Self::new(
            get(ACCESS_TOKEN_HEADER)?,
            get(CLIENT_HEADER)?,
            get(UID_HEADER)?,
        ))
    }

    /// Insert the triple into outgoing request headers.
    pub(crate) fn apply(&self, headers: &mut HeaderMap) {
        let pairs = [
            (ACCESS_TOKEN_HEADER, self.access_token.expose_secret()),
            (CLIENT_HEADER, self.client.as_str()),
            (UID_HEADER, self.uid.as_str()),
        ];
        for (name, value) in pairs {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.insert(name, value);
                }
                Err(_) => warn!(header = name, "token value is not a valid header, skipping"),
            }
        }
    }
}

impl PartialEq for TokenSet {
    fn eq(&self, other: &Self) -> bool {
        self.access_token.expose_secret() == other.access_token.expose_secret()
            && self.client == other.client
            && self.uid == other.uid
    }
}

impl Eq for TokenSet {}

/// Outcome of [`SmartCocoonClient::login`](crate::SmartCocoonClient::login).
///
/// The two classified failures are outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum LoginOutcome {
    Success,
    Failed,
    TooManyAttempts,
}

impl LoginOutcome {
    /// Classify a structured sign-in failure.
    ///
    /// `401 "Login Failed"` and anything unrecognised map to
    /// [`Failed`](Self::Failed); only `403 "Too many failed attempts"`
    /// maps to [`TooManyAttempts`](Self::TooManyAttempts).
    pub fn classify(status_code: u16, message: &str) -> Self {
        match (status_code, message) {
            (403, "Too many failed attempts") => Self::TooManyAttempts,
            _ => Self::Failed,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Mutable session state owned by the client.
///
/// Only reachable through the client's session lock, and threaded by
/// `&mut` through a call so a retry can never interleave with another
/// call's token rotation.
#[derive(Debug, Default)]
pub(crate) struct Session {
    pub(crate) tokens: Option<TokenSet>,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) user_id: Option<i64>,
}

impl Session {
    /// Replace the token triple from a success response.
    ///
    /// A response without the full triple leaves the stored one untouched.
    pub(crate) fn rotate_tokens(&mut self, headers: &HeaderMap) {
        match TokenSet::from_headers(headers) {
            Some(tokens) => {
                debug!(uid = %tokens.uid, "rotating token set");
                self.tokens = Some(tokens);
            }
            None => debug!("response carried no complete token set"),
        }
    }

    pub(crate) fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(ref tokens) = self.tokens {
            tokens.apply(&mut headers);
        }
        headers
    }
}
