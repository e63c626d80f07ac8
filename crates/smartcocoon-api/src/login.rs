// Email/password sign-in
//
// `POST auth/sign_in` returns the account in the body and the first token
// triple in the headers. The credential pair is kept in memory afterwards
// so an expired token can be recovered from without the caller noticing.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::info;

use crate::auth::{Credentials, LoginOutcome, Session};
use crate::client::{ApiRequest, SmartCocoonClient};
use crate::error::Error;

/// Sign-in endpoint.
pub const SIGN_IN_PATH: &str = "auth/sign_in";

impl SmartCocoonClient {
    /// Sign in with email and password.
    ///
    /// `401 "Login Failed"` and `403 "Too many failed attempts"` (and any
    /// other structured rejection) are returned as [`LoginOutcome`]s.
    /// Transport and decoding failures are returned as errors.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<LoginOutcome, Error> {
        let credentials = Credentials {
            email: email.to_owned(),
            password: password.clone(),
        };
        let mut session = self.session_lock().lock().await;
        self.sign_in(&mut session, &credentials).await
    }

    /// Sign in on an already-locked session.
    ///
    /// Never goes through the refresh protocol itself, so a rejected
    /// sign-in can not trigger another sign-in.
    pub(crate) async fn sign_in(
        &self,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<LoginOutcome, Error> {
        let request = ApiRequest::post(SIGN_IN_PATH).json(json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        }));

        let response = self.send(session, &request).await?;
        let body = match self.finish(session, &request, response) {
            Ok(body) => body,
            Err(Error::Api {
                status_code,
                message,
                ..
            }) => {
                let outcome = LoginOutcome::classify(status_code, &message);
                info!(%outcome, status_code, "login rejected");
                return Ok(outcome);
            }
            Err(e) => return Err(e),
        };

        let user_id = body
            .pointer("/data/id")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Deserialization {
                message: "sign-in response has no data.id".into(),
                body: body.to_string(),
            })?;

        session.user_id = Some(user_id);
        session.credentials = Some(credentials.clone());
        info!(user_id, "login successful");
        Ok(LoginOutcome::Success)
    }
}
