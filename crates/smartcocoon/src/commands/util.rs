//! Shared helpers for command handlers: profile loading, login, the
//! hierarchy refresh and fan lookup.

use secrecy::SecretString;
use tracing::{debug, info, warn};

use smartcocoon_api::{Fan, LoginOutcome, SmartCocoonClient, System, UpdateOutcome};
use smartcocoon_config::{
    Config, Profile, load_config, profile_to_client_config, resolve_password, save_config,
};
use smartcocoon_core::CoreError;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// A loaded profile and a client built from it.
pub struct Session {
    pub config: Config,
    pub profile_name: String,
    pub profile: Profile,
    pub client: SmartCocoonClient,
}

/// Load the config and pick the active profile.
pub fn load_profile(global: &GlobalOpts) -> Result<(Config, String, Profile), CliError> {
    let config = load_config()?;
    let name = config.active_profile_name(global.profile.as_deref());
    let profile = config
        .profiles
        .get(&name)
        .cloned()
        .ok_or_else(|| CliError::ProfileNotFound {
            available: if config.profiles.is_empty() {
                "(none)".into()
            } else {
                config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
            },
            name: name.clone(),
        })?;
    Ok((config, name, profile))
}

/// Map a login outcome to success or a user-facing error.
pub fn check_login(outcome: LoginOutcome, email: &str) -> Result<(), CliError> {
    match outcome {
        LoginOutcome::Success => Ok(()),
        LoginOutcome::Failed => Err(CliError::AuthFailed {
            email: email.into(),
        }),
        LoginOutcome::TooManyAttempts => Err(CliError::TooManyAttempts {
            email: email.into(),
        }),
    }
}

impl Session {
    /// Build a session for the active profile. Stored tokens are reused;
    /// without them the profile's password is used to log in.
    pub async fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let (config, profile_name, profile) = load_profile(global)?;
        let client = SmartCocoonClient::new(profile_to_client_config(&profile, &config.defaults)?)?;
        let session = Self {
            config,
            profile_name,
            profile,
            client,
        };
        if session.profile.tokens().is_none() {
            session.login().await?;
        }
        Ok(session)
    }

    /// Log in with the resolved password.
    pub async fn login(&self) -> Result<(), CliError> {
        let password: SecretString = resolve_password(&self.profile, &self.profile_name)?;
        let outcome = self.client.login(&self.profile.email, &password).await?;
        info!(email = %self.profile.email, %outcome, "login");
        check_login(outcome, &self.profile.email)
    }

    fn target_systems(&self) -> Option<&[i64]> {
        (!self.profile.systems.is_empty()).then_some(self.profile.systems.as_slice())
    }

    /// Fetch the hierarchy for the profile's systems.
    ///
    /// Stored tokens may have expired while the client holds no password
    /// yet; in that case log in once and try again.
    pub async fn systems(&self) -> Result<Vec<System>, CliError> {
        let targets = self.target_systems();
        let outcome = match self.client.update(targets).await? {
            UpdateOutcome::Failed { ref error, .. } if error.is_invalid_token() => {
                debug!("stored session expired, logging in");
                self.login().await?;
                self.client.update(targets).await?
            }
            other => other,
        };
        match outcome {
            UpdateOutcome::Refreshed(systems) => Ok(systems),
            UpdateOutcome::Failed { error, .. } => Err(CoreError::update_failed(&error).into()),
        }
    }

    /// Store rotated tokens whatever `result` is, then hand it back.
    ///
    /// The service invalidates the previous token on every success, so a
    /// command that fails after talking to it must still write back.
    pub async fn finish<T>(&mut self, result: Result<T, CliError>) -> Result<T, CliError> {
        let persisted = self.persist_tokens().await;
        match result {
            Ok(value) => persisted.map(|()| value),
            Err(err) => {
                if let Err(e) = persisted {
                    warn!(error = %e, "could not store session tokens");
                }
                Err(err)
            }
        }
    }

    /// Write rotated tokens back to the profile so the next run reuses them.
    pub async fn persist_tokens(&mut self) -> Result<(), CliError> {
        let Some(tokens) = self.client.tokens().await else {
            return Ok(());
        };
        if self.profile.tokens().as_ref() == Some(&tokens) {
            return Ok(());
        }
        self.profile.set_tokens(&tokens);
        self.config
            .profiles
            .insert(self.profile_name.clone(), self.profile.clone());
        let path = save_config(&self.config)?;
        debug!(path = %path.display(), "stored session tokens");
        Ok(())
    }
}

/// Find a fan by numeric id or vendor fan id.
pub fn find_fan<'a>(systems: &'a [System], target: &str) -> Result<Fan<'a>, CliError> {
    let numeric = target.parse::<i64>().ok();
    systems
        .iter()
        .flat_map(System::fans)
        .find(|fan| {
            fan.fan_id() == Some(target) || (numeric.is_some() && fan.id() == numeric)
        })
        .ok_or_else(|| CliError::NotFound {
            resource_type: "fan".into(),
            identifier: target.into(),
            list_command: "fans list".into(),
        })
}
