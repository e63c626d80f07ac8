// Full hierarchy refresh
//
// `GET client_systems`, then `GET rooms` per selected system (rooms embed
// their fans). The new hierarchy is committed only when every request
// succeeded; a structured failure keeps the previous result.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::auth::Session;
use crate::client::{ApiRequest, SmartCocoonClient};
use crate::error::Error;
use crate::model::System;

/// Systems listing endpoint.
pub const SYSTEMS_PATH: &str = "client_systems";
/// Rooms listing endpoint.
pub const ROOMS_PATH: &str = "rooms";
/// Query key restricting rooms to one system.
pub const ROOMS_SYSTEM_FILTER: &str = "filter[thermostat][client_system_id]";

/// Result of [`SmartCocoonClient::update`].
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Every request succeeded; the cache now holds these systems.
    Refreshed(Vec<System>),
    /// The service rejected a request. The cache is unchanged and
    /// `previous` is what it holds.
    Failed { error: Error, previous: Vec<System> },
}

impl UpdateOutcome {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, Self::Refreshed(_))
    }

    /// Systems to show: fresh on success, the previous ones on failure.
    pub fn systems(&self) -> &[System] {
        match self {
            Self::Refreshed(systems) | Self::Failed { previous: systems, .. } => systems,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Refreshed(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    /// Fresh systems, or the error that prevented the refresh.
    pub fn into_result(self) -> Result<Vec<System>, Error> {
        match self {
            Self::Refreshed(systems) => Ok(systems),
            Self::Failed { error, .. } => Err(error),
        }
    }
}

impl SmartCocoonClient {
    /// Fetch every system of the account (or only `target_systems`, when
    /// given) with rooms and fans embedded.
    ///
    /// A structured API error anywhere in the sequence yields
    /// [`UpdateOutcome::Failed`] and leaves the cached systems untouched.
    /// Transport, decoding and persistence failures are returned as errors.
    pub async fn update(&self, target_systems: Option<&[i64]>) -> Result<UpdateOutcome, Error> {
        let mut session = self.session_lock().lock().await;
        match self.fetch_hierarchy(&mut session, target_systems).await {
            Ok(fragments) => {
                debug!(systems = fragments.len(), "update complete");
                self.replace_cache(fragments);
                Ok(UpdateOutcome::Refreshed(self.systems()))
            }
            Err(error) if error.is_api() => {
                warn!(%error, "update failed, keeping previous systems");
                Ok(UpdateOutcome::Failed {
                    error,
                    previous: self.systems(),
                })
            }
            Err(error) => Err(error),
        }
    }

    async fn fetch_hierarchy(
        &self,
        session: &mut Session,
        target_systems: Option<&[i64]>,
    ) -> Result<Vec<Map<String, Value>>, Error> {
        let listing = self
            .call_with(session, &ApiRequest::get(SYSTEMS_PATH))
            .await?
            .unwrap_or_default();

        let mut fragments = Vec::new();
        for system in take_array(listing, "client_systems")? {
            let Value::Object(mut system) = system else {
                continue;
            };
            let id = system.get("id").and_then(Value::as_i64);

            if let Some(targets) = target_systems {
                if !id.is_some_and(|id| targets.contains(&id)) {
                    continue;
                }
            }
            let Some(id) = id else {
                warn!("skipping system without an id");
                continue;
            };

            let request = ApiRequest::get(ROOMS_PATH).query(ROOMS_SYSTEM_FILTER, id.to_string());
            let rooms = self
                .call_with(session, &request)
                .await?
                .unwrap_or_default();
            system.insert("rooms".into(), Value::Array(take_array(rooms, "rooms")?));
            fragments.push(system);
        }
        Ok(fragments)
    }
}

/// Pull `body[key]` out as an array.
fn take_array(body: Value, key: &str) -> Result<Vec<Value>, Error> {
    match body {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(Error::Deserialization {
                message: format!("response has no '{key}' array"),
                body: Value::Object(map).to_string(),
            }),
        },
        other => Err(Error::Deserialization {
            message: format!("expected an object with '{key}'"),
            body: other.to_string(),
        }),
    }
}
