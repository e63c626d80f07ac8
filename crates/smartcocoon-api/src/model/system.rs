use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::{Fan, Room, get_i64, get_str, objects};
use crate::client::SmartCocoonClient;

/// A customer installation: a location grouping rooms.
///
/// Owns its `client_systems` fragment (with the `rooms` array attached by
/// [`SmartCocoonClient::update`]) and a handle to the client that fans use
/// for writes.
#[derive(Clone)]
pub struct System {
    client: SmartCocoonClient,
    data: Map<String, Value>,
}

impl System {
    pub fn new(client: SmartCocoonClient, data: Map<String, Value>) -> Self {
        Self { client, data }
    }

    pub fn client(&self) -> &SmartCocoonClient {
        &self.client
    }

    /// The backing fragment.
    pub fn fragment(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Mutable access to the backing fragment. Rooms and fans read
    /// through it, so edits show up on the next access.
    pub fn fragment_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.data
    }

    pub fn into_fragment(self) -> Map<String, Value> {
        self.data
    }

    pub fn id(&self) -> Option<i64> {
        get_i64(&self.data, "id")
    }

    pub fn name(&self) -> Option<&str> {
        get_str(&self.data, "name")
    }

    pub fn user_id(&self) -> Option<i64> {
        get_i64(&self.data, "user_id")
    }

    pub fn location(&self) -> Option<&Map<String, Value>> {
        self.data.get("location").and_then(Value::as_object)
    }

    pub fn location_id(&self) -> Option<i64> {
        self.location().and_then(|l| get_i64(l, "id"))
    }

    pub fn location_street(&self) -> Option<&str> {
        self.location().and_then(|l| get_str(l, "street"))
    }

    pub fn location_city(&self) -> Option<&str> {
        self.location().and_then(|l| get_str(l, "city"))
    }

    pub fn location_state(&self) -> Option<&str> {
        self.location().and_then(|l| get_str(l, "state"))
    }

    pub fn location_country(&self) -> Option<&str> {
        self.location().and_then(|l| get_str(l, "country"))
    }

    pub fn location_postal_code(&self) -> Option<&str> {
        self.location().and_then(|l| get_str(l, "postal_code"))
    }

    /// `"Name (City, ST)"`, else `"Name (postal code)"`, else `"Name"`.
    ///
    /// Used as the human-readable choice label when picking systems.
    pub fn name_location(&self) -> String {
        let name = self.name().unwrap_or_default();
        let place = [self.location_city(), self.location_state()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        if !place.is_empty() {
            return format!("{name} ({place})");
        }
        match self.location_postal_code() {
            Some(code) if !code.is_empty() => format!("{name} ({code})"),
            _ => name.to_owned(),
        }
    }

    /// Rooms, rebuilt from the fragment on every call.
    pub fn rooms(&self) -> Vec<Room<'_>> {
        objects(&self.data, "rooms")
            .map(|data| Room::new(self, data))
            .collect()
    }

    pub fn room(&self, id: i64) -> Option<Room<'_>> {
        self.rooms().into_iter().find(|r| r.id() == Some(id))
    }

    /// Every fan in every room, in order.
    pub fn fans(&self) -> Vec<Fan<'_>> {
        self.rooms().into_iter().flat_map(|r| r.fans()).collect()
    }
}

impl PartialEq for System {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("rooms", &self.rooms().len())
            .finish()
    }
}

impl Serialize for System {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}
