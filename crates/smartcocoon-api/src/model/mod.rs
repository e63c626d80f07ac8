// Resource model
//
// Read-only views over the raw JSON fragments returned by the API:
// System → Room → Fan. Children are derived from the parent fragment on
// every access, so there is no cached copy to drift. All accessors are
// total: a missing or mistyped field reads as `None`.

pub mod attribute;
pub mod fan;
pub mod room;
pub mod system;

pub use attribute::{AttributeValue, FanAttribute};
pub use fan::{Fan, FanMode, SPEED_LEVEL_LABELS, SPEED_LEVEL_UNKNOWN};
pub use room::Room;
pub use system::System;

use serde_json::{Map, Value};

/// Addresses one fan across refreshes: entities keep this, never a [`Fan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FanKey {
    pub system_id: i64,
    pub room_id: i64,
    pub fan_id: i64,
}

impl FanKey {
    /// Key of a fan inside its system and room. `None` if any id is missing.
    pub fn of(fan: &Fan<'_>) -> Option<Self> {
        Some(Self {
            system_id: fan.system().id()?,
            room_id: fan.room().id()?,
            fan_id: fan.id()?,
        })
    }

    /// Resolve the key against a freshly fetched list of systems.
    pub fn find<'a>(&self, systems: &'a [System]) -> Option<Fan<'a>> {
        systems
            .iter()
            .find(|s| s.id() == Some(self.system_id))?
            .room(self.room_id)?
            .fan(self.fan_id)
    }
}

pub(crate) fn get_i64(data: &Map<String, Value>, key: &str) -> Option<i64> {
    data.get(key).and_then(Value::as_i64)
}

pub(crate) fn get_str<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str)
}

pub(crate) fn get_bool(data: &Map<String, Value>, key: &str) -> Option<bool> {
    data.get(key).and_then(Value::as_bool)
}

/// Object elements of an array field; anything else is skipped.
pub(crate) fn objects<'a>(
    data: &'a Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> {
    data.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}
