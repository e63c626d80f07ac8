use serde_json::{Map, Value};

use super::{Fan, System, get_i64, get_str, objects};

/// A room inside a [`System`], with its fans embedded.
#[derive(Clone, Copy)]
pub struct Room<'a> {
    system: &'a System,
    data: &'a Map<String, Value>,
}

impl<'a> Room<'a> {
    pub(crate) fn new(system: &'a System, data: &'a Map<String, Value>) -> Self {
        Self { system, data }
    }

    pub fn system(&self) -> &'a System {
        self.system
    }

    pub fn fragment(&self) -> &'a Map<String, Value> {
        self.data
    }

    pub fn id(&self) -> Option<i64> {
        get_i64(self.data, "id")
    }

    pub fn name(&self) -> Option<&'a str> {
        get_str(self.data, "name")
    }

    /// Fans, rebuilt from the fragment on every call.
    pub fn fans(&self) -> Vec<Fan<'a>> {
        objects(self.data, "fans")
            .map(|data| Fan::new(*self, data))
            .collect()
    }

    pub fn fan(&self, id: i64) -> Option<Fan<'a>> {
        self.fans().into_iter().find(|f| f.id() == Some(id))
    }
}

impl std::fmt::Debug for Room<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
