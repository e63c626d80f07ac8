// ── Device registry reconciliation ──
//
// When the selection shrinks, devices registered for systems or fans that
// are no longer selected must be dropped. A device is an orphan when none
// of its identifiers belong to the current selection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{DOMAIN, Selection};

/// `(domain, id)` pair a device is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentifier {
    pub domain: String,
    pub id: i64,
}

impl DeviceIdentifier {
    pub fn new(id: i64) -> Self {
        Self {
            domain: DOMAIN.to_owned(),
            id,
        }
    }
}

impl fmt::Display for DeviceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.id)
    }
}

/// A previously registered device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub name: String,
    pub identifiers: Vec<DeviceIdentifier>,
}

/// Identifiers the selection keeps alive: every selected system and fan.
pub fn selected_identifiers(selection: &Selection) -> Vec<DeviceIdentifier> {
    selection
        .systems
        .iter()
        .chain(&selection.fans)
        .map(|&id| DeviceIdentifier::new(id))
        .collect()
}

/// Entries to remove: those with no identifier in the selection.
///
/// An entry without identifiers is always an orphan.
pub fn orphaned_devices<'a>(entries: &'a [DeviceEntry], selection: &Selection) -> Vec<&'a DeviceEntry> {
    let keep = selected_identifiers(selection);
    entries
        .iter()
        .filter(|entry| entry.identifiers.iter().all(|id| !keep.contains(id)))
        .collect()
}
