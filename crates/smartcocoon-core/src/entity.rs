// ── Host entities ──
//
// A host exposes each configured fan through a few entities: the fan
// itself, select entities for mode and speed bucket, and a binary sensor
// for whether the motor is running. Descriptions name fan attributes by
// key; registration resolves those keys through the capability table so a
// bad key fails up front.

use serde::Serialize;
use strum::{Display, IntoStaticStr};
use tracing::{debug, warn};

use smartcocoon_api::{AttributeValue, Fan, FanAttribute, FanKey, FanMode, System};

use crate::coordinator::{Coordinator, Snapshot};
use crate::error::CoreError;

pub const DOMAIN: &str = "smartcocoon";
pub const CONFIGURATION_URL: &str = "https://mysmartcocoon.com";
pub const DEVICE_MANUFACTURER: &str = "Smart Cocoon";

/// The fan entity reports speed as a percentage in single steps.
pub const FAN_SPEED_COUNT: u8 = 100;
/// Presets offered by the fan entity.
pub const FAN_PRESET_MODES: [FanMode; 2] = [FanMode::Auto, FanMode::Eco];

// ── Descriptions ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Fan,
    Select,
    BinarySensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Config,
    Diagnostic,
}

/// Static description of one entity per fan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescription {
    pub platform: Platform,
    /// Attribute key; `None` for the fan entity itself.
    pub key: Option<&'static str>,
    /// Suffix appended to the device name.
    pub name: Option<&'static str>,
    pub icon: Option<&'static str>,
    pub category: Option<EntityCategory>,
    pub device_class: Option<&'static str>,
}

pub const FAN_DESCRIPTION: EntityDescription = EntityDescription {
    platform: Platform::Fan,
    key: None,
    name: None,
    icon: None,
    category: None,
    device_class: None,
};

pub const SELECT_DESCRIPTIONS: [EntityDescription; 2] = [
    EntityDescription {
        platform: Platform::Select,
        key: Some("mode"),
        name: Some("Fan Mode"),
        icon: Some("mdi:list-box"),
        category: Some(EntityCategory::Config),
        device_class: None,
    },
    EntityDescription {
        platform: Platform::Select,
        key: Some("speed_level_pct"),
        name: Some("Fan Speed"),
        icon: Some("mdi:speedometer"),
        category: Some(EntityCategory::Config),
        device_class: None,
    },
];

pub const BINARY_SENSOR_DESCRIPTIONS: [EntityDescription; 1] = [EntityDescription {
    platform: Platform::BinarySensor,
    key: Some("fan_on"),
    name: Some("Fan Active"),
    icon: None,
    category: Some(EntityCategory::Diagnostic),
    device_class: Some("running"),
}];

/// Every built-in description, fan entity first.
pub fn descriptions() -> Vec<EntityDescription> {
    let mut all = vec![FAN_DESCRIPTION];
    all.extend(SELECT_DESCRIPTIONS);
    all.extend(BINARY_SENSOR_DESCRIPTIONS);
    all
}

// ── Selection ────────────────────────────────────────────────────

/// Systems and fans the user chose to expose.
///
/// An empty system list admits every system, the same way an empty
/// profile list fetches every system. This is looser than a strict
/// membership check; a non-empty list is enforced exactly. Fans must
/// always be listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub systems: Vec<i64>,
    pub fans: Vec<i64>,
}

impl Selection {
    pub fn contains(&self, key: &FanKey) -> bool {
        (self.systems.is_empty() || self.systems.contains(&key.system_id))
            && self.fans.contains(&key.fan_id)
    }
}

// ── Device info ──────────────────────────────────────────────────

/// Device-registry record for a fan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub identifier: (&'static str, i64),
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub hw_version: Option<String>,
    pub sw_version: Option<String>,
    pub suggested_area: Option<String>,
    pub configuration_url: &'static str,
}

impl DeviceInfo {
    pub fn for_fan(fan: &Fan<'_>) -> Option<Self> {
        Some(Self {
            identifier: (DOMAIN, fan.id()?),
            name: fan.name(),
            manufacturer: DEVICE_MANUFACTURER,
            model: fan.model_name(),
            hw_version: fan.fan_id().map(str::to_owned),
            sw_version: fan.firmware_version().map(str::to_owned),
            suggested_area: fan.room().name().map(str::to_owned),
            configuration_url: CONFIGURATION_URL,
        })
    }
}

// ── Entity ───────────────────────────────────────────────────────

/// One registered entity: a description bound to a fan.
///
/// The fan is looked up by key in the coordinator's current snapshot on
/// every access, so entities always see fresh data.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    key: FanKey,
    description: EntityDescription,
    attribute: Option<FanAttribute>,
}

impl Entity {
    pub fn key(&self) -> FanKey {
        self.key
    }

    pub fn description(&self) -> &EntityDescription {
        &self.description
    }

    pub fn platform(&self) -> Platform {
        self.description.platform
    }

    pub fn attribute(&self) -> Option<FanAttribute> {
        self.attribute
    }

    pub fn fan<'a>(&self, snapshot: &'a Snapshot) -> Option<Fan<'a>> {
        snapshot.fan(&self.key)
    }

    fn require_fan<'a>(&self, snapshot: &'a Snapshot) -> Result<Fan<'a>, CoreError> {
        self.fan(snapshot).ok_or_else(|| CoreError::FanNotFound {
            identifier: format!(
                "system {} room {} fan {}",
                self.key.system_id, self.key.room_id, self.key.fan_id
            ),
        })
    }

    // ── Presentation ─────────────────────────────────────────────

    /// `<fan_id>` for the fan entity, `<fan_id>-<key>` otherwise.
    pub fn unique_id(&self, snapshot: &Snapshot) -> Option<String> {
        let fan_id = self.fan(snapshot)?.fan_id()?;
        Some(match self.description.key {
            Some(key) => format!("{fan_id}-{key}"),
            None => fan_id.to_owned(),
        })
    }

    /// Device name, followed by the description name when there is one.
    pub fn name(&self, snapshot: &Snapshot) -> Option<String> {
        let device = self.fan(snapshot)?.name();
        Some(match self.description.name {
            Some(suffix) => format!("{device} {suffix}"),
            None => device,
        })
    }

    pub fn device_info(&self, snapshot: &Snapshot) -> Option<DeviceInfo> {
        DeviceInfo::for_fan(&self.fan(snapshot)?)
    }

    pub fn is_available(&self, snapshot: &Snapshot) -> bool {
        snapshot.is_available(&self.key)
    }

    // ── State ────────────────────────────────────────────────────

    /// Current value: on/off for the fan entity and the binary sensor, the
    /// selected option for selects.
    pub fn state(&self, snapshot: &Snapshot) -> AttributeValue {
        let attribute = self.attribute.unwrap_or(FanAttribute::FanOn);
        self.fan(snapshot)
            .map_or(AttributeValue::Absent, |fan| attribute.get(&fan))
    }

    /// Valid options: presets for the fan entity, attribute options for
    /// selects, nothing for the binary sensor.
    pub fn options(&self) -> Vec<&'static str> {
        match self.description.platform {
            Platform::Fan => FAN_PRESET_MODES.iter().map(|m| m.as_str()).collect(),
            Platform::Select => self
                .attribute
                .and_then(FanAttribute::options)
                .unwrap_or_default(),
            Platform::BinarySensor => Vec::new(),
        }
    }

    /// Speed percentage reported by the fan entity.
    pub fn percentage(&self, snapshot: &Snapshot) -> Option<i64> {
        self.fan(snapshot)?.power_pct()
    }

    pub fn preset_mode(&self, snapshot: &Snapshot) -> Option<String> {
        self.fan(snapshot)?.mode().map(str::to_owned)
    }

    // ── Actions ──────────────────────────────────────────────────
    //
    // Each action writes through the fan and then asks the coordinator
    // for an early refresh; local state is never updated optimistically.

    pub async fn turn_on(
        &self,
        coordinator: &Coordinator,
        percentage: Option<u8>,
    ) -> Result<(), CoreError> {
        let snapshot = coordinator.snapshot();
        self.require_fan(&snapshot)?.turn_on(None, percentage).await?;
        coordinator.request_refresh();
        Ok(())
    }

    pub async fn turn_off(&self, coordinator: &Coordinator) -> Result<(), CoreError> {
        let snapshot = coordinator.snapshot();
        self.require_fan(&snapshot)?.turn_off().await?;
        coordinator.request_refresh();
        Ok(())
    }

    pub async fn set_percentage(
        &self,
        coordinator: &Coordinator,
        percentage: u8,
    ) -> Result<(), CoreError> {
        let snapshot = coordinator.snapshot();
        self.require_fan(&snapshot)?.set_power_pct(percentage).await?;
        coordinator.request_refresh();
        Ok(())
    }

    /// Only `auto` and `eco` are presets; anything else is ignored.
    pub async fn set_preset_mode(
        &self,
        coordinator: &Coordinator,
        preset_mode: &str,
    ) -> Result<(), CoreError> {
        let Some(mode) = FAN_PRESET_MODES.iter().copied().find(|m| m.as_str() == preset_mode)
        else {
            warn!(preset_mode, "invalid preset mode");
            return Ok(());
        };
        let snapshot = coordinator.snapshot();
        self.require_fan(&snapshot)?.set_mode(mode.as_str()).await?;
        coordinator.request_refresh();
        Ok(())
    }

    /// Write a select option through the entity's attribute.
    pub async fn select_option(
        &self,
        coordinator: &Coordinator,
        option: &str,
    ) -> Result<(), CoreError> {
        let Some(attribute) = self.attribute else {
            return Err(CoreError::ReadOnlyAttribute {
                key: self.description.platform.to_string(),
            });
        };
        let snapshot = coordinator.snapshot();
        attribute.set(&self.require_fan(&snapshot)?, option).await?;
        coordinator.request_refresh();
        Ok(())
    }
}

// ── Registration ─────────────────────────────────────────────────

/// Build the entities for every selected fan using the built-in
/// descriptions.
pub fn register(systems: &[System], selection: &Selection) -> Result<Vec<Entity>, CoreError> {
    register_with(systems, selection, &descriptions())
}

/// Build entities for every selected fan from `descriptions`.
///
/// Fails on the first description whose key is not a fan attribute.
pub fn register_with(
    systems: &[System],
    selection: &Selection,
    descriptions: &[EntityDescription],
) -> Result<Vec<Entity>, CoreError> {
    let resolved = descriptions
        .iter()
        .map(|d| {
            d.key
                .map(FanAttribute::from_key)
                .transpose()
                .map(|attribute| (*d, attribute))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut entities = Vec::new();
    for fan in systems.iter().flat_map(System::fans) {
        let Some(key) = FanKey::of(&fan) else {
            continue;
        };
        if !selection.contains(&key) {
            continue;
        }
        for (description, attribute) in &resolved {
            entities.push(Entity {
                key,
                description: *description,
                attribute: *attribute,
            });
        }
    }
    debug!(entities = entities.len(), "registered entities");
    Ok(entities)
}
