use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value, json};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::debug;

use super::{Room, System, get_bool, get_i64, get_str};
use crate::client::{ApiRequest, SmartCocoonClient};
use crate::error::Error;

/// Display name prefix for fans the user never named.
pub const DEFAULT_FAN_NAME: &str = "Smart Cocoon Fan";

/// Speed-level bucket labels; index + 1 is the vendor level (1–12).
pub const SPEED_LEVEL_LABELS: [&str; 12] = [
    "8_pct", "16_pct", "25_pct", "33_pct", "41_pct", "50_pct", "58_pct", "66_pct", "75_pct",
    "83_pct", "91_pct", "100_pct",
];

/// Label for a missing or out-of-range speed level.
pub const SPEED_LEVEL_UNKNOWN: &str = "unknown";

/// Model label for a fan size the vendor hasn't documented.
pub const MODEL_UNKNOWN: &str = "Unknown";

/// Vendor power units per percent.
const POWER_UNITS_PER_PCT: i64 = 100;

/// Operating mode of a fan.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, EnumString, IntoStaticStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum FanMode {
    Auto,
    Eco,
    AlwaysOn,
    AlwaysOff,
}

impl FanMode {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Every mode label, in a stable order.
    pub fn options() -> Vec<&'static str> {
        Self::iter().map(Self::as_str).collect()
    }
}

/// Vendor level (1–12) for a bucket label.
pub fn speed_level_from_label(label: &str) -> Option<u8> {
    SPEED_LEVEL_LABELS
        .iter()
        .position(|l| *l == label)
        .and_then(|i| u8::try_from(i + 1).ok())
}

/// Bucket label for a vendor level (1–12).
pub fn speed_level_label(level: i64) -> Option<&'static str> {
    let index = usize::try_from(level.checked_sub(1)?).ok()?;
    SPEED_LEVEL_LABELS.get(index).copied()
}

/// A single controllable fan.
///
/// Read accessors reflect the fragment as of the last update; mutators
/// issue exactly one `PUT fans/{id}` and never touch the local fragment,
/// so the effect is only visible after the next
/// [`update`](SmartCocoonClient::update).
#[derive(Clone, Copy)]
pub struct Fan<'a> {
    room: Room<'a>,
    data: &'a Map<String, Value>,
}

impl<'a> Fan<'a> {
    pub(crate) fn new(room: Room<'a>, data: &'a Map<String, Value>) -> Self {
        Self { room, data }
    }

    pub fn room(&self) -> Room<'a> {
        self.room
    }

    pub fn system(&self) -> &'a System {
        self.room.system()
    }

    pub fn client(&self) -> &'a SmartCocoonClient {
        self.system().client()
    }

    pub fn fragment(&self) -> &'a Map<String, Value> {
        self.data
    }

    // ── Identity ────────────────────────────────────────────────────

    pub fn id(&self) -> Option<i64> {
        get_i64(self.data, "id")
    }

    /// Vendor device identifier printed on the fan.
    pub fn fan_id(&self) -> Option<&'a str> {
        get_str(self.data, "fan_id")
    }

    /// User-given name, or `"Smart Cocoon Fan (<fan_id>)"`.
    pub fn name(&self) -> String {
        match get_str(self.data, "name") {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => format!("{DEFAULT_FAN_NAME} ({})", self.fan_id().unwrap_or_default()),
        }
    }

    /// `"<fan_id> (<room name>)"`.
    pub fn fan_id_location(&self) -> String {
        format!(
            "{} ({})",
            self.fan_id().unwrap_or_default(),
            self.room.name().unwrap_or_default()
        )
    }

    /// `"<name> (<room name>)"`.
    pub fn name_location(&self) -> String {
        format!("{} ({})", self.name(), self.room.name().unwrap_or_default())
    }

    pub fn size(&self) -> Option<i64> {
        get_i64(self.data, "size")
    }

    /// Marketing model name derived from the duct size.
    pub fn model_name(&self) -> &'static str {
        match self.size() {
            Some(3) => "3\"x10\"",
            Some(4) => "4\"x10\"",
            _ => MODEL_UNKNOWN,
        }
    }

    pub fn firmware_version(&self) -> Option<&'a str> {
        get_str(self.data, "firmware_version")
    }

    pub fn mqtt_username(&self) -> Option<&'a str> {
        get_str(self.data, "mqtt_username")
    }

    pub fn mqtt_password(&self) -> Option<&'a str> {
        get_str(self.data, "mqtt_password")
    }

    pub fn room_id(&self) -> Option<i64> {
        get_i64(self.data, "room_id")
    }

    pub fn thermostat_vendor(&self) -> Option<&'a str> {
        get_str(self.data, "thermostat_vendor")
    }

    // ── State ───────────────────────────────────────────────────────

    pub fn last_connection(&self) -> Option<&'a str> {
        get_str(self.data, "last_connection")
    }

    /// [`last_connection`](Self::last_connection) parsed as RFC 3339.
    pub fn last_connected_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.last_connection()?).ok()
    }

    pub fn connected(&self) -> Option<bool> {
        get_bool(self.data, "connected")
    }

    pub fn fan_on(&self) -> Option<bool> {
        get_bool(self.data, "fan_on")
    }

    /// Raw power in vendor units (0–10000).
    pub fn power(&self) -> Option<i64> {
        get_i64(self.data, "power")
    }

    /// Power in percent (0–100).
    pub fn power_pct(&self) -> Option<i64> {
        self.power().map(|p| p / POWER_UNITS_PER_PCT)
    }

    /// Raw speed level (1–12).
    pub fn speed_level(&self) -> Option<i64> {
        get_i64(self.data, "speed_level")
    }

    /// Speed-level bucket label, or `"unknown"`.
    pub fn speed_level_pct(&self) -> &'static str {
        self.speed_level()
            .and_then(speed_level_label)
            .unwrap_or(SPEED_LEVEL_UNKNOWN)
    }

    pub fn speed_level_pct_options(&self) -> &'static [&'static str] {
        &SPEED_LEVEL_LABELS
    }

    /// Raw mode string as reported by the service.
    pub fn mode(&self) -> Option<&'a str> {
        get_str(self.data, "mode")
    }

    pub fn mode_options(&self) -> Vec<&'static str> {
        FanMode::options()
    }

    /// Predicted room temperature; the service sends either a number or a
    /// numeric string.
    pub fn predicted_room_temperature(&self) -> Option<f64> {
        match self.data.get("predicted_room_temperature")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_room_estimating(&self) -> Option<bool> {
        get_bool(self.data, "is_room_estimating")
    }

    pub fn is_room_schedule_running(&self) -> Option<bool> {
        get_bool(self.data, "is_room_schedule_running")
    }

    // ── Mutators ────────────────────────────────────────────────────

    /// Set power in percent. Values above 100 are dropped without a call.
    pub async fn set_power_pct(&self, pct: u8) -> Result<Option<Value>, Error> {
        if pct > 100 {
            debug!(fan = ?self.id(), pct, "power percentage out of range, ignoring");
            return Ok(None);
        }
        let power = i64::from(pct) * POWER_UNITS_PER_PCT;
        debug!(fan = ?self.id(), pct, power, "setting power");
        self.put(json!({ "power": power })).await
    }

    /// Set the speed by bucket label (`"8_pct"` … `"100_pct"`). Unknown
    /// labels are dropped without a call.
    pub async fn set_speed_level_pct(&self, label: &str) -> Result<Option<Value>, Error> {
        let Some(level) = speed_level_from_label(label) else {
            debug!(fan = ?self.id(), label, "unknown speed level, ignoring");
            return Ok(None);
        };
        debug!(fan = ?self.id(), label, level, "setting speed level");
        self.put(json!({ "speed_level": level })).await
    }

    /// Set the mode by name. Anything but `auto`, `eco`, `always_on` or
    /// `always_off` is dropped without a call.
    pub async fn set_mode(&self, mode: &str) -> Result<Option<Value>, Error> {
        match mode.parse::<FanMode>() {
            Ok(mode) => self.apply_mode(mode).await,
            Err(_) => {
                debug!(fan = ?self.id(), mode, "unknown mode, ignoring");
                Ok(None)
            }
        }
    }

    /// Switch on in `mode` (default `always_on`), optionally at a power
    /// percentage, in a single call.
    pub async fn turn_on(
        &self,
        mode: Option<FanMode>,
        power_pct: Option<u8>,
    ) -> Result<Option<Value>, Error> {
        let mode = mode.unwrap_or(FanMode::AlwaysOn);
        let mut body = json!({ "mode": mode.as_str() });
        if let Some(pct) = power_pct {
            if pct > 100 {
                debug!(fan = ?self.id(), pct, "power percentage out of range, ignoring");
                return Ok(None);
            }
            body["power"] = json!(i64::from(pct) * POWER_UNITS_PER_PCT);
        }
        debug!(fan = ?self.id(), %mode, ?power_pct, "turning on");
        self.put(body).await
    }

    pub async fn turn_off(&self) -> Result<Option<Value>, Error> {
        self.apply_mode(FanMode::AlwaysOff).await
    }

    pub async fn set_auto(&self) -> Result<Option<Value>, Error> {
        self.apply_mode(FanMode::Auto).await
    }

    pub async fn set_eco(&self) -> Result<Option<Value>, Error> {
        self.apply_mode(FanMode::Eco).await
    }

    async fn apply_mode(&self, mode: FanMode) -> Result<Option<Value>, Error> {
        debug!(fan = ?self.id(), %mode, "setting mode");
        self.put(json!({ "mode": mode.as_str() })).await
    }

    async fn put(&self, body: Value) -> Result<Option<Value>, Error> {
        let id = self.id().ok_or(Error::MissingId { resource: "fan" })?;
        self.client()
            .call(ApiRequest::put(format!("fans/{id}")).json(body))
            .await
    }
}

impl std::fmt::Debug for Fan<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fan")
            .field("id", &self.id())
            .field("fan_id", &self.fan_id())
            .field("mode", &self.mode())
            .field("power", &self.power())
            .finish_non_exhaustive()
    }
}
