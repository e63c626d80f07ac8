// Fan capability table
//
// Host platforms address fan properties by string key taken from their
// entity descriptions. Keys resolve to a closed set of attributes, each
// with a getter and, for writable ones, a setter. Unknown keys are
// rejected when the key is resolved, not when it is used.

use serde::Serialize;
use serde_json::Value;
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::debug;

use super::Fan;
use super::fan::{FanMode, SPEED_LEVEL_LABELS};
use crate::error::Error;

/// A fan property addressable by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum FanAttribute {
    Mode,
    SpeedLevelPct,
    PowerPct,
    FanOn,
    Connected,
    IsRoomEstimating,
    IsRoomScheduleRunning,
}

/// Current value of a [`FanAttribute`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Number(i64),
    Flag(bool),
    Absent,
}

impl From<Option<bool>> for AttributeValue {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Absent, Self::Flag)
    }
}

impl From<Option<i64>> for AttributeValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Absent, Self::Number)
    }
}

impl From<Option<&str>> for AttributeValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Self::Absent, |s| Self::Text(s.to_owned()))
    }
}

impl FanAttribute {
    /// Resolve a key, rejecting anything outside the table.
    pub fn from_key(key: &str) -> Result<Self, Error> {
        key.parse().map_err(|_| Error::UnknownAttribute { key: key.to_owned() })
    }

    pub fn key(self) -> &'static str {
        self.into()
    }

    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    pub fn is_writable(self) -> bool {
        matches!(self, Self::Mode | Self::SpeedLevelPct | Self::PowerPct)
    }

    /// Valid values for select-style attributes.
    pub fn options(self) -> Option<Vec<&'static str>> {
        match self {
            Self::Mode => Some(FanMode::options()),
            Self::SpeedLevelPct => Some(SPEED_LEVEL_LABELS.to_vec()),
            _ => None,
        }
    }

    pub fn get(self, fan: &Fan<'_>) -> AttributeValue {
        match self {
            Self::Mode => fan.mode().into(),
            Self::SpeedLevelPct => AttributeValue::Text(fan.speed_level_pct().to_owned()),
            Self::PowerPct => fan.power_pct().into(),
            Self::FanOn => fan.fan_on().into(),
            Self::Connected => fan.connected().into(),
            Self::IsRoomEstimating => fan.is_room_estimating().into(),
            Self::IsRoomScheduleRunning => fan.is_room_schedule_running().into(),
        }
    }

    /// Write `value` through the fan's mutator.
    ///
    /// Invalid values follow the mutators: logged and dropped, `Ok(None)`.
    pub async fn set(self, fan: &Fan<'_>, value: &str) -> Result<Option<Value>, Error> {
        match self {
            Self::Mode => fan.set_mode(value).await,
            Self::SpeedLevelPct => fan.set_speed_level_pct(value).await,
            Self::PowerPct => match value.trim().parse::<u8>() {
                Ok(pct) => fan.set_power_pct(pct).await,
                Err(_) => {
                    debug!(fan = ?fan.id(), value, "power percentage is not a number, ignoring");
                    Ok(None)
                }
            },
            _ => Err(Error::ReadOnlyAttribute { key: self.key() }),
        }
    }
}
