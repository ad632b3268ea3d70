//! Home theater device state
//!
//! Three devices with a fixed set of fields each:
//! - light: status (on/off), brightness (0-100)
//! - air_conditioner: mode (cool/heat/off), temperature (°C)
//! - speaker: volume (0-100)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::errors::{BuddyError, Result};
use crate::ontology::store::YamlFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Light,
    AirConditioner,
    Speaker,
}

impl Device {
    pub const ALL: [Device; 3] = [Device::Light, Device::AirConditioner, Device::Speaker];

    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Light => "light",
            Device::AirConditioner => "air_conditioner",
            Device::Speaker => "speaker",
        }
    }

    /// Fields this device exposes
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Device::Light => &["status", "brightness"],
            Device::AirConditioner => &["mode", "temperature"],
            Device::Speaker => &["volume"],
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields().contains(&field)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = BuddyError;

    fn from_str(s: &str) -> Result<Self> {
        Device::ALL
            .into_iter()
            .find(|d| d.as_str() == s.trim())
            .ok_or_else(|| BuddyError::ParseError(format!("unknown device '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Power {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcMode {
    Cool,
    Heat,
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    pub status: Power,
    pub brightness: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirConditionerState {
    pub mode: AcMode,
    pub temperature: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerState {
    pub volume: u8,
}

/// All device states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeTheater {
    pub light: LightState,
    pub air_conditioner: AirConditionerState,
    pub speaker: SpeakerState,
}

impl Default for HomeTheater {
    fn default() -> Self {
        Self {
            light: LightState {
                status: Power::On,
                brightness: 75,
            },
            air_conditioner: AirConditionerState {
                mode: AcMode::Cool,
                temperature: 24,
            },
            speaker: SpeakerState { volume: 65 },
        }
    }
}

impl HomeTheater {
    /// State of one device as JSON
    pub fn device_state(&self, device: Device) -> Result<Value> {
        let value = match device {
            Device::Light => serde_json::to_value(&self.light)?,
            Device::AirConditioner => serde_json::to_value(&self.air_conditioner)?,
            Device::Speaker => serde_json::to_value(&self.speaker)?,
        };
        Ok(value)
    }

    /// Validate and set one field
    pub fn set(&mut self, device: Device, field: &str, value: &Value) -> Result<()> {
        match (device, field) {
            (Device::Light, "status") => self.light.status = parse_enum(field, value)?,
            (Device::Light, "brightness") => self.light.brightness = parse_percent(field, value)?,
            (Device::AirConditioner, "mode") => self.air_conditioner.mode = parse_enum(field, value)?,
            (Device::AirConditioner, "temperature") => {
                let degrees = parse_integer(field, value)?;
                self.air_conditioner.temperature = i32::try_from(degrees).map_err(|_| {
                    BuddyError::ParseError(format!("temperature out of range: {}", degrees))
                })?;
            }
            (Device::Speaker, "volume") => self.speaker.volume = parse_percent(field, value)?,
            _ => {
                return Err(BuddyError::ParseError(format!(
                    "{} has no field '{}'",
                    device, field
                )))
            }
        }
        Ok(())
    }
}

/// Models often send numbers as strings ("26")
fn parse_integer(field: &str, value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| BuddyError::ParseError(format!("{} must be an integer, got {}", field, value)))
}

fn parse_percent(field: &str, value: &Value) -> Result<u8> {
    let n = parse_integer(field, value)?;
    u8::try_from(n)
        .ok()
        .filter(|n| *n <= 100)
        .ok_or_else(|| BuddyError::ParseError(format!("{} must be between 0 and 100, got {}", field, n)))
}

fn parse_enum<T: serde::de::DeserializeOwned>(field: &str, value: &Value) -> Result<T> {
    let text = value
        .as_str()
        .map(|s| s.trim().to_lowercase())
        .ok_or_else(|| BuddyError::ParseError(format!("{} must be a string, got {}", field, value)))?;
    serde_json::from_value(Value::String(text.clone()))
        .map_err(|_| BuddyError::ParseError(format!("invalid {} '{}'", field, text)))
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HomeTheaterFile {
    #[serde(default)]
    home_theater: HomeTheater,
}

/// Per-turn label of the home assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Discussing,
    Updating,
    Querying,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentState::Discussing => write!(f, "DISCUSSING"),
            AgentState::Updating => write!(f, "UPDATING"),
            AgentState::Querying => write!(f, "QUERYING"),
        }
    }
}

/// Home theater YAML file
#[derive(Debug)]
pub struct HomeTheaterStore {
    file: YamlFile,
}

impl HomeTheaterStore {
    /// Open store, writing the default state when the file is missing
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            file: YamlFile::new(path),
        };
        if !store.path().exists() {
            info!(path = %store.path().display(), "creating default home theater state");
            store.file.write(&HomeTheaterFile::default())?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn load(&self) -> Result<HomeTheater> {
        Ok(self.file.read::<HomeTheaterFile>()?.home_theater)
    }

    pub fn device_state(&self, device: Device) -> Result<Value> {
        self.load()?.device_state(device)
    }

    /// Set `device.field`; returns the device state after the change
    pub fn apply(&self, device: Device, field: &str, value: &Value) -> Result<Value> {
        self.file.update(|doc: &mut HomeTheaterFile| {
            doc.home_theater.set(device, field, value)?;
            info!(%device, field, %value, "home theater updated");
            doc.home_theater.device_state(device)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_device_parse_and_fields() {
        assert_eq!("air_conditioner".parse::<Device>().unwrap(), Device::AirConditioner);
        assert!("tv".parse::<Device>().is_err());
        assert!(Device::Light.has_field("brightness"));
        assert!(!Device::Speaker.has_field("mode"));
    }

    #[test]
    fn test_open_creates_defaults() {
        let dir = TempDir::new().unwrap();
        let store = HomeTheaterStore::open(dir.path().join("home_theater.yaml")).unwrap();
        assert!(store.path().exists());

        let state = store.load().unwrap();
        assert_eq!(state, HomeTheater::default());
        assert_eq!(store.device_state(Device::Speaker).unwrap(), json!({"volume": 65}));
    }

    #[test]
    fn test_apply_updates_file() {
        let dir = TempDir::new().unwrap();
        let store = HomeTheaterStore::open(dir.path().join("home_theater.yaml")).unwrap();

        let light = store.apply(Device::Light, "status", &json!("OFF")).unwrap();
        assert_eq!(light["status"], "off");
        store.apply(Device::AirConditioner, "temperature", &json!("26")).unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.light.status, Power::Off);
        assert_eq!(state.air_conditioner.temperature, 26);
    }

    #[test]
    fn test_apply_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let store = HomeTheaterStore::open(dir.path().join("home_theater.yaml")).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        assert!(store.apply(Device::Speaker, "volume", &json!(150)).is_err());
        assert!(store.apply(Device::AirConditioner, "mode", &json!("dry")).is_err());
        assert!(store.apply(Device::Light, "volume", &json!(10)).is_err());
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_agent_state_labels() {
        assert_eq!(AgentState::Querying.to_string(), "QUERYING");
    }
}
