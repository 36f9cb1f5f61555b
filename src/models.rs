//! Wire-level types for the infinitive API.
//!
//! Notes
//! - Status payloads stay untyped (`StatusSnapshot`) so merging never fails.
//! - `Status` and `VacationStatus` are optional typed views; every field is optional
//!   because the service omits fields it cannot read from the bus.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::InfinitiveClientError;

/// Untyped status mapping as returned by the service, possibly merged from several endpoints.
pub type StatusSnapshot = Map<String, Value>;

/// Prefix applied to every key of the heat pump section in a merged status.
pub const HEATPUMP_PREFIX: &str = "heatpump_";

// =====================
// Enumerated arguments
// =====================

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum TemperatureUnit {
    #[default]
    F,
    C,
}

impl TemperatureUnit {
    pub const ALLOWED: &'static [&'static str] = &["F", "C"];

    pub fn as_str(self) -> &'static str {
        match self {
            TemperatureUnit::F => "F",
            TemperatureUnit::C => "C",
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = InfinitiveClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "F" => Ok(TemperatureUnit::F),
            "C" => Ok(TemperatureUnit::C),
            other => Err(InfinitiveClientError::invalid_argument("temperature_unit", other, Self::ALLOWED)),
        }
    }
}

/// Operating mode of the zone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Auto,
    Heat,
    Cool,
    Off,
}

impl Mode {
    pub const ALLOWED: &'static [&'static str] = &["auto", "heat", "cool", "off"];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Heat => "heat",
            Mode::Cool => "cool",
            Mode::Off => "off",
        }
    }

    /// Setpoint field a temperature change targets in this mode, if any.
    pub fn setpoint_field(self) -> Option<&'static str> {
        match self {
            Mode::Cool => Some("coolSetpoint"),
            Mode::Heat => Some("heatSetpoint"),
            Mode::Auto | Mode::Off => None,
        }
    }
}

impl FromStr for Mode {
    type Err = InfinitiveClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Mode::Auto),
            "heat" => Ok(Mode::Heat),
            "cool" => Ok(Mode::Cool),
            "off" => Ok(Mode::Off),
            other => Err(InfinitiveClientError::invalid_argument("mode", other, Self::ALLOWED)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blower speed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanMode {
    #[default]
    Auto,
    Low,
    Med,
    High,
}

impl FanMode {
    pub const ALLOWED: &'static [&'static str] = &["auto", "low", "med", "high"];

    pub fn as_str(self) -> &'static str {
        match self {
            FanMode::Auto => "auto",
            FanMode::Low => "low",
            FanMode::Med => "med",
            FanMode::High => "high",
        }
    }
}

impl FromStr for FanMode {
    type Err = InfinitiveClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(FanMode::Auto),
            "low" => Ok(FanMode::Low),
            "med" => Ok(FanMode::Med),
            "high" => Ok(FanMode::High),
            other => Err(InfinitiveClientError::invalid_argument("fan_mode", other, Self::ALLOWED)),
        }
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =====================
// Endpoints
// =====================

/// Fixed endpoint URLs of one device. The service only exposes zone 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub base_url: String,
    pub config_url: String,
    pub airhandler_url: String,
    pub heatpump_url: String,
    pub vacation_url: String,
}

impl Endpoints {
    pub fn new(host: &str, port: u16) -> Self {
        let base_url = format!("http://{}:{}", host, port);
        Endpoints {
            config_url: format!("{}/api/zone/1/config", base_url),
            airhandler_url: format!("{}/api/airhandler", base_url),
            heatpump_url: format!("{}/api/heatpump", base_url),
            vacation_url: format!("{}/api/zone/1/vacation", base_url),
            base_url,
        }
    }
}

// =====================
// Typed views
// =====================

/// Merged device status: zone config, air handler and prefixed heat pump fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    // zone config
    pub current_temp: Option<f64>,
    pub current_humidity: Option<f64>,
    pub outdoor_temp: Option<f64>,
    pub mode: Option<Mode>,
    pub stage: Option<u8>,
    pub fan_mode: Option<FanMode>,
    pub hold: Option<bool>,
    pub heat_setpoint: Option<f64>,
    pub cool_setpoint: Option<f64>,
    pub raw_mode: Option<u8>,

    // air handler
    #[serde(rename = "blowerRPM")]
    pub blower_rpm: Option<u32>,
    #[serde(rename = "airFlowCFM")]
    pub air_flow_cfm: Option<u32>,
    pub elec_heat: Option<bool>,

    // heat pump
    #[serde(rename = "heatpump_coilTemp")]
    pub heatpump_coil_temp: Option<f64>,
    #[serde(rename = "heatpump_outsideTemp")]
    pub heatpump_outside_temp: Option<f64>,
    #[serde(rename = "heatpump_stage")]
    pub heatpump_stage: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacationStatus {
    pub active: Option<bool>,
    pub days: Option<u32>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub min_humidity: Option<f64>,
    pub max_humidity: Option<f64>,
    pub fan_mode: Option<String>,
}

/// Decode a snapshot into a typed view, reporting the JSON path of the first mismatch.
pub fn decode_snapshot<T: serde::de::DeserializeOwned>(snapshot: StatusSnapshot) -> Result<T, InfinitiveClientError> {
    serde_path_to_error::deserialize(Value::Object(snapshot)).map_err(InfinitiveClientError::Decode)
}
