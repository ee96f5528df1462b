//! Wire types for the vendor snapshot endpoint.
//!
//! Every field is optional on the wire; conversion into [`Snapshot`] decides
//! which absences are tolerated.

use crate::{
    entities::{DeviceReading, Snapshot, Weather},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Body of `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    /// `1` on success, anything else on failure
    #[serde(default)]
    pub result: i64,
    /// Optional vendor message explaining a failure
    #[serde(default)]
    pub msg: Option<String>,
}

/// Body of `GET /plants/{id}/snapshot`.
#[derive(Debug, Deserialize)]
pub struct SnapshotResponse {
    /// Plant section, absent when the vendor has no data for the plant
    pub plant: Option<PlantPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct PlantPayload {
    pub total_energy: Option<f64>,
    pub weather: Option<WeatherPayload>,
    #[serde(default)]
    pub devices: Vec<DevicePayload>,
}

#[derive(Debug, Deserialize)]
#[allow(missing_docs)]
pub struct WeatherPayload {
    pub condition: Option<String>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct DevicePayload {
    #[serde(default)]
    pub serial: String,
    pub power: Option<f64>,
    pub temperature: Option<f64>,
    pub last_update_time: Option<DateTime<Utc>>,
    pub energy_today: Option<f64>,
}

impl From<DevicePayload> for DeviceReading {
    fn from(device: DevicePayload) -> Self {
        Self {
            serial: device.serial,
            power_w: device.power,
            temperature_c: device.temperature,
            last_update: device.last_update_time,
            energy_today_kwh: device.energy_today,
        }
    }
}

impl WeatherPayload {
    fn into_weather(self) -> Option<Weather> {
        Some(Weather {
            condition: self.condition?,
            temperature_c: self.temperature?,
        })
    }
}

impl TryFrom<SnapshotResponse> for Snapshot {
    type Error = Error;

    fn try_from(response: SnapshotResponse) -> Result<Self> {
        let plant = response.plant.ok_or_else(|| Error::missing("plant"))?;
        Ok(Self {
            devices: plant.devices.into_iter().map(DeviceReading::from).collect(),
            lifetime_energy_kwh: plant.total_energy,
            weather: plant.weather.and_then(WeatherPayload::into_weather),
        })
    }
}
