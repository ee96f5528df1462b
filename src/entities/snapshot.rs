//! Snapshot entity - one point-in-time read of plant and device telemetry.
//!
//! Every vendor field is optional here: a record the vendor does not have is
//! represented as `None`, and the accessors decide what absence means.

use chrono::{DateTime, Utc};

/// Telemetry reported by a single inverter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceReading {
    /// Vendor serial number
    pub serial: String,
    /// Instantaneous output power (W)
    pub power_w: Option<f64>,
    /// Inverter temperature (°C)
    pub temperature_c: Option<f64>,
    /// When the device last reported to the vendor cloud
    pub last_update: Option<DateTime<Utc>>,
    /// Energy produced on the queried date (kWh)
    pub energy_today_kwh: Option<f64>,
}

/// Current weather at the plant, as reported by the vendor.
#[derive(Clone, Debug, PartialEq)]
pub struct Weather {
    /// Free-text condition (e.g. "sunny")
    pub condition: String,
    /// Ambient temperature (°C)
    pub temperature_c: f64,
}

/// Plant telemetry for one date.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// Per-device readings, empty if the vendor returned no device data
    pub devices: Vec<DeviceReading>,
    /// Energy produced since commissioning (kWh)
    pub lifetime_energy_kwh: Option<f64>,
    /// Weather at the plant
    pub weather: Option<Weather>,
}

impl Snapshot {
    /// Total instantaneous output power, `None` when no device reports it.
    #[must_use]
    pub fn total_power_w(&self) -> Option<f64> {
        self.devices
            .iter()
            .filter_map(|d| d.power_w)
            .reduce(|a, b| a + b)
    }

    /// Temperature of the hottest device.
    #[must_use]
    pub fn max_temperature_c(&self) -> Option<f64> {
        self.devices
            .iter()
            .filter_map(|d| d.temperature_c)
            .reduce(f64::max)
    }

    /// Last-update timestamp of the stalest device.
    #[must_use]
    pub fn stalest_update(&self) -> Option<DateTime<Utc>> {
        self.devices.iter().filter_map(|d| d.last_update).min()
    }

    /// Energy produced on the snapshot's date, summed over devices.
    /// `None` when no device reports the figure.
    #[must_use]
    pub fn energy_today_kwh(&self) -> Option<f64> {
        self.devices
            .iter()
            .filter_map(|d| d.energy_today_kwh)
            .reduce(|a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use chrono::TimeZone;

    fn device(power_w: Option<f64>, temp: Option<f64>, energy: Option<f64>) -> DeviceReading {
        DeviceReading {
            serial: "INV".to_string(),
            power_w,
            temperature_c: temp,
            last_update: None,
            energy_today_kwh: energy,
        }
    }

    #[test]
    fn test_empty_snapshot_has_no_aggregates() {
        let snapshot = Snapshot::default();
        assert_eq!(snapshot.total_power_w(), None);
        assert_eq!(snapshot.max_temperature_c(), None);
        assert_eq!(snapshot.stalest_update(), None);
        assert_eq!(snapshot.energy_today_kwh(), None);
    }

    #[test]
    fn test_aggregates_across_devices() {
        let early = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).single();
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).single();
        let mut a = device(Some(1200.0), Some(41.0), Some(5.5));
        a.last_update = late;
        let mut b = device(Some(800.0), Some(47.5), None);
        b.last_update = early;
        let snapshot = Snapshot {
            devices: vec![a, b],
            ..Snapshot::default()
        };

        assert_eq!(snapshot.total_power_w(), Some(2000.0));
        assert_eq!(snapshot.max_temperature_c(), Some(47.5));
        assert_eq!(snapshot.stalest_update(), early);
        assert_eq!(snapshot.energy_today_kwh(), Some(5.5));
    }

    #[test]
    fn test_power_is_unknown_without_a_reporting_device() {
        let silent = Snapshot {
            devices: vec![device(None, None, None)],
            ..Snapshot::default()
        };
        assert_eq!(silent.total_power_w(), None);

        let mixed = Snapshot {
            devices: vec![device(None, None, None), device(Some(0.0), None, None)],
            ..Snapshot::default()
        };
        assert_eq!(mixed.total_power_w(), Some(0.0));
    }
}
