use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::ads1256::{Config, DataRate, Pga, ReadyWait};
use crate::frame::Layout;

/// Runtime configuration of the adapter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Converter output data rate.
    pub data_rate: DataRate,
    /// Programmable gain.
    pub gain: Pga,
    /// Enable the analog input buffer.
    pub input_buffer: bool,
    /// Recalibrate whenever gain, rate or buffer settings change.
    pub auto_calibration: bool,
    /// Give up waiting for DRDY after this many polls. `None` waits forever.
    pub ready_timeout_polls: Option<u32>,
    /// Interval between scan cycles in milliseconds.
    pub scan_period_ms: u32,
    /// Interval between output frames in milliseconds.
    pub transmit_period_ms: u32,
    pub layout: Layout,
    /// Hold back frames until every channel carries its own sample.
    pub gate_until_stable: bool,
    /// UART baud rate.
    pub baudrate: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_rate: DataRate::Sps1000,
            gain: Pga::Gain1,
            input_buffer: true,
            auto_calibration: true,
            ready_timeout_polls: None,
            scan_period_ms: 5,
            transmit_period_ms: 10,
            layout: Layout::BigEndian,
            gate_until_stable: true,
            baudrate: 115_200,
        }
    }
}

impl Settings {
    /// Parse settings from JSON. Missing fields take their default.
    pub fn from_json(json: &str) -> Result<Self, serde_json_core::de::Error> {
        Ok(serde_json_core::from_str(json)?.0)
    }

    /// Settings compiled in through the `DT35_SETTINGS` environment variable.
    pub fn load() -> Self {
        match option_env!("DT35_SETTINGS") {
            Some(json) => Self::from_json(json).unwrap_or_else(|e| {
                warn!("Invalid DT35_SETTINGS ({:?}), using defaults", e);
                Self::default()
            }),
            None => {
                info!("Using default settings");
                Self::default()
            }
        }
    }
}

impl From<&Settings> for Config {
    fn from(settings: &Settings) -> Self {
        let config = Config::default();
        Self {
            status: config
                .status
                .with_bufen(settings.input_buffer)
                .with_acal(settings.auto_calibration),
            adcon: config.adcon.with_pga(settings.gain),
            data_rate: settings.data_rate,
            ready_wait: settings
                .ready_timeout_polls
                .map_or(ReadyWait::Unbounded, |polls| ReadyWait::Bounded { polls }),
            ..config
        }
    }
}
