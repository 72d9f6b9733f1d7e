use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Configuration for the daemon.
///
/// Only deployment-specific wiring lives here; the sampling rate, batch
/// size, and queue depth are protocol constants in `imu_sensor`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// I2C bus number the sensors are attached to
    pub i2c_bus: u8,
    /// Bus address of sensor A (AD0 low)
    pub sensor_a_addr: u8,
    /// Bus address of sensor B (AD0 high)
    pub sensor_b_addr: u8,
    /// TCP port the WebSocket link listens on
    pub listen_port: u16,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            sensor_a_addr: 0x68,
            sensor_b_addr: 0x69,
            listen_port: 9000,
        }
    }
}

/// Load configuration from file or fall back to defaults. A missing file is
/// created with the defaults for future edits.
pub fn load_config(path: &str) -> DaemonConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                info!("loaded configuration from {}", path);
                config
            }
            Err(e) => {
                warn!("error parsing {}: {}. using defaults", path, e);
                DaemonConfig::default()
            }
        },
        Err(_) => {
            let default_config = DaemonConfig::default();
            if let Ok(json) = serde_json::to_string_pretty(&default_config) {
                if std::fs::write(path, json).is_ok() {
                    info!("created default configuration file at {}", path);
                }
            }
            default_config
        }
    }
}
