//! Door agent configuration.
//!
//! Loaded from TOML. Everything except `module_id` has a default, so the
//! smallest usable file is:
//!
//! ```toml
//! module_id = "D1"
//!
//! [hub]
//! address = "192.168.1.10"
//! ```

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use doorlink_core::constants::*;
use doorlink_core::{Centimeters, Degrees, ModuleId};

/// Top-level agent configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Identifier announced to the hub
    pub module_id: ModuleId,

    /// Local address for the command socket
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Local port the hub sends COMMANDs to
    #[serde(default = "default_notify_port")]
    pub listen_port: u16,

    /// Interval between HEARTBEAT messages
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Send an EVENT for every observed change
    #[serde(default = "default_true")]
    pub report_events: bool,

    /// Send periodic HEARTBEATs
    #[serde(default = "default_true")]
    pub report_heartbeats: bool,

    /// Pending LED events kept before the oldest is dropped
    #[serde(default = "default_led_queue_capacity")]
    pub led_queue_capacity: usize,

    #[serde(default)]
    pub hub: HubEndpoint,

    #[serde(default)]
    pub door: DoorConfig,
}

/// Where the hub listens
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HubEndpoint {
    pub address: IpAddr,
    pub notify_port: u16,
    pub heartbeat_port: u16,
}

impl Default for HubEndpoint {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            notify_port: DEFAULT_NOTIFY_PORT,
            heartbeat_port: DEFAULT_HEARTBEAT_PORT,
        }
    }
}

impl HubEndpoint {
    pub fn notify_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.notify_port)
    }

    pub fn heartbeat_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.heartbeat_port)
    }
}

/// Door hardware calibration and lock policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DoorConfig {
    /// Readings below this distance mean the door is closed
    pub closed_threshold_cm: u32,

    /// Actuator angle of the engaged bolt
    pub locked_position_deg: u16,

    /// Actuator angle of the retracted bolt
    pub unlocked_position_deg: u16,

    /// Averaging window used before locking
    pub sampling_window_ms: u64,

    /// Delay between samples inside the window
    pub sample_interval_ms: u64,

    /// Unlock a door last seen locked without consulting the sensor.
    ///
    /// The bolt cannot be engaged on an open door, so a locked door is
    /// assumed closed. Disable on frames where the sensor is trusted more
    /// than the actuator.
    pub trust_last_locked: bool,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            closed_threshold_cm: DEFAULT_CLOSED_THRESHOLD_CM,
            locked_position_deg: DEFAULT_LOCKED_POSITION_DEG,
            unlocked_position_deg: DEFAULT_UNLOCKED_POSITION_DEG,
            sampling_window_ms: DEFAULT_SAMPLING_WINDOW_MS,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            trust_last_locked: true,
        }
    }
}

impl DoorConfig {
    pub fn closed_threshold(&self) -> Centimeters {
        Centimeters(self.closed_threshold_cm)
    }

    pub fn locked_position(&self) -> Degrees {
        Degrees(self.locked_position_deg)
    }

    pub fn unlocked_position(&self) -> Degrees {
        Degrees(self.unlocked_position_deg)
    }

    pub fn sampling_window(&self) -> Duration {
        Duration::from_millis(self.sampling_window_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// # Errors
    /// Returns `AgentError::Config` for inconsistent calibration values.
    pub fn validate(&self) -> Result<()> {
        if self.locked_position_deg == self.unlocked_position_deg {
            return Err(AgentError::Config(format!(
                "locked and unlocked positions must differ (both {})",
                self.locked_position_deg
            )));
        }
        if self.closed_threshold_cm == 0 {
            return Err(AgentError::Config(
                "closed_threshold_cm must be positive".to_string(),
            ));
        }
        if self.sample_interval_ms == 0 || self.sample_interval_ms > self.sampling_window_ms {
            return Err(AgentError::Config(format!(
                "sample_interval_ms must be in 1..={}, got {}",
                self.sampling_window_ms, self.sample_interval_ms
            )));
        }
        Ok(())
    }
}

impl AgentConfig {
    /// Configuration with defaults for everything but the module id.
    pub fn new(module_id: ModuleId) -> Self {
        Self {
            module_id,
            bind_address: default_bind_address(),
            listen_port: default_notify_port(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            report_events: true,
            report_heartbeats: true,
            led_queue_capacity: default_led_queue_capacity(),
            hub: HubEndpoint::default(),
            door: DoorConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use doorlink_agent::AgentConfig;
    ///
    /// let config = AgentConfig::from_file("agent.toml")?;
    /// # Ok::<(), doorlink_agent::AgentError>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| AgentError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AgentConfig =
            toml::from_str(contents).map_err(|e| AgentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML, e.g. for `gen-config`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AgentError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval_ms == 0 {
            return Err(AgentError::Config(
                "heartbeat_interval_ms must be positive".to_string(),
            ));
        }
        self.door.validate()
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.listen_port)
    }
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_notify_port() -> u16 {
    DEFAULT_NOTIFY_PORT
}

fn default_heartbeat_interval_ms() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_MS
}

fn default_led_queue_capacity() -> usize {
    DEFAULT_LED_QUEUE_CAPACITY
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AgentConfig::from_toml(r#"module_id = "D1""#).unwrap();

        assert_eq!(config.module_id.as_str(), "D1");
        assert_eq!(config.listen_port, 12345);
        assert_eq!(config.hub.notify_port, 12345);
        assert_eq!(config.hub.heartbeat_port, 12346);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(1));
        assert_eq!(config.door.closed_threshold(), Centimeters(10));
        assert_eq!(config.door.locked_position(), Degrees(180));
        assert_eq!(config.door.unlocked_position(), Degrees(0));
        assert!(config.door.trust_last_locked);
        assert!(config.report_events && config.report_heartbeats);
    }

    #[test]
    fn test_missing_module_id_is_rejected() {
        let result = AgentConfig::from_toml("listen_port = 5000");
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_invalid_module_id_is_rejected() {
        let result = AgentConfig::from_toml(r#"module_id = "front door""#);
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_nested_sections() {
        let config = AgentConfig::from_toml(
            r#"
            module_id = "GATE2"
            report_heartbeats = false

            [hub]
            address = "10.0.0.5"
            heartbeat_port = 15000

            [door]
            closed_threshold_cm = 15
            trust_last_locked = false
            "#,
        )
        .unwrap();

        assert_eq!(config.hub.notify_addr(), "10.0.0.5:12345".parse().unwrap());
        assert_eq!(config.hub.heartbeat_addr(), "10.0.0.5:15000".parse().unwrap());
        assert_eq!(config.door.closed_threshold_cm, 15);
        assert!(!config.door.trust_last_locked);
        assert!(!config.report_heartbeats);
    }

    #[test]
    fn test_validation_rejects_equal_positions() {
        let mut config = AgentConfig::new(ModuleId::new("D1").unwrap());
        config.door.unlocked_position_deg = config.door.locked_position_deg;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_sampling() {
        let mut config = AgentConfig::new(ModuleId::new("D1").unwrap());
        config.door.sample_interval_ms = 0;
        assert!(config.validate().is_err());

        config.door.sample_interval_ms = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_through_file() {
        let config = AgentConfig::new(ModuleId::new("D9").unwrap());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml().unwrap().as_bytes()).unwrap();

        let loaded = AgentConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.module_id, config.module_id);
        assert_eq!(loaded.listen_addr(), config.listen_addr());
    }

    #[test]
    fn test_missing_file() {
        let result = AgentConfig::from_file("/nonexistent/agent.toml");
        assert!(matches!(result, Err(AgentError::ConfigRead { .. })));
    }
}
