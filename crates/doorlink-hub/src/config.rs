//! Hub configuration.
//!
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! notify_port = 12345
//! heartbeat_port = 12346
//! offline_timeout_ms = 10000
//!
//! [commands]
//! ack_timeout_ms = 500
//! retries = 2
//! ```

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};
use doorlink_core::constants::*;

/// Top-level hub configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HubConfig {
    /// Local address both sockets bind to
    pub bind_address: IpAddr,

    /// Port for HELLO, EVENT and FEEDBACK; COMMANDs are sent from it
    pub notify_port: u16,

    /// Port for HEARTBEATs; equal to `notify_port` means one shared socket
    pub heartbeat_port: u16,

    /// Modules tracked before new ones go to history only
    pub max_modules: usize,

    /// Entries kept in the history ring
    pub history_capacity: usize,

    /// Silence after which a module is marked offline
    pub offline_timeout_ms: u64,

    /// Liveness check interval while no traffic arrives
    pub sweep_interval_ms: u64,

    /// Pending alerts kept before the oldest is dropped
    pub alert_queue_capacity: usize,

    /// Pending LED events kept before the oldest is dropped
    pub led_queue_capacity: usize,

    pub commands: CommandConfig,
}

/// Command delivery settings
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Wait for FEEDBACK per attempt
    pub ack_timeout_ms: u64,

    /// Attempts after the first one
    pub retries: u32,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            retries: DEFAULT_COMMAND_RETRIES,
        }
    }
}

impl CommandConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Total number of sends per command.
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            notify_port: DEFAULT_NOTIFY_PORT,
            heartbeat_port: DEFAULT_HEARTBEAT_PORT,
            max_modules: DEFAULT_MAX_MODULES,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            offline_timeout_ms: DEFAULT_OFFLINE_TIMEOUT_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            alert_queue_capacity: DEFAULT_ALERT_QUEUE_CAPACITY,
            led_queue_capacity: DEFAULT_LED_QUEUE_CAPACITY,
            commands: CommandConfig::default(),
        }
    }
}

impl HubConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use doorlink_hub::HubConfig;
    ///
    /// let config = HubConfig::from_file("hub.toml")?;
    /// # Ok::<(), doorlink_hub::HubError>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| HubError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: HubConfig =
            toml::from_str(contents).map_err(|e| HubError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| HubError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_modules == 0 {
            return Err(HubError::Config("max_modules must be positive".to_string()));
        }
        if self.history_capacity == 0 {
            return Err(HubError::Config(
                "history_capacity must be positive".to_string(),
            ));
        }
        if self.offline_timeout_ms == 0 || self.sweep_interval_ms == 0 {
            return Err(HubError::Config(
                "offline_timeout_ms and sweep_interval_ms must be positive".to_string(),
            ));
        }
        if self.commands.ack_timeout_ms == 0 {
            return Err(HubError::Config(
                "commands.ack_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn notify_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.notify_port)
    }

    pub fn heartbeat_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.heartbeat_port)
    }

    /// Whether heartbeats arrive on the notification socket.
    ///
    /// Port 0 asks for an ephemeral port, so two zero ports still mean two
    /// sockets.
    pub fn shares_socket(&self) -> bool {
        self.notify_port == self.heartbeat_port && self.notify_port != 0
    }

    pub fn offline_timeout(&self) -> Duration {
        Duration::from_millis(self.offline_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}
