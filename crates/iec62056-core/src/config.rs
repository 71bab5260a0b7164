//! Link configuration.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::protocol::constants::{DEFAULT_BAUD_RATE, DEFAULT_SERIAL_TIMEOUT, DEFAULT_TCP_TIMEOUT};
use crate::transport::{SerialTransport, TcpTransport, Transport};

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

/// Which transport to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Serial port (optical probe, RS-232 converter).
    Serial {
        port: String,
        /// Baud rate used when the port is first opened.
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
    /// TCP endpoint.
    Tcp { host: String, port: u16 },
}

/// Configuration for a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Read timeout in seconds. Defaults depend on the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Consecutive NACKs allowed per block. Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nack_retries: Option<u32>,
    pub transport: TransportConfig,
}

impl LinkConfig {
    pub fn serial(port: impl Into<String>) -> Self {
        Self {
            timeout_secs: None,
            max_nack_retries: None,
            transport: TransportConfig::Serial {
                port: port.into(),
                baud_rate: DEFAULT_BAUD_RATE,
            },
        }
    }

    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            timeout_secs: None,
            max_nack_retries: None,
            transport: TransportConfig::Tcp {
                host: host.into(),
                port,
            },
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LinkConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Effective read timeout.
    pub fn timeout(&self) -> Duration {
        match (self.timeout_secs, &self.transport) {
            (Some(secs), _) => Duration::from_secs(secs),
            (None, TransportConfig::Serial { .. }) => DEFAULT_SERIAL_TIMEOUT,
            (None, TransportConfig::Tcp { .. }) => DEFAULT_TCP_TIMEOUT,
        }
    }

    /// Build the configured transport, still closed.
    pub fn build_transport(&self) -> Box<dyn Transport> {
        match &self.transport {
            TransportConfig::Serial { port, baud_rate } => Box::new(
                SerialTransport::with_timeout(port.clone(), self.timeout())
                    .initial_baud_rate(*baud_rate),
            ),
            TransportConfig::Tcp { host, port } => {
                Box::new(TcpTransport::with_timeout(host.clone(), *port, self.timeout()))
            }
        }
    }
}
