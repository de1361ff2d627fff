use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use rrdserve_core::error::{Result, RrdServeError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    pub server: ServerSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RrdServeError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.validate()?;   // Verify the scope of value

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Root directory holding the `.rrd` archives. Used as written.
    pub rrd_path: String,

    #[serde(default)]
    pub annotations_path: Option<String>,

    #[serde(default = "default_target_timeout_ms")]
    pub target_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if self.rrd_path.trim().is_empty() {
            return Err(RrdServeError::Config("server.rrdPath must not be empty".into()));
        }
        if !(1..=60_000).contains(&self.target_timeout_ms) {
            return Err(RrdServeError::Config(
                "server.targetTimeoutMs must be between 1 and 60000".into(),
            ));
        }
        if !(1..=300_000).contains(&self.request_timeout_ms) {
            return Err(RrdServeError::Config(
                "server.requestTimeoutMs must be between 1 and 300000".into(),
            ));
        }
        if self.request_timeout_ms < self.target_timeout_ms {
            return Err(RrdServeError::Config(
                "server.requestTimeoutMs must not be smaller than targetTimeoutMs".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            RrdServeError::Config(format!("server.listen must be a valid SocketAddr: {e}"))
        })
    }

    pub fn target_timeout(&self) -> Duration {
        Duration::from_millis(self.target_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:9000".into()
}
fn default_target_timeout_ms() -> u64 {
    5000
}
fn default_request_timeout_ms() -> u64 {
    15000
}
