//! Node configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use enl_core::{EnlError, EnlResult, NodeId};
use enl_object::{ExtraDataPolicy, LocalObjectConfig};

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Node configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Address of this node on the transport
    pub node_id: u64,
    /// Bound on each remote proxy round trip, in milliseconds
    pub remote_timeout_ms: u64,
    /// Capacity of the inbound frame queue
    pub inbound_buffer: usize,
    /// Forward changes of observable properties as announcements
    pub announce_changes: bool,
    pub extra_data_policy: ExtraDataPolicy,
    pub log_format: LogFormat,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            node_id: 0,
            remote_timeout_ms: 2000,
            inbound_buffer: 256,
            announce_changes: true,
            extra_data_policy: ExtraDataPolicy::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl NodeConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> EnlResult<Self> {
        let config: NodeConfig =
            serde_json::from_str(json).map_err(|e| EnlError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> EnlResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EnlError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> EnlResult<()> {
        if self.remote_timeout_ms == 0 {
            return Err(EnlError::InvalidTimeout);
        }
        if self.inbound_buffer == 0 {
            return Err(EnlError::InvalidConfig("inbound_buffer must be positive".into()));
        }
        Ok(())
    }

    pub fn node(&self) -> NodeId {
        NodeId::new(self.node_id)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    /// Configuration applied to every local object
    pub fn object_config(&self) -> LocalObjectConfig {
        LocalObjectConfig {
            extra_data_policy: self.extra_data_policy,
        }
    }
}
