//! JSON request parser
//!
//! This module handles parsing of the caller's request: the module arguments
//! an automation agent hands over for one reconciliation. Field names are
//! snake_case, with camelCase aliases accepted.

use crate::error::{ConvergeError, Result};
use crate::reconcile::{DesiredState, ReconcileRequest};
use crate::spec::normalize;
use crate::wireguard::PrivateKey;
use serde::Deserialize;
use std::fmt;
use std::io::Read;

/// Request received from the automation caller
#[derive(Clone, Deserialize)]
pub struct ConvergeRequest {
    /// Interface name (e.g., "wg0")
    #[serde(default = "default_interface")]
    pub name: String,

    /// UDP listen port; kept wide so out-of-range input is reported, not truncated
    #[serde(default = "default_listen_port", alias = "listenPort")]
    pub listen_port: i64,

    /// Local interface addresses (CIDR notation)
    #[serde(default)]
    pub addresses: Vec<String>,

    /// Remote peers
    #[serde(default)]
    pub peers: Vec<RawPeer>,

    /// Target state
    #[serde(default)]
    pub state: DesiredState,

    /// Compute the action without mutating anything
    #[serde(default, alias = "dryRun", alias = "check_mode")]
    pub dry_run: bool,

    /// Existing base64 private key to reuse instead of generating one
    #[serde(default, alias = "privateKey")]
    pub private_key: Option<String>,
}

/// Peer entry exactly as supplied by the caller
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPeer {
    /// Base64-encoded public key
    #[serde(default, alias = "publicKey")]
    pub public_key: Option<String>,

    /// Allowed IP addresses/ranges
    #[serde(default, alias = "allowedIPs", alias = "allowedIps")]
    pub allowed_ips: Vec<String>,

    /// Peer endpoint
    #[serde(default)]
    pub endpoint: Option<RawEndpoint>,

    /// Persistent keepalive interval in seconds
    #[serde(default, alias = "persistentKeepalive")]
    pub persistent_keepalive: Option<i64>,
}

/// Endpoint as either `"host:port"` or `{ "address": ..., "port": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawEndpoint {
    /// `host:port` string
    Text(String),
    /// Separate host and port fields
    Structured {
        /// Hostname or IP address
        #[serde(alias = "host")]
        address: String,
        /// UDP port
        port: i64,
    },
}

impl ConvergeRequest {
    /// Parse a request from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            ConvergeError::Serialization(format!("Failed to parse JSON request: {}", e))
        })
    }

    /// Parse a request from a reader (file or stdin)
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|e| {
            ConvergeError::Serialization(format!("Failed to parse JSON request: {}", e))
        })
    }

    /// Validate the request and turn it into a typed reconciliation request
    pub fn into_request(self) -> Result<ReconcileRequest> {
        let spec = normalize(&self.name, self.listen_port, &self.addresses, &self.peers)?;

        let private_key = self
            .private_key
            .as_deref()
            .map(PrivateKey::from_base64)
            .transpose()?;

        Ok(ReconcileRequest {
            spec,
            state: self.state,
            dry_run: self.dry_run,
            private_key,
        })
    }
}

impl fmt::Debug for ConvergeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvergeRequest")
            .field("name", &self.name)
            .field("listen_port", &self.listen_port)
            .field("addresses", &self.addresses)
            .field("peers", &self.peers)
            .field("state", &self.state)
            .field("dry_run", &self.dry_run)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

// Default value functions for serde
fn default_interface() -> String {
    "wg0".to_string()
}

fn default_listen_port() -> i64 {
    51820
}
