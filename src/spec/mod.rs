//! Desired interface specification
//!
//! Strongly-typed form of the caller's request. Values of these types only
//! come out of [`normalize`], so everything downstream can rely on them
//! being well-formed.

mod normalize;

pub use normalize::normalize;

use crate::wireguard::PublicKey;
use std::fmt;

/// Desired state of one WireGuard interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    /// Interface name
    pub name: String,
    /// UDP listen port
    pub listen_port: u16,
    /// Local addresses in CIDR notation, in caller order, without duplicates
    pub addresses: Vec<String>,
    /// Remote peers in caller order
    pub peers: Vec<PeerSpec>,
}

/// One remote peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSpec {
    /// Peer's public key
    pub public_key: PublicKey,
    /// Allowed IP ranges in CIDR notation, in caller order
    pub allowed_ips: Vec<String>,
    /// Where to reach the peer; `None` for listen-only peers
    pub endpoint: Option<Endpoint>,
    /// Keepalive interval in seconds
    pub persistent_keepalive: Option<u16>,
}

/// Host and port of a peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Hostname or IP literal (IPv6 without brackets)
    pub host: String,
    /// UDP port
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
