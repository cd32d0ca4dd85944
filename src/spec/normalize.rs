//! Spec normalizer
//!
//! Turns caller-supplied fields into an [`InterfaceSpec`]. Pure: no I/O and
//! no collaborator calls, so a rejected request never touches the host.

use crate::config::validation::{
    parse_endpoint, validate_cidr, validate_endpoint_host, validate_endpoint_port,
    validate_interface_name, validate_keepalive, validate_listen_port,
};
use crate::config::{RawEndpoint, RawPeer};
use crate::error::{ConvergeError, Result};
use crate::spec::{Endpoint, InterfaceSpec, PeerSpec};
use crate::wireguard::PublicKey;
use std::collections::HashSet;

/// Build a canonical interface spec from raw caller input
///
/// Address and peer order is preserved. Any peer problem is reported as
/// [`ConvergeError::InvalidPeerSpec`] carrying the peer's index.
pub fn normalize(
    raw_name: &str,
    raw_port: i64,
    raw_addresses: &[String],
    raw_peers: &[RawPeer],
) -> Result<InterfaceSpec> {
    let name = raw_name.trim();
    validate_interface_name(name)?;

    let listen_port = validate_listen_port(raw_port)?;

    if raw_addresses.is_empty() {
        return Err(ConvergeError::Validation(
            "At least one interface address is required".to_string(),
        ));
    }
    let addresses = normalize_cidrs(raw_addresses).map_err(|e| match e {
        CidrListError::Invalid(e) => e,
        CidrListError::Duplicate(cidr) => {
            ConvergeError::Validation(format!("Duplicate interface address: {}", cidr))
        }
    })?;

    let mut seen_keys = HashSet::new();
    let mut peers = Vec::with_capacity(raw_peers.len());
    for (index, raw) in raw_peers.iter().enumerate() {
        let peer = normalize_peer(raw).map_err(|reason| ConvergeError::InvalidPeerSpec {
            index,
            reason,
        })?;

        if !seen_keys.insert(peer.public_key.clone()) {
            return Err(ConvergeError::InvalidPeerSpec {
                index,
                reason: format!("duplicate public key {}", peer.public_key),
            });
        }
        peers.push(peer);
    }

    Ok(InterfaceSpec {
        name: name.to_string(),
        listen_port,
        addresses,
        peers,
    })
}

fn normalize_peer(raw: &RawPeer) -> std::result::Result<PeerSpec, String> {
    let key = raw
        .public_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| "missing public key".to_string())?;
    let public_key = PublicKey::from_base64(key).map_err(|e| e.to_string())?;

    if raw.allowed_ips.is_empty() {
        return Err("at least one allowed IP is required".to_string());
    }
    let allowed_ips = normalize_cidrs(&raw.allowed_ips).map_err(|e| match e {
        CidrListError::Invalid(e) => e.to_string(),
        CidrListError::Duplicate(cidr) => format!("duplicate allowed IP {}", cidr),
    })?;

    let endpoint = raw
        .endpoint
        .as_ref()
        .map(normalize_endpoint)
        .transpose()
        .map_err(|e| e.to_string())?;

    let persistent_keepalive = match raw.persistent_keepalive {
        Some(secs) => validate_keepalive(secs).map_err(|e| e.to_string())?,
        None => None,
    };

    Ok(PeerSpec {
        public_key,
        allowed_ips,
        endpoint,
        persistent_keepalive,
    })
}

fn normalize_endpoint(raw: &RawEndpoint) -> Result<Endpoint> {
    let (host, port) = match raw {
        RawEndpoint::Text(text) => parse_endpoint(text.trim())?,
        RawEndpoint::Structured { address, port } => {
            let host = address.trim();
            let host = host
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .unwrap_or(host);
            (validate_endpoint_host(host)?, validate_endpoint_port(*port)?)
        }
    };
    Ok(Endpoint { host, port })
}

enum CidrListError {
    Invalid(ConvergeError),
    Duplicate(String),
}

fn normalize_cidrs(raw: &[String]) -> std::result::Result<Vec<String>, CidrListError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for cidr in raw {
        let cidr = cidr.trim();
        validate_cidr(cidr).map_err(CidrListError::Invalid)?;
        if !seen.insert(cidr) {
            return Err(CidrListError::Duplicate(cidr.to_string()));
        }
        out.push(cidr.to_string());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wireguard::KeyPair;
    use proptest::prelude::*;

    fn key() -> String {
        KeyPair::generate().unwrap().public.to_base64()
    }

    fn peer(allowed: &[&str]) -> RawPeer {
        RawPeer {
            public_key: Some(key()),
            allowed_ips: allowed.iter().map(|s| s.to_string()).collect(),
            endpoint: None,
            persistent_keepalive: None,
        }
    }

    fn addrs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_valid_spec() {
        let mut p = peer(&["10.0.0.2/32"]);
        p.endpoint = Some(RawEndpoint::Structured {
            address: "1.2.3.4".to_string(),
            port: 51820,
        });
        p.persistent_keepalive = Some(25);

        let spec = normalize("wg0", 51820, &addrs(&["10.0.0.1/24"]), &[p]).unwrap();
        assert_eq!(spec.name, "wg0");
        assert_eq!(spec.listen_port, 51820);
        assert_eq!(spec.addresses, vec!["10.0.0.1/24"]);
        assert_eq!(spec.peers.len(), 1);
        assert_eq!(
            spec.peers[0].endpoint,
            Some(Endpoint {
                host: "1.2.3.4".to_string(),
                port: 51820
            })
        );
        assert_eq!(spec.peers[0].persistent_keepalive, Some(25));
    }

    #[test]
    fn test_normalize_rejects_bad_port() {
        let a = addrs(&["10.0.0.1/24"]);
        assert!(normalize("wg0", 0, &a, &[]).is_err());
        assert!(normalize("wg0", 70000, &a, &[]).is_err());
    }

    #[test]
    fn test_normalize_rejects_bad_addresses() {
        assert!(normalize("wg0", 51820, &[], &[]).is_err());
        assert!(normalize("wg0", 51820, &addrs(&["10.0.0.1"]), &[]).is_err());

        let err = normalize("wg0", 51820, &addrs(&["10.0.0.1/24", " 10.0.0.1/24"]), &[])
            .unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_normalize_rejects_bad_name() {
        let a = addrs(&["10.0.0.1/24"]);
        assert!(normalize("", 51820, &a, &[]).is_err());
        assert!(normalize("wg/0", 51820, &a, &[]).is_err());
    }

    #[test]
    fn test_missing_public_key_names_index() {
        let mut bad = peer(&["10.0.0.3/32"]);
        bad.public_key = None;
        let peers = vec![peer(&["10.0.0.2/32"]), bad];

        let err = normalize("wg0", 51820, &addrs(&["10.0.0.1/24"]), &peers).unwrap_err();
        match err {
            ConvergeError::InvalidPeerSpec { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("public key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_blank_public_key_rejected() {
        let mut bad = peer(&["10.0.0.2/32"]);
        bad.public_key = Some("   ".to_string());
        let err = normalize("wg0", 51820, &addrs(&["10.0.0.1/24"]), &[bad]).unwrap_err();
        assert!(matches!(err, ConvergeError::InvalidPeerSpec { index: 0, .. }));
    }

    #[test]
    fn test_empty_allowed_ips_rejected() {
        let peers = vec![peer(&[])];
        let err = normalize("wg0", 51820, &addrs(&["10.0.0.1/24"]), &peers).unwrap_err();
        assert!(matches!(err, ConvergeError::InvalidPeerSpec { index: 0, .. }));
    }

    #[test]
    fn test_malformed_peer_fields_rejected() {
        let a = addrs(&["10.0.0.1/24"]);

        let mut bad_key = peer(&["10.0.0.2/32"]);
        bad_key.public_key = Some("ABC".to_string());
        assert!(normalize("wg0", 51820, &a, &[bad_key]).is_err());

        assert!(normalize("wg0", 51820, &a, &[peer(&["10.0.0.2"])]).is_err());

        let mut bad_endpoint = peer(&["10.0.0.2/32"]);
        bad_endpoint.endpoint = Some(RawEndpoint::Text("host-without-port".to_string()));
        assert!(normalize("wg0", 51820, &a, &[bad_endpoint]).is_err());

        let mut bad_keepalive = peer(&["10.0.0.2/32"]);
        bad_keepalive.persistent_keepalive = Some(-5);
        assert!(normalize("wg0", 51820, &a, &[bad_keepalive]).is_err());
    }

    #[test]
    fn test_duplicate_peer_key_rejected() {
        let first = peer(&["10.0.0.2/32"]);
        let mut second = peer(&["10.0.0.3/32"]);
        second.public_key = first.public_key.clone();

        let err = normalize("wg0", 51820, &addrs(&["10.0.0.1/24"]), &[first, second]).unwrap_err();
        assert!(matches!(err, ConvergeError::InvalidPeerSpec { index: 1, .. }));
    }

    #[test]
    fn test_zero_keepalive_means_unset() {
        let mut p = peer(&["10.0.0.2/32"]);
        p.persistent_keepalive = Some(0);
        let spec = normalize("wg0", 51820, &addrs(&["10.0.0.1/24"]), &[p]).unwrap();
        assert_eq!(spec.peers[0].persistent_keepalive, None);
    }

    #[test]
    fn test_bracketed_structured_endpoint() {
        let mut p = peer(&["fd00::2/128"]);
        p.endpoint = Some(RawEndpoint::Structured {
            address: "[fd00::1]".to_string(),
            port: 51820,
        });
        let spec = normalize("wg0", 51820, &addrs(&["fd00::1/64"]), &[p]).unwrap();
        assert_eq!(spec.peers[0].endpoint.as_ref().unwrap().host, "fd00::1");
    }

    proptest! {
        #[test]
        fn prop_address_order_preserved(octets in proptest::collection::hash_set(1u8..=254, 1..8)) {
            let raw: Vec<String> = octets.iter().map(|o| format!("10.0.{}.1/24", o)).collect();
            let spec = normalize("wg0", 51820, &raw, &[]).unwrap();
            prop_assert_eq!(spec.addresses, raw);
        }

        #[test]
        fn prop_peer_order_preserved(count in 1usize..6) {
            let peers: Vec<RawPeer> = (0..count)
                .map(|i| peer(&[format!("10.1.{}.0/24", i).as_str()]))
                .collect();
            let spec = normalize("wg0", 51820, &addrs(&["10.0.0.1/24"]), &peers).unwrap();
            for (raw, normalized) in peers.iter().zip(&spec.peers) {
                prop_assert_eq!(
                    raw.public_key.as_deref().unwrap(),
                    normalized.public_key.to_base64()
                );
            }
        }
    }
}
