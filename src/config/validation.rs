//! Field validation functions
//!
//! This module provides validation for caller-supplied fields (interface
//! names, ports, CIDRs, endpoints, keepalive intervals) and for the tool's
//! own settings (paths, backup suffix).

use crate::error::{ConvergeError, Result};
use std::net::IpAddr;
use std::path::{Component, Path};
use tracing::warn;

/// Maximum interface name length on Linux (IFNAMSIZ - 1)
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Validate interface name (1-15 chars of `[A-Za-z0-9_=+.-]`)
pub fn validate_interface_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConvergeError::Validation(
            "Interface name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(ConvergeError::Validation(format!(
            "Interface name '{}' exceeds maximum length of {} characters",
            name, MAX_INTERFACE_NAME_LEN
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '=' | '+' | '.' | '-'))
    {
        return Err(ConvergeError::Validation(format!(
            "Interface name '{}' contains invalid characters (only alphanumeric, '_', '=', '+', '.', and '-' allowed)",
            name
        )));
    }

    if name == "." || name == ".." {
        return Err(ConvergeError::Validation(format!(
            "Interface name '{}' is reserved",
            name
        )));
    }

    Ok(())
}

/// Validate a listen port (1-65535)
pub fn validate_listen_port(port: i64) -> Result<u16> {
    if !(1..=65535).contains(&port) {
        return Err(ConvergeError::Validation(format!(
            "Listen port {} is out of valid range (1-65535)",
            port
        )));
    }
    Ok(port as u16)
}

/// Validate IP address
pub fn validate_ip_address(ip: &str) -> Result<IpAddr> {
    ip.parse::<IpAddr>()
        .map_err(|_| ConvergeError::Validation(format!("Invalid IP address: {}", ip)))
}

/// Validate CIDR notation (IP/prefix)
pub fn validate_cidr(cidr: &str) -> Result<()> {
    let Some((ip, prefix)) = cidr.split_once('/') else {
        return Err(ConvergeError::Validation(format!(
            "Invalid CIDR notation: {} (expected format: IP/prefix)",
            cidr
        )));
    };

    let ip = validate_ip_address(ip)?;

    let prefix: u8 = prefix.parse().map_err(|_| {
        ConvergeError::Validation(format!("Invalid prefix length in CIDR: {}", cidr))
    })?;

    let max_prefix = match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };

    if prefix > max_prefix {
        return Err(ConvergeError::Validation(format!(
            "Prefix length {} exceeds maximum {} for IP address {}",
            prefix, max_prefix, ip
        )));
    }

    Ok(())
}

/// Parse an endpoint of the form `host:port` or `[v6addr]:port`
pub fn parse_endpoint(endpoint: &str) -> Result<(String, u16)> {
    let Some((host, port)) = endpoint.rsplit_once(':') else {
        return Err(ConvergeError::Validation(format!(
            "Invalid endpoint format: {} (expected format: host:port)",
            endpoint
        )));
    };

    let host = match host.strip_prefix('[') {
        Some(inner) => inner.strip_suffix(']').ok_or_else(|| {
            ConvergeError::Validation(format!("Unterminated IPv6 bracket in endpoint: {}", endpoint))
        })?,
        // A bare IPv6 literal without brackets makes the port ambiguous
        None if host.contains(':') => {
            return Err(ConvergeError::Validation(format!(
                "IPv6 endpoint must be bracketed: {}",
                endpoint
            )))
        }
        None => host,
    };

    let port: i64 = port.parse().map_err(|_| {
        ConvergeError::Validation(format!("Invalid port in endpoint: {}", endpoint))
    })?;

    Ok((validate_endpoint_host(host)?, validate_endpoint_port(port)?))
}

/// Validate the host part of an endpoint (hostname or IP)
pub fn validate_endpoint_host(host: &str) -> Result<String> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ConvergeError::Validation(
            "Host cannot be empty in endpoint".to_string(),
        ));
    }

    if host.chars().any(|c| c.is_whitespace() || c == '/' || c == '#') {
        return Err(ConvergeError::Validation(format!(
            "Endpoint host '{}' contains invalid characters",
            host
        )));
    }

    Ok(host.to_string())
}

/// Validate the port part of an endpoint
pub fn validate_endpoint_port(port: i64) -> Result<u16> {
    if !(1..=65535).contains(&port) {
        return Err(ConvergeError::Validation(format!(
            "Endpoint port {} is out of valid range (1-65535)",
            port
        )));
    }
    Ok(port as u16)
}

/// Validate a persistent keepalive interval; 0 disables it
pub fn validate_keepalive(secs: i64) -> Result<Option<u16>> {
    if secs < 0 || secs > i64::from(u16::MAX) {
        return Err(ConvergeError::Validation(format!(
            "Keepalive interval {} is out of valid range (0-65535)",
            secs
        )));
    }

    if secs > 0 && secs < 10 {
        warn!("Keepalive interval of {}s is unusually short", secs);
    }

    Ok((secs > 0).then_some(secs as u16))
}

/// Validate the directory holding interface configuration files
pub fn validate_config_dir(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(ConvergeError::Config(
            "Configuration directory cannot be empty".to_string(),
        ));
    }

    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        warn!("Configuration directory contains parent directory reference: {:?}", path);
        return Err(ConvergeError::Config(format!(
            "Configuration directory {:?} contains invalid parent directory reference",
            path
        )));
    }

    Ok(())
}

/// Validate the suffix appended to backup copies
pub fn validate_backup_suffix(suffix: &str) -> Result<()> {
    if suffix.is_empty() {
        return Err(ConvergeError::Config(
            "Backup suffix cannot be empty".to_string(),
        ));
    }

    if suffix.contains('/') || suffix.contains('\0') {
        return Err(ConvergeError::Config(format!(
            "Backup suffix '{}' must not contain path separators",
            suffix
        )));
    }

    Ok(())
}
