//! Configuration file rendering
//!
//! Renders an [`InterfaceSpec`] into the wg-quick configuration format. The
//! output is a pure function of its inputs: blocks and keys always appear in
//! the same order, peers in caller order, so the comparison rendering of an
//! unchanged spec is byte-identical across runs.

use crate::spec::InterfaceSpec;
use crate::wireguard::{KeyPair, PrivateKey};
use std::fmt::{self, Write};
use zeroize::Zeroizing;

const PRIVATE_KEY: &str = "PrivateKey";

/// Keys only wg-quick understands; `wg setconf` rejects them
const WG_QUICK_ONLY_KEYS: &[&str] = &["Address", "DNS", "MTU", "Table", "SaveConfig"];

/// Rendered configuration text
///
/// The persisted form contains the private key; its buffer is zeroized on
/// drop and `Debug` does not print it.
pub struct RenderedConfig {
    text: Zeroizing<String>,
    has_secret: bool,
}

impl RenderedConfig {
    /// The rendered text
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the text carries a private key line
    pub fn has_secret(&self) -> bool {
        self.has_secret
    }
}

impl fmt::Debug for RenderedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_secret {
            f.write_str("RenderedConfig([REDACTED])")
        } else {
            f.debug_tuple("RenderedConfig").field(&*self.text).finish()
        }
    }
}

/// Render a spec; with `keys` for the persisted file, without for comparison
pub fn render(spec: &InterfaceSpec, keys: Option<&KeyPair>) -> RenderedConfig {
    let mut output = Zeroizing::new(String::new());

    output.push_str("[Interface]\n");
    if let Some(keys) = keys {
        let _ = writeln!(output, "{} = {}", PRIVATE_KEY, keys.private.to_base64().as_str());
    }
    let _ = writeln!(output, "ListenPort = {}", spec.listen_port);
    let _ = writeln!(output, "Address = {}", spec.addresses.join(" "));

    for peer in &spec.peers {
        output.push('\n');
        output.push_str("[Peer]\n");
        let _ = writeln!(output, "PublicKey = {}", peer.public_key.to_base64());
        let _ = writeln!(output, "AllowedIPs = {}", peer.allowed_ips.join(","));

        if let Some(ref endpoint) = peer.endpoint {
            let _ = writeln!(output, "Endpoint = {}", endpoint);
        }

        if let Some(keepalive) = peer.persistent_keepalive {
            let _ = writeln!(output, "PersistentKeepalive = {}", keepalive);
        }
    }

    RenderedConfig {
        text: output,
        has_secret: keys.is_some(),
    }
}

/// Comparison form of a persisted file: the same text minus private key lines
pub fn comparison_form(text: &str) -> String {
    text.lines()
        .filter(|line| line_key(line) != Some(PRIVATE_KEY))
        .fold(String::with_capacity(text.len()), |mut out, line| {
            out.push_str(line);
            out.push('\n');
            out
        })
}

/// Private key stored in the `[Interface]` block of a persisted file
pub fn extract_private_key(text: &str) -> Option<PrivateKey> {
    let mut in_interface = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_interface = trimmed.eq_ignore_ascii_case("[Interface]");
            continue;
        }
        if in_interface && line_key(line) == Some(PRIVATE_KEY) {
            let (_, value) = line.split_once('=')?;
            return PrivateKey::from_base64(value.trim()).ok();
        }
    }
    None
}

/// Drop wg-quick-only keys so the text is accepted by `wg setconf`
pub fn strip_for_setconf(text: &str) -> Zeroizing<String> {
    let mut out = Zeroizing::new(String::with_capacity(text.len()));
    for line in text.lines() {
        if line_key(line).is_some_and(|key| WG_QUICK_ONLY_KEYS.contains(&key)) {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Interface addresses listed in a rendered configuration
pub fn interface_addresses(text: &str) -> Vec<String> {
    let mut in_interface = false;
    let mut addresses = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_interface = trimmed.eq_ignore_ascii_case("[Interface]");
            continue;
        }
        if in_interface && line_key(line) == Some("Address") {
            if let Some((_, value)) = line.split_once('=') {
                addresses.extend(
                    value
                        .split([',', ' '])
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(str::to_string),
                );
            }
        }
    }
    addresses
}

fn line_key(line: &str) -> Option<&str> {
    let (key, _) = line.split_once('=')?;
    Some(key.trim())
}
