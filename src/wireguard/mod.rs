//! WireGuard key material and configuration rendering
//!
//! This module handles x25519 key generation and the wg-quick configuration
//! text format used both for drift detection and for the persisted file.

mod keys;
pub mod render;

pub use keys::{KeyGenerator, KeyPair, OsKeyGenerator, PrivateKey, PublicKey, ENCODED_KEY_LEN};
pub use render::{render, RenderedConfig};

#[cfg(test)]
pub use keys::MockKeyGenerator;
