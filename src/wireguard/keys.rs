//! WireGuard key management
//!
//! This module handles generation and encoding of WireGuard x25519 keys.
//! Private key material is zeroized on drop and never rendered by `Debug`
//! or `Display`.

use crate::error::{ConvergeError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use std::fmt;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Length of a base64-encoded WireGuard key
pub const ENCODED_KEY_LEN: usize = 44;

/// WireGuard private key (32 bytes, x25519)
#[derive(Clone)]
pub struct PrivateKey {
    secret: Zeroizing<[u8; 32]>,
}

impl PrivateKey {
    /// Create a private key from raw bytes, clamped the way `wg genkey` does
    pub fn from_bytes(mut bytes: [u8; 32]) -> Self {
        bytes[0] &= 248;
        bytes[31] &= 127;
        bytes[31] |= 64;
        Self {
            secret: Zeroizing::new(bytes),
        }
    }

    /// Parse a private key from base64-encoded string
    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = decode_key(s, "private")?;
        Ok(Self::from_bytes(*bytes))
    }

    /// Convert to base64-encoded string
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(BASE64.encode(*self.secret))
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> PublicKey {
        let secret = StaticSecret::from(*self.secret);
        let public = X25519PublicKey::from(&secret);
        PublicKey {
            key: public.to_bytes(),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

// Ensure private keys are never accidentally logged
impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// WireGuard public key (32 bytes, x25519)
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    key: [u8; 32],
}

impl PublicKey {
    /// Create a public key from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { key: bytes }
    }

    /// Parse a public key from base64-encoded string
    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = decode_key(s, "public")?;
        Ok(Self::from_bytes(*bytes))
    }

    /// Convert to base64-encoded string
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.key)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

/// WireGuard key pair (private + public)
#[derive(Clone)]
pub struct KeyPair {
    /// Private key
    pub private: PrivateKey,
    /// Public key (derived from private)
    pub public: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair from the OS entropy source
    pub fn generate() -> Result<Self> {
        let mut bytes = Zeroizing::new([0u8; 32]);
        rand::rngs::OsRng
            .try_fill_bytes(&mut bytes[..])
            .map_err(|e| ConvergeError::KeyGeneration(format!("OS entropy source failed: {}", e)))?;
        Ok(Self::from_private(PrivateKey::from_bytes(*bytes)))
    }

    /// Create a key pair from a private key
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private", &"[REDACTED]")
            .field("public", &self.public)
            .finish()
    }
}

/// Source of fresh key pairs
#[cfg_attr(test, mockall::automock)]
pub trait KeyGenerator {
    /// Generate a new key pair
    fn generate(&self) -> Result<KeyPair>;
}

/// Key generator backed by the operating system's CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsKeyGenerator;

impl KeyGenerator for OsKeyGenerator {
    fn generate(&self) -> Result<KeyPair> {
        KeyPair::generate()
    }
}

fn decode_key(s: &str, which: &str) -> Result<Zeroizing<[u8; 32]>> {
    let decoded = Zeroizing::new(BASE64.decode(s.trim()).map_err(|e| {
        ConvergeError::Validation(format!("Invalid base64 {} key: {}", which, e))
    })?);

    if decoded.len() != 32 {
        return Err(ConvergeError::Validation(format!(
            "Invalid {} key length: expected 32 bytes, got {}",
            which,
            decoded.len()
        )));
    }

    let mut bytes = Zeroizing::new([0u8; 32]);
    bytes.copy_from_slice(&decoded);
    Ok(bytes)
}
