//! Security hardening
//!
//! - Owner-only permissions on files holding key material
//! - Privilege detection before touching the host

mod permissions;
mod privileges;

pub use permissions::{set_secure_permissions, warn_if_exposed, SecureFileMode};
pub use privileges::PrivilegeLevel;
