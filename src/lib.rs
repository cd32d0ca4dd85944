//! wg-converge: idempotent WireGuard interface reconciliation
//!
//! This library converges one WireGuard interface onto a declared state:
//! it compares the desired configuration with the live interface and its
//! persisted file, then creates, updates, deletes, or leaves it alone.
//!
//! # Architecture
//!
//! Every invocation is a single-shot convergence driven by an automation
//! caller. The caller's request is normalized once into a typed spec, and the
//! reconciler reaches the host only through collaborator traits, so the
//! whole decision path is testable without root.
//!
//! # Modules
//!
//! - `config`: Tool settings and the caller's request format
//! - `spec`: Validated interface and peer specifications
//! - `wireguard`: Keys and configuration rendering
//! - `reconcile`: State probing, planning, and execution
//! - `platform`: Tunnel control through `wg` and `ip`
//! - `storage`: Atomic file persistence
//! - `security`: File permissions and privilege detection
//! - `error`: Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod platform;
pub mod reconcile;
pub mod security;
pub mod spec;
pub mod storage;
pub mod wireguard;

// Re-export commonly used types
pub use error::{ConvergeError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
