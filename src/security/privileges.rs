//! Privilege detection
//!
//! Creating interfaces and writing under `/etc/wireguard` needs root (or
//! CAP_NET_ADMIN plus write access). The binary checks up front so a run
//! without privileges fails with a clear warning rather than a cryptic
//! command error.

/// Privilege level of the current process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeLevel {
    /// Running as root
    Root,
    /// Running as regular user
    User,
    /// Unknown privilege level
    Unknown,
}

impl PrivilegeLevel {
    /// Detect current privilege level
    pub fn detect() -> Self {
        #[cfg(unix)]
        {
            let uid = unsafe { libc::getuid() };
            let euid = unsafe { libc::geteuid() };

            if uid == 0 || euid == 0 {
                return Self::Root;
            }
            Self::User
        }

        #[cfg(not(unix))]
        {
            Self::Unknown
        }
    }

    /// Check if elevated
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Root)
    }
}

impl std::fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::User => write!(f, "user"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
