//! Registering site hostnames in the local hosts file.

use async_trait::async_trait;
use dockyard_utils::privileged;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum HostsSyncError {
    #[error("editing the hosts file is not supported on this platform")]
    Unsupported,

    #[error("{0}")]
    Helper(String),
}

#[async_trait]
pub trait HostsUpdater: Send + Sync {
    /// Makes `hostnames` resolve to the loopback address.
    async fn register(&self, hostnames: &[String]) -> Result<(), HostsSyncError>;
}

/// Re-runs `exe hosts --hostnames=...` as root.
#[derive(Debug, Clone)]
pub struct PrivilegedHostsUpdater {
    exe: PathBuf,
}

impl PrivilegedHostsUpdater {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }

    /// Uses the running executable as the helper.
    ///
    /// # Errors
    ///
    /// Returns [`HostsSyncError::Helper`] if the executable cannot be located.
    pub fn current() -> Result<Self, HostsSyncError> {
        privileged::current_exe()
            .map(Self::new)
            .map_err(|e| HostsSyncError::Helper(format!("{e:#}")))
    }
}

#[async_trait]
impl HostsUpdater for PrivilegedHostsUpdater {
    async fn register(&self, hostnames: &[String]) -> Result<(), HostsSyncError> {
        if cfg!(windows) {
            return Err(HostsSyncError::Unsupported);
        }

        info!(count = hostnames.len(), "Adding hostnames to the hosts file");
        privileged::run(&self.exe, &privileged::hosts_args(hostnames))
            .await
            .map_err(|e| HostsSyncError::Helper(format!("{e:#}")))
    }
}
