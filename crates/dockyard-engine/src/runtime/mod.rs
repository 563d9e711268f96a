//! The container runtime boundary.
//!
//! [`ContainerRuntime`] is the narrow set of calls the convergence engine makes
//! against Docker. Everything above this module works with the plain types
//! defined here, never with `bollard` models.

pub mod docker;

pub use docker::DockerRuntime;

use async_trait::async_trait;
use dockyard_core::LabelPredicate;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Docker(#[from] bollard::errors::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkHandle {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    /// Created, exited, paused, or anything else that is not serving.
    Stopped,
}

impl ContainerState {
    #[must_use]
    pub fn from_docker(state: &str) -> Self {
        if state.eq_ignore_ascii_case("running") {
            Self::Running
        } else {
            Self::Stopped
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    /// Name without Docker's leading `/`.
    pub name: String,
    pub state: ContainerState,
    pub labels: BTreeMap<String, String>,
}

impl ContainerHandle {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }
}

/// The parts of `docker inspect` drift detection looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerDetails {
    pub image: String,
    pub binds: Vec<BindMount>,
    pub env: Vec<String>,
    pub extra_hosts: Vec<String>,
}

/// A bind mount as the runtime reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    /// Path on the host.
    pub source: PathBuf,
    /// Path inside the container.
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    Bind,
    Volume,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub kind: MountKind,
    /// Host path for binds, volume name for volumes.
    pub source: String,
    pub target: String,
}

/// A TCP port published on the loopback interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub container_port: String,
    pub host_port: String,
}

impl PortSpec {
    #[must_use]
    pub fn same(port: &str) -> Self {
        Self {
            container_port: port.to_string(),
            host_port: port.to_string(),
        }
    }
}

/// Everything needed to create one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub labels: BTreeMap<String, String>,
    pub env: Vec<String>,
    pub mounts: Vec<MountSpec>,
    pub ports: Vec<PortSpec>,
    /// `host:ip` entries added to the container's `/etc/hosts`.
    pub extra_hosts: Vec<String>,
    /// Network the container joins.
    pub network: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

/// Calls the convergence engine makes against the container runtime.
///
/// Implementations must not retry; callers re-run the whole pass instead.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn list_networks(
        &self,
        predicate: &LabelPredicate,
    ) -> Result<Vec<NetworkHandle>, RuntimeError>;

    /// Containers in any state whose labels satisfy `predicate`.
    async fn list_containers(
        &self,
        predicate: &LabelPredicate,
    ) -> Result<Vec<ContainerHandle>, RuntimeError>;

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError>;

    /// Pulls `image`, draining the progress stream before returning.
    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError>;

    async fn create_volume(&self, spec: &VolumeSpec) -> Result<(), RuntimeError>;

    /// Creates (but does not start) a container, returning its id.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Stopping a container that is not running succeeds.
    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn remove_container(&self, id: &str, remove_volumes: bool) -> Result<(), RuntimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_docker() {
        assert_eq!(ContainerState::from_docker("running"), ContainerState::Running);
        assert_eq!(ContainerState::from_docker("exited"), ContainerState::Stopped);
        assert_eq!(ContainerState::from_docker("created"), ContainerState::Stopped);
    }
}
