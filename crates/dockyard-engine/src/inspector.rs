//! Label-based lookups of runtime objects.

use crate::error::{Error, Result};
use crate::runtime::{ContainerDetails, ContainerHandle, ContainerRuntime, NetworkHandle};
use dockyard_core::LabelPredicate;
use tracing::debug;

/// Read-only queries against the runtime.
///
/// Failures are returned as-is; nothing here retries.
#[derive(Clone, Copy)]
pub struct RuntimeInspector<'a> {
    runtime: &'a dyn ContainerRuntime,
}

impl<'a> RuntimeInspector<'a> {
    #[must_use]
    pub fn new(runtime: &'a dyn ContainerRuntime) -> Self {
        Self { runtime }
    }

    /// The network labelled for `environment` and named after it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] if the runtime cannot be queried.
    pub async fn find_network(&self, environment: &str) -> Result<Option<NetworkHandle>> {
        let networks = self
            .runtime
            .list_networks(&LabelPredicate::environment(environment))
            .await
            .map_err(|e| Error::runtime("list docker networks", e))?;

        Ok(networks.into_iter().find(|n| n.name == environment))
    }

    /// Containers matching `predicate`, sorted by name.
    ///
    /// The runtime returns them in no particular order; sorting keeps
    /// user-facing iteration deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] if the runtime cannot be queried.
    pub async fn find_containers(&self, predicate: &LabelPredicate) -> Result<Vec<ContainerHandle>> {
        let mut containers = self
            .runtime
            .list_containers(predicate)
            .await
            .map_err(|e| Error::runtime("list the containers", e))?;

        containers.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(
            filters = ?predicate.to_filters(),
            found = containers.len(),
            "Listed containers"
        );
        Ok(containers)
    }

    /// The first container matching `predicate`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] if the runtime cannot be queried.
    pub async fn find_container(&self, predicate: &LabelPredicate) -> Result<Option<ContainerHandle>> {
        let containers = self.find_containers(predicate).await?;
        if containers.len() > 1 {
            tracing::warn!(
                filters = ?predicate.to_filters(),
                count = containers.len(),
                "More than one container matches; using {}",
                containers[0].name
            );
        }
        Ok(containers.into_iter().next())
    }

    /// Every container belonging to `environment`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] if the runtime cannot be queried.
    pub async fn environment_containers(&self, environment: &str) -> Result<Vec<ContainerHandle>> {
        self.find_containers(&LabelPredicate::environment(environment))
            .await
    }

    /// Image, mounts, env and extra hosts of `container`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] if the container cannot be inspected.
    pub async fn inspect_container(&self, container: &ContainerHandle) -> Result<ContainerDetails> {
        self.runtime
            .inspect_container(&container.id)
            .await
            .map_err(|e| Error::runtime(format!("inspect container {}", container.name), e))
    }
}
