use super::{
    BindMount, ContainerDetails, ContainerHandle, ContainerRuntime, ContainerSpec, ContainerState,
    MountKind, NetworkHandle, RuntimeError, VolumeSpec,
};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{
    ContainerCreateBody, HostConfig, Mount, MountPointTypeEnum, MountTypeEnum, PortBinding,
    VolumeCreateOptions,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, ListContainersOptions,
    ListNetworksOptions, RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use dockyard_core::LabelPredicate;
use futures_util::TryStreamExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// [`ContainerRuntime`] backed by the local Docker daemon.
#[derive(Clone, Debug)]
pub struct DockerRuntime {
    client: Arc<Docker>,
}

impl DockerRuntime {
    #[must_use]
    pub fn new(client: Arc<Docker>) -> Self {
        Self { client }
    }

    /// Connects using `DOCKER_HOST` or the platform's default socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection parameters are invalid. No request is
    /// made until the first call.
    pub fn connect() -> Result<Self, RuntimeError> {
        let client = Docker::connect_with_local_defaults()?;
        Ok(Self::new(Arc::new(client)))
    }
}

fn label_filters(predicate: &LabelPredicate) -> HashMap<String, Vec<String>> {
    HashMap::from([("label".to_string(), predicate.to_filters())])
}

fn port_key(port: &str) -> String {
    format!("{port}/tcp")
}

fn create_body(spec: &ContainerSpec) -> ContainerCreateBody {
    let mounts = spec
        .mounts
        .iter()
        .map(|m| Mount {
            typ: Some(match m.kind {
                MountKind::Bind => MountTypeEnum::BIND,
                MountKind::Volume => MountTypeEnum::VOLUME,
            }),
            source: Some(m.source.clone()),
            target: Some(m.target.clone()),
            ..Default::default()
        })
        .collect();

    let port_bindings = spec
        .ports
        .iter()
        .map(|p| {
            (
                port_key(&p.container_port),
                Some(vec![PortBinding {
                    host_ip: Some("127.0.0.1".to_string()),
                    host_port: Some(p.host_port.clone()),
                }]),
            )
        })
        .collect();

    let exposed_ports = spec
        .ports
        .iter()
        .map(|p| (port_key(&p.container_port), HashMap::new()))
        .collect::<HashMap<_, _>>();

    let host_config = HostConfig {
        mounts: Some(mounts),
        port_bindings: Some(port_bindings),
        extra_hosts: (!spec.extra_hosts.is_empty()).then(|| spec.extra_hosts.clone()),
        network_mode: Some(spec.network.clone()),
        ..Default::default()
    };

    ContainerCreateBody {
        image: Some(spec.image.clone()),
        labels: Some(
            spec.labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        env: Some(spec.env.clone()),
        exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
        host_config: Some(host_config),
        ..Default::default()
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_networks(
        &self,
        predicate: &LabelPredicate,
    ) -> Result<Vec<NetworkHandle>, RuntimeError> {
        let networks = self
            .client
            .list_networks(Some(ListNetworksOptions {
                filters: Some(label_filters(predicate)),
                ..Default::default()
            }))
            .await?;

        Ok(networks
            .into_iter()
            .map(|n| NetworkHandle {
                id: n.id.unwrap_or_default(),
                name: n.name.unwrap_or_default(),
            })
            .collect())
    }

    async fn list_containers(
        &self,
        predicate: &LabelPredicate,
    ) -> Result<Vec<ContainerHandle>, RuntimeError> {
        let containers = self
            .client
            .list_containers(Some(ListContainersOptions {
                all: true,
                filters: Some(label_filters(predicate)),
                ..Default::default()
            }))
            .await?;

        Ok(containers
            .into_iter()
            .map(|c| {
                let name = c
                    .names
                    .and_then(|names| names.into_iter().next())
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default();
                let state = c
                    .state
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();

                ContainerHandle {
                    id: c.id.unwrap_or_default(),
                    name,
                    state: ContainerState::from_docker(&state),
                    labels: c.labels.unwrap_or_default().into_iter().collect(),
                }
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        let inspect = self
            .client
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;

        let (image, env) = inspect
            .config
            .map(|c| (c.image.unwrap_or_default(), c.env.unwrap_or_default()))
            .unwrap_or_default();

        let binds = inspect
            .mounts
            .unwrap_or_default()
            .into_iter()
            .filter(|m| m.typ == Some(MountPointTypeEnum::BIND))
            .filter_map(|m| {
                Some(BindMount {
                    source: PathBuf::from(m.source?),
                    target: m.destination?,
                })
            })
            .collect();

        let extra_hosts = inspect
            .host_config
            .and_then(|h| h.extra_hosts)
            .unwrap_or_default();

        Ok(ContainerDetails {
            image,
            binds,
            env,
            extra_hosts,
        })
    }

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        info!("Pulling image {}", image);
        let options = CreateImageOptions {
            from_image: Some(image.to_string()),
            ..Default::default()
        };

        let mut stream = self.client.create_image(Some(options), None, None);
        let mut layers = 0usize;
        while stream.try_next().await?.is_some() {
            layers += 1;
        }
        debug!(image, events = layers, "Image pull finished");
        Ok(())
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> Result<(), RuntimeError> {
        self.client
            .create_volume(VolumeCreateOptions {
                name: Some(spec.name.clone()),
                driver: Some("local".to_string()),
                labels: Some(
                    spec.labels
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                ),
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let response = self
            .client
            .create_container(
                Some(CreateContainerOptions {
                    name: Some(spec.name.clone()),
                    ..Default::default()
                }),
                create_body(spec),
            )
            .await?;

        for warning in &response.warnings {
            debug!(container = %spec.name, "Docker warning: {}", warning);
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.client
            .start_container(id, None::<StartContainerOptions>)
            .await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        info!("Stopping Docker container {}", id);
        match self
            .client
            .stop_container(id, None::<StopContainerOptions>)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_not_modified(&e) => {
                debug!(container_id = %id, "Container was already stopped");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_container(&self, id: &str, remove_volumes: bool) -> Result<(), RuntimeError> {
        info!("Removing Docker container {}", id);
        self.client
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    v: remove_volumes,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }
}

/// Docker answers 304 when the container is already in the requested state.
fn is_not_modified(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 304,
            ..
        }
    )
}
