//! In-memory runtime, proxy and hosts updater that record every call.

#![allow(dead_code)]

use async_trait::async_trait;
use dockyard_core::config::{Database, DatabaseEngine, Services, Site};
use dockyard_core::{EnvironmentConfig, LabelPredicate, RoutingTable, labels};
use dockyard_engine::hosts_sync::{HostsSyncError, HostsUpdater};
use dockyard_engine::proxy_sync::{ProxyClient, ProxySyncError};
use dockyard_engine::retry::Backoff;
use dockyard_engine::runtime::{
    BindMount, ContainerDetails, ContainerHandle, ContainerRuntime, ContainerSpec, ContainerState, MountKind,
    NetworkHandle, RuntimeError, VolumeSpec,
};
use dockyard_engine::ApplyOptions;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

pub const ENV: &str = "dockyard-dev";
pub const HOME: &str = "/home/dev";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListNetworks,
    ListContainers(Vec<String>),
    Inspect(String),
    Pull(String),
    CreateVolume(String),
    Create(String),
    Start(String),
    Stop(String),
    Remove { name: String, volumes: bool },
}

impl Call {
    /// True for calls that change runtime state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::ListNetworks | Self::ListContainers(_) | Self::Inspect(_))
    }
}

#[derive(Debug, Clone)]
struct Container {
    id: String,
    spec: ContainerSpec,
    running: bool,
}

#[derive(Default)]
struct State {
    networks: Vec<(NetworkHandle, BTreeMap<String, String>)>,
    containers: Vec<Container>,
    volumes: Vec<String>,
    calls: Vec<Call>,
    next_id: u32,
    /// `(operation, container name)` pairs that fail.
    failures: Vec<(&'static str, String)>,
}

#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

impl FakeRuntime {
    /// A runtime holding the environment's network and a running proxy.
    pub fn initialised() -> Self {
        let runtime = Self::default();
        runtime.add_network(ENV);
        runtime.add_container(
            ContainerSpec {
                name: format!("{ENV}-proxy"),
                image: "docker.io/dockyard/proxy:latest".to_string(),
                labels: BTreeMap::from([(labels::PROXY.to_string(), ENV.to_string())]),
                env: Vec::new(),
                mounts: Vec::new(),
                ports: Vec::new(),
                extra_hosts: Vec::new(),
                network: ENV.to_string(),
            },
            true,
        );
        runtime
    }

    pub fn add_network(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        let id = format!("net-{name}");
        state.networks.push((
            NetworkHandle {
                id,
                name: name.to_string(),
            },
            LabelPredicate::environment(name).labels().clone(),
        ));
    }

    pub fn add_container(&self, spec: ContainerSpec, running: bool) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("c{}", state.next_id);
        state.containers.push(Container { id, spec, running });
    }

    pub fn fail(&self, operation: &'static str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .push((operation, name.to_string()));
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    pub fn set_running(&self, name: &str, running: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some(c) = state.containers.iter_mut().find(|c| c.spec.name == name) {
            c.running = running;
        }
    }

    /// Rewrites a stored container as if it had been created differently.
    pub fn edit(&self, name: &str, edit: impl FnOnce(&mut ContainerSpec)) {
        let mut state = self.state.lock().unwrap();
        if let Some(c) = state.containers.iter_mut().find(|c| c.spec.name == name) {
            edit(&mut c.spec);
        }
    }

    pub fn container(&self, name: &str) -> Option<(ContainerSpec, bool)> {
        self.state
            .lock()
            .unwrap()
            .containers
            .iter()
            .find(|c| c.spec.name == name)
            .map(|c| (c.spec.clone(), c.running))
    }

    pub fn container_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .containers
            .iter()
            .map(|c| c.spec.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn volumes(&self) -> Vec<String> {
        self.state.lock().unwrap().volumes.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn check(state: &State, operation: &'static str, name: &str) -> Result<(), RuntimeError> {
        if state
            .failures
            .iter()
            .any(|(op, n)| *op == operation && n == name)
        {
            return Err(RuntimeError::Other(format!("injected {operation} failure")));
        }
        Ok(())
    }

    fn name_of(state: &State, id: &str) -> Result<String, RuntimeError> {
        state
            .containers
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.spec.name.clone())
            .ok_or_else(|| RuntimeError::Other(format!("no such container: {id}")))
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_networks(
        &self,
        predicate: &LabelPredicate,
    ) -> Result<Vec<NetworkHandle>, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListNetworks);
        Ok(state
            .networks
            .iter()
            .filter(|(_, labels)| predicate.matches(labels))
            .map(|(network, _)| network.clone())
            .collect())
    }

    async fn list_containers(
        &self,
        predicate: &LabelPredicate,
    ) -> Result<Vec<ContainerHandle>, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListContainers(predicate.to_filters()));
        // Reverse insertion order, like a runtime listing newest first.
        Ok(state
            .containers
            .iter()
            .rev()
            .filter(|c| predicate.matches(&c.spec.labels))
            .map(|c| ContainerHandle {
                id: c.id.clone(),
                name: c.spec.name.clone(),
                state: if c.running {
                    ContainerState::Running
                } else {
                    ContainerState::Stopped
                },
                labels: c.spec.labels.clone(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        let name = Self::name_of(&state, id)?;
        state.calls.push(Call::Inspect(name));
        let container = state
            .containers
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| RuntimeError::Other(format!("no such container: {id}")))?;

        Ok(ContainerDetails {
            image: container.spec.image.clone(),
            binds: container
                .spec
                .mounts
                .iter()
                .filter(|m| m.kind == MountKind::Bind)
                .map(|m| BindMount {
                    source: PathBuf::from(&m.source),
                    target: m.target.clone(),
                })
                .collect(),
            // Images contribute their own variables.
            env: std::iter::once("PATH=/usr/local/bin:/usr/bin".to_string())
                .chain(container.spec.env.iter().cloned())
                .collect(),
            extra_hosts: container.spec.extra_hosts.clone(),
        })
    }

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Pull(image.to_string()));
        Self::check(&state, "pull", image)
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateVolume(spec.name.clone()));
        if !state.volumes.contains(&spec.name) {
            state.volumes.push(spec.name.clone());
        }
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create(spec.name.clone()));
        Self::check(&state, "create", &spec.name)?;
        if state.containers.iter().any(|c| c.spec.name == spec.name) {
            return Err(RuntimeError::Other(format!(
                "the container name {} is already in use",
                spec.name
            )));
        }

        state.next_id += 1;
        let id = format!("c{}", state.next_id);
        state.containers.push(Container {
            id: id.clone(),
            spec: spec.clone(),
            running: false,
        });
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        let name = Self::name_of(&state, id)?;
        state.calls.push(Call::Start(name.clone()));
        Self::check(&state, "start", &name)?;
        if let Some(c) = state.containers.iter_mut().find(|c| c.id == id) {
            c.running = true;
        }
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        let name = Self::name_of(&state, id)?;
        state.calls.push(Call::Stop(name.clone()));
        Self::check(&state, "stop", &name)?;
        if let Some(c) = state.containers.iter_mut().find(|c| c.id == id) {
            c.running = false;
        }
        Ok(())
    }

    async fn remove_container(&self, id: &str, remove_volumes: bool) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        let name = Self::name_of(&state, id)?;
        state.calls.push(Call::Remove {
            name: name.clone(),
            volumes: remove_volumes,
        });
        Self::check(&state, "remove", &name)?;
        state.containers.retain(|c| c.id != id);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyCall {
    Ping,
    Apply(RoutingTable),
}

/// Proxy that fails the first `unready_pings` pings.
#[derive(Default)]
pub struct FakeProxy {
    unready_pings: Mutex<u32>,
    reject_apply: bool,
    calls: Mutex<Vec<ProxyCall>>,
}

impl FakeProxy {
    pub fn unready_for(pings: u32) -> Self {
        Self {
            unready_pings: Mutex::new(pings),
            ..Self::default()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject_apply: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ProxyCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn applied(&self) -> Vec<RoutingTable> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ProxyCall::Apply(table) => Some(table),
                ProxyCall::Ping => None,
            })
            .collect()
    }
}

#[async_trait]
impl ProxyClient for FakeProxy {
    async fn ping(&self) -> Result<(), ProxySyncError> {
        self.calls.lock().unwrap().push(ProxyCall::Ping);
        let mut unready = self.unready_pings.lock().unwrap();
        if *unready > 0 {
            *unready -= 1;
            return Err(ProxySyncError::Rejected("starting".to_string()));
        }
        Ok(())
    }

    async fn apply(&self, table: &RoutingTable) -> Result<(), ProxySyncError> {
        self.calls
            .lock()
            .unwrap()
            .push(ProxyCall::Apply(table.clone()));
        if self.reject_apply {
            return Err(ProxySyncError::Rejected("invalid table".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeHosts {
    fail: bool,
    registered: Mutex<Vec<Vec<String>>>,
}

impl FakeHosts {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn registered(&self) -> Vec<Vec<String>> {
        self.registered.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostsUpdater for FakeHosts {
    async fn register(&self, hostnames: &[String]) -> Result<(), HostsSyncError> {
        self.registered.lock().unwrap().push(hostnames.to_vec());
        if self.fail {
            return Err(HostsSyncError::Helper("sudo: a password is required".to_string()));
        }
        Ok(())
    }
}

pub fn site(hostname: &str, aliases: &[&str]) -> Site {
    Site {
        hostname: hostname.to_string(),
        aliases: aliases.iter().map(ToString::to_string).collect(),
        version: "8.0".to_string(),
        path: format!("~/sites/{hostname}"),
        ..Site::default()
    }
}

pub fn postgres() -> Database {
    Database {
        engine: DatabaseEngine::Postgres,
        version: "13".to_string(),
        port: "5432".to_string(),
    }
}

/// Two sites, one database, mail capture on.
pub fn environment() -> EnvironmentConfig {
    EnvironmentConfig {
        name: ENV.to_string(),
        databases: vec![postgres()],
        services: Services { mailhog: true },
        sites: vec![site("a.test", &["www.a.test"]), site("b.test", &[])],
        ..EnvironmentConfig::default()
    }
}

pub fn options() -> ApplyOptions {
    ApplyOptions {
        readiness: Backoff {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
            deadline: Duration::from_millis(500),
        },
        ..ApplyOptions::default()
    }
}
