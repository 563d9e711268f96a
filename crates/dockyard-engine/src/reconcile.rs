//! The convergence pass.
//!
//! One call to [`Reconciler::apply`] walks the environment in a fixed order:
//! network, proxy, databases, services, sites. It then pushes the routing table
//! to the proxy and registers hostnames. Each step only touches what differs
//! from the declaration, so running it twice in a row changes nothing the
//! second time. There is no rollback: a pass that fails half way is healed by
//! the next one.

use crate::blueprint::{self, SITE_IMAGE_TEMPLATE};
use crate::drift::{self, Drift};
use crate::error::{EntityKind, Error, Operation, Result};
use crate::hosts_sync::HostsUpdater;
use crate::inspector::RuntimeInspector;
use crate::progress::{Action, ApplyEvent, NullProgress, ProgressSink};
use crate::proxy_sync::{self, ProxyClient};
use crate::retry::Backoff;
use crate::runtime::{ContainerHandle, ContainerRuntime, ContainerSpec};
use dockyard_core::config::{Database, Site};
use dockyard_core::{ConfigError, EnvironmentConfig, RoutingTable};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What happens when stopping or removing an entity fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownPolicy {
    /// Log a warning and keep going.
    BestEffort,
    /// Abort the pass.
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Disabling a service.
    pub service_teardown: TeardownPolicy,
    /// Replacing a site that drifted.
    pub site_teardown: TeardownPolicy,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            service_teardown: TeardownPolicy::BestEffort,
            site_teardown: TeardownPolicy::Fatal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Never pull images; creating a container then needs them locally.
    pub skip_pull: bool,
    /// Leave the hosts file alone.
    pub skip_hosts: bool,
    pub policy: ReconcilePolicy,
    /// How long to wait for the proxy to answer.
    pub readiness: Backoff,
    pub site_image_template: String,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            skip_pull: false,
            skip_hosts: false,
            policy: ReconcilePolicy::default(),
            readiness: Backoff::default(),
            site_image_template: SITE_IMAGE_TEMPLATE.to_string(),
        }
    }
}

/// What a pass did to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Created,
    Started,
    Recreated,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityOutcome {
    pub kind: EntityKind,
    pub name: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostsOutcome {
    Skipped,
    Registered(usize),
}

/// Summary of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub environment: String,
    pub entities: Vec<EntityOutcome>,
    /// Table sent to the proxy.
    pub routing: RoutingTable,
    pub hosts: HostsOutcome,
}

impl ApplyReport {
    fn new(environment: &str) -> Self {
        Self {
            environment: environment.to_string(),
            entities: Vec::new(),
            routing: RoutingTable::default(),
            hosts: HostsOutcome::Skipped,
        }
    }

    fn record(&mut self, kind: EntityKind, name: &str, outcome: Outcome) {
        self.entities.push(EntityOutcome {
            kind,
            name: name.to_string(),
            outcome,
        });
    }

    #[must_use]
    pub fn outcome(&self, kind: EntityKind, name: &str) -> Option<Outcome> {
        self.entities
            .iter()
            .find(|e| e.kind == kind && e.name == name)
            .map(|e| e.outcome)
    }

    /// Number of entities that were not already converged.
    #[must_use]
    pub fn changed(&self) -> usize {
        self.entities
            .iter()
            .filter(|e| e.outcome != Outcome::Unchanged)
            .count()
    }
}

/// Drives one environment towards its declaration.
pub struct Reconciler<'a> {
    home: PathBuf,
    runtime: &'a dyn ContainerRuntime,
    proxy: &'a dyn ProxyClient,
    hosts: &'a dyn HostsUpdater,
    progress: &'a dyn ProgressSink,
    options: ApplyOptions,
    cancel: CancellationToken,
}

impl<'a> Reconciler<'a> {
    /// `home` anchors `~` and relative site paths.
    pub fn new(
        home: impl Into<PathBuf>,
        runtime: &'a dyn ContainerRuntime,
        proxy: &'a dyn ProxyClient,
        hosts: &'a dyn HostsUpdater,
    ) -> Self {
        Self {
            home: home.into(),
            runtime,
            proxy,
            hosts,
            progress: &NullProgress,
            options: ApplyOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ApplyOptions) -> Self {
        self.options = options;
        self
    }

    /// Cancelling `cancel` ends the pass before the next entity, or stops
    /// the wait for the proxy.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn check_cancelled(&self, environment: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            warn!(environment, "Apply interrupted");
            return Err(Error::Cancelled {
                environment: environment.to_string(),
            });
        }
        Ok(())
    }

    fn inspector(&self) -> RuntimeInspector<'a> {
        RuntimeInspector::new(self.runtime)
    }

    fn emit(&self, event: ApplyEvent) {
        self.progress.emit(event);
    }

    fn step(&self, kind: EntityKind, name: &str, action: Action) {
        self.emit(ApplyEvent::Step {
            kind,
            name: name.to_string(),
            action,
        });
    }

    fn ready(&self, kind: EntityKind, name: &str) {
        self.emit(ApplyEvent::Ready {
            kind,
            name: name.to_string(),
        });
    }

    /// Converges every entity of `config`, configures the proxy, then the
    /// hosts file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoNetwork`] or [`Error::NoProxy`] before touching
    /// anything if the environment was never initialised. Failures while
    /// converging an entity abort the pass with [`Error::Entity`]. Cancelling
    /// the token returns [`Error::Cancelled`] before the next entity. A
    /// [`Error::HostsSync`] means every container is up and routed.
    pub async fn apply(&self, config: &EnvironmentConfig) -> Result<ApplyReport> {
        let environment = config.name.as_str();
        if environment.is_empty() {
            return Err(ConfigError::NoEnvironment.into());
        }
        info!(environment, "Applying environment");
        let mut report = ApplyReport::new(environment);

        self.emit(ApplyEvent::Phase(EntityKind::Network));
        let network = self
            .inspector()
            .find_network(environment)
            .await?
            .ok_or_else(|| Error::NoNetwork {
                environment: environment.to_string(),
            })?;
        debug!(network_id = %network.id, "Found network");
        self.ready(EntityKind::Network, &network.name);

        self.check_cancelled(environment)?;
        self.emit(ApplyEvent::Phase(EntityKind::Proxy));
        self.converge_proxy(environment, &mut report).await?;

        if !config.databases().is_empty() {
            self.emit(ApplyEvent::Phase(EntityKind::Database));
        }
        for db in config.databases() {
            self.check_cancelled(environment)?;
            self.converge_database(environment, db, &mut report).await?;
        }

        self.check_cancelled(environment)?;
        self.emit(ApplyEvent::Phase(EntityKind::Service));
        self.converge_mailhog(environment, config.services().mailhog, &mut report)
            .await?;

        if !config.sites().is_empty() {
            self.emit(ApplyEvent::Phase(EntityKind::Site));
        }
        let shared_env = config.as_envs();
        for site in config.sites() {
            self.check_cancelled(environment)?;
            self.converge_site(environment, site, &shared_env, &mut report)
                .await?;
        }

        let table = RoutingTable::from_sites(config.sites());
        proxy_sync::sync_routing(self.proxy, &table, &self.options.readiness, &self.cancel)
            .await?;
        self.emit(ApplyEvent::RoutingApplied {
            entries: table.entries().len(),
        });
        report.routing = table;

        if self.options.skip_hosts {
            info!("Skipping the hosts file");
            self.emit(ApplyEvent::HostsSkipped);
        } else {
            let hostnames = config.hostnames();
            self.hosts
                .register(&hostnames)
                .await
                .map_err(|source| Error::HostsSync {
                    environment: environment.to_string(),
                    source,
                })?;
            self.emit(ApplyEvent::HostsRegistered {
                count: hostnames.len(),
            });
            report.hosts = HostsOutcome::Registered(hostnames.len());
        }

        info!(environment, changed = report.changed(), "Environment applied");
        Ok(report)
    }

    async fn converge_proxy(&self, environment: &str, report: &mut ApplyReport) -> Result<()> {
        let proxy = self
            .inspector()
            .find_container(&blueprint::proxy_predicate(environment))
            .await?
            .ok_or_else(|| Error::NoProxy {
                environment: environment.to_string(),
            })?;

        let outcome = match drift::existence(Some(&proxy)) {
            Drift::StoppedMatching => {
                self.start(EntityKind::Proxy, &proxy).await?;
                Outcome::Started
            }
            _ => Outcome::Unchanged,
        };
        report.record(EntityKind::Proxy, &proxy.name, outcome);
        self.ready(EntityKind::Proxy, &proxy.name);
        Ok(())
    }

    async fn converge_database(
        &self,
        environment: &str,
        db: &Database,
        report: &mut ApplyReport,
    ) -> Result<()> {
        let plan = blueprint::database(environment, db)?;
        let name = plan.hostname.as_str();
        self.step(EntityKind::Database, name, Action::Checking);

        let existing = self
            .inspector()
            .find_container(&blueprint::database_predicate(environment, db))
            .await?;

        let outcome = match (drift::existence(existing.as_ref()), existing) {
            (Drift::Absent, _) => {
                debug!(hostname = %name, "Creating database volume");
                self.runtime
                    .create_volume(&plan.volume)
                    .await
                    .map_err(|e| Error::entity(EntityKind::Database, name, Operation::CreateVolume, e))?;
                self.create_and_start(EntityKind::Database, &plan.container)
                    .await?;
                Outcome::Created
            }
            (Drift::StoppedMatching, Some(container)) => {
                self.start(EntityKind::Database, &container).await?;
                Outcome::Started
            }
            _ => Outcome::Unchanged,
        };

        report.record(EntityKind::Database, name, outcome);
        self.ready(EntityKind::Database, name);
        Ok(())
    }

    async fn converge_mailhog(
        &self,
        environment: &str,
        enabled: bool,
        report: &mut ApplyReport,
    ) -> Result<()> {
        let existing = self
            .inspector()
            .find_container(&blueprint::mailhog_predicate(environment))
            .await?;

        if !enabled {
            let Some(container) = existing else {
                return Ok(());
            };
            let removed = self
                .teardown(
                    EntityKind::Service,
                    &container,
                    true,
                    true,
                    self.options.policy.service_teardown,
                )
                .await?;
            if removed {
                report.record(EntityKind::Service, &container.name, Outcome::Removed);
            }
            return Ok(());
        }

        let spec = blueprint::mailhog(environment);
        self.step(EntityKind::Service, &spec.name, Action::Checking);
        let outcome = match (drift::existence(existing.as_ref()), existing) {
            (Drift::Absent, _) => {
                self.create_and_start(EntityKind::Service, &spec).await?;
                Outcome::Created
            }
            (Drift::StoppedMatching, Some(container)) => {
                self.start(EntityKind::Service, &container).await?;
                Outcome::Started
            }
            _ => Outcome::Unchanged,
        };

        report.record(EntityKind::Service, &spec.name, outcome);
        self.ready(EntityKind::Service, &spec.name);
        Ok(())
    }

    async fn converge_site(
        &self,
        environment: &str,
        site: &Site,
        shared_env: &[String],
        report: &mut ApplyReport,
    ) -> Result<()> {
        let spec = blueprint::site(
            environment,
            &self.home,
            site,
            shared_env,
            &self.options.site_image_template,
        );
        let name = spec.name.as_str();
        self.step(EntityKind::Site, name, Action::Checking);

        let inspector = self.inspector();
        let existing = inspector
            .find_container(&blueprint::site_predicate(environment, &site.hostname))
            .await?;
        let details = match &existing {
            Some(container) => Some(inspector.inspect_container(container).await?),
            None => None,
        };

        let (drift, mismatches) = drift::site(&spec, existing.as_ref().zip(details.as_ref()));
        let outcome = match (drift, existing) {
            (Drift::Absent, _) => {
                self.create_and_start(EntityKind::Site, &spec).await?;
                Outcome::Created
            }
            (Drift::StoppedMatching, Some(container)) => {
                self.start(EntityKind::Site, &container).await?;
                Outcome::Started
            }
            (Drift::RunningMismatched, Some(container)) => {
                for reason in &mismatches {
                    info!(hostname = %name, %reason, "Site changed");
                }
                self.step(EntityKind::Site, name, Action::Recreating);
                self.teardown(
                    EntityKind::Site,
                    &container,
                    container.is_running(),
                    false,
                    self.options.policy.site_teardown,
                )
                .await?;
                self.create_and_start(EntityKind::Site, &spec).await?;
                Outcome::Recreated
            }
            _ => Outcome::Unchanged,
        };

        report.record(EntityKind::Site, name, outcome);
        self.ready(EntityKind::Site, name);
        Ok(())
    }

    /// Pull (unless skipped), create, start. A failed start leaves the
    /// created container behind for the next pass to start.
    async fn create_and_start(&self, kind: EntityKind, spec: &ContainerSpec) -> Result<()> {
        let name = spec.name.as_str();

        if self.options.skip_pull {
            debug!(image = %spec.image, "Skipping pull");
        } else {
            self.step(kind, name, Action::Pulling);
            self.runtime
                .pull_image(&spec.image)
                .await
                .map_err(|e| Error::entity(kind, name, Operation::Pull, e))?;
        }

        self.step(kind, name, Action::Creating);
        let id = self
            .runtime
            .create_container(spec)
            .await
            .map_err(|e| Error::entity(kind, name, Operation::Create, e))?;
        debug!(container_id = %id, %kind, entity = %name, "Created container");

        self.step(kind, name, Action::Starting);
        self.runtime
            .start_container(&id)
            .await
            .map_err(|e| Error::entity(kind, name, Operation::Start, e))
    }

    async fn start(&self, kind: EntityKind, container: &ContainerHandle) -> Result<()> {
        self.step(kind, &container.name, Action::Starting);
        self.runtime
            .start_container(&container.id)
            .await
            .map_err(|e| Error::entity(kind, &container.name, Operation::Start, e))
    }

    /// Stop (when `stop` is set) then remove `container`, applying `policy`
    /// to failures. Returns whether the container is gone.
    async fn teardown(
        &self,
        kind: EntityKind,
        container: &ContainerHandle,
        stop: bool,
        remove_volumes: bool,
        policy: TeardownPolicy,
    ) -> Result<bool> {
        let name = container.name.as_str();

        if stop {
            self.step(kind, name, Action::Stopping);
            if let Err(e) = self.runtime.stop_container(&container.id).await {
                self.teardown_failed(policy, Error::entity(kind, name, Operation::Stop, e))?;
            }
        }

        self.step(kind, name, Action::Removing);
        if let Err(e) = self
            .runtime
            .remove_container(&container.id, remove_volumes)
            .await
        {
            self.teardown_failed(policy, Error::entity(kind, name, Operation::Remove, e))?;
            return Ok(false);
        }
        Ok(true)
    }

    fn teardown_failed(&self, policy: TeardownPolicy, err: Error) -> Result<()> {
        match policy {
            TeardownPolicy::Fatal => Err(err),
            TeardownPolicy::BestEffort => {
                let message = std::error::Error::source(&err)
                    .map_or_else(|| err.to_string(), |source| format!("{err}: {source}"));
                warn!(error = %message, "Continuing after teardown failure");
                let name = match &err {
                    Error::Entity { name, .. } => name.clone(),
                    _ => String::new(),
                };
                self.emit(ApplyEvent::Warning { name, message });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = ReconcilePolicy::default();
        assert_eq!(policy.service_teardown, TeardownPolicy::BestEffort);
        assert_eq!(policy.site_teardown, TeardownPolicy::Fatal);
    }

    #[test]
    fn test_report_counts_changes() {
        let mut report = ApplyReport::new("dev");
        report.record(EntityKind::Proxy, "proxy", Outcome::Unchanged);
        report.record(EntityKind::Site, "a.test", Outcome::Created);

        assert_eq!(report.changed(), 1);
        assert_eq!(report.outcome(EntityKind::Site, "a.test"), Some(Outcome::Created));
        assert_eq!(report.outcome(EntityKind::Site, "b.test"), None);
    }
}
