//! Convergence engine for dockyard environments.
//!
//! [`Reconciler`] compares an [`EnvironmentConfig`](dockyard_core::EnvironmentConfig)
//! with what the container runtime reports and makes the minimum set of
//! changes, then configures the proxy and the hosts file.

pub mod blueprint;
pub mod config_loader;
pub mod drift;
pub mod error;
pub mod hosts_sync;
pub mod inspector;
pub mod progress;
pub mod proxy_sync;
pub mod reconcile;
pub mod retry;
pub mod runtime;

pub use error::{EntityKind, Error, Operation, Result};
pub use hosts_sync::{HostsSyncError, HostsUpdater, PrivilegedHostsUpdater};
pub use inspector::RuntimeInspector;
pub use progress::{Action, ApplyEvent, NullProgress, ProgressSink};
pub use proxy_sync::{ProxyClient, ProxySyncError, TcpProxyClient};
pub use reconcile::{
    ApplyOptions, ApplyReport, HostsOutcome, Outcome, ReconcilePolicy, Reconciler, TeardownPolicy,
};
pub use runtime::{ContainerRuntime, DockerRuntime, RuntimeError};
