//! Error types for a convergence pass

use crate::hosts_sync::HostsSyncError;
use crate::proxy_sync::ProxySyncError;
use crate::runtime::RuntimeError;
use dockyard_core::ConfigError;
use std::fmt;
use thiserror::Error;

/// Kind of entity being reconciled, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Network,
    Proxy,
    Database,
    Service,
    Site,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Network => "network",
            Self::Proxy => "proxy",
            Self::Database => "database",
            Self::Service => "service",
            Self::Site => "site",
        })
    }
}

/// Runtime operation performed on a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Pull,
    CreateVolume,
    Create,
    Start,
    Stop,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pull => "pull the image for",
            Self::CreateVolume => "create the volume for",
            Self::Create => "create",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Remove => "remove",
        })
    }
}

/// Everything that can abort a convergence pass.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The environment file could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The environment's network does not exist.
    #[error("unable to find the network for environment {environment}")]
    NoNetwork { environment: String },

    /// The environment's proxy container does not exist.
    #[error("unable to find the proxy container for environment {environment}")]
    NoProxy { environment: String },

    /// Listing runtime objects failed.
    #[error("unable to {operation}")]
    Runtime {
        operation: String,
        #[source]
        source: RuntimeError,
    },

    /// Converging one entity failed.
    #[error("unable to {operation} {kind} {name}")]
    Entity {
        kind: EntityKind,
        name: String,
        operation: Operation,
        #[source]
        source: RuntimeError,
    },

    /// The pass was interrupted between two entities.
    #[error("interrupted before {environment} finished converging")]
    Cancelled { environment: String },

    /// The proxy never became ready or rejected the routing table.
    #[error("unable to configure the proxy")]
    RoutingSync(#[from] ProxySyncError),

    /// Containers and proxy are up, but hostnames were not registered locally.
    #[error("{environment} is running, but its hostnames could not be added to the hosts file")]
    HostsSync {
        environment: String,
        #[source]
        source: HostsSyncError,
    },
}

impl Error {
    pub fn runtime(operation: impl Into<String>, source: RuntimeError) -> Self {
        Self::Runtime {
            operation: operation.into(),
            source,
        }
    }

    pub fn entity(
        kind: EntityKind,
        name: impl Into<String>,
        operation: Operation,
        source: RuntimeError,
    ) -> Self {
        Self::Entity {
            kind,
            name: name.into(),
            operation,
            source,
        }
    }

    /// True when every container is already converged and only name
    /// resolution is missing.
    #[must_use]
    pub const fn environment_is_usable(&self) -> bool {
        matches!(self, Self::HostsSync { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
