//! Shared types for dockyard: the desired-state model, runtime labels, the
//! routing table and the proxy control protocol.

pub mod config;
pub use config::{ConfigError, EnvironmentConfig};
pub mod hosts;
pub use hosts::HostsFileSection;
pub mod ipc;
pub use ipc::{ProxyRequest, ProxyResponse};
pub mod labels;
pub use labels::LabelPredicate;
pub mod routing;
pub use routing::RoutingTable;
