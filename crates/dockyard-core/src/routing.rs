//! The hostname → upstream table pushed to the proxy.

use crate::config::Site;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Port every site container listens on.
pub const SITE_UPSTREAM_PORT: u16 = 8080;

/// Routing entry for one site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteRoute {
    pub hostname: String,
    /// Every name the proxy answers to, starting with `hostname`.
    pub hosts: Vec<String>,
    pub port: u16,
}

/// Full routing state for an environment, keyed by site hostname.
///
/// Always sent whole; the proxy replaces its state rather than merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingTable {
    pub sites: BTreeMap<String, SiteRoute>,
}

impl RoutingTable {
    #[must_use]
    pub fn from_sites(sites: &[Site]) -> Self {
        let sites = sites
            .iter()
            .map(|site| {
                let route = SiteRoute {
                    hostname: site.hostname.clone(),
                    hosts: site.hostnames(),
                    port: SITE_UPSTREAM_PORT,
                };
                (site.hostname.clone(), route)
            })
            .collect();

        Self { sites }
    }

    /// Flattened `(host, port)` pairs, one per hostname or alias.
    #[must_use]
    pub fn entries(&self) -> Vec<(&str, u16)> {
        self.sites
            .values()
            .flat_map(|route| route.hosts.iter().map(|h| (h.as_str(), route.port)))
            .collect()
    }
}
