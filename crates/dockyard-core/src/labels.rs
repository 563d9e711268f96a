//! Label keys stamped on runtime objects and the predicates used to find them.
//!
//! Every object dockyard creates is re-discovered by label equality, never by
//! name alone.

use std::collections::BTreeMap;

/// Marks an object as managed by dockyard.
pub const MANAGED: &str = "dev.dockyard";
/// Environment the object belongs to.
pub const ENVIRONMENT: &str = "dev.dockyard.environment";
/// Kind of container (`database`, `mailhog`, ...).
pub const TYPE: &str = "dev.dockyard.type";
/// Identifies the proxy container of an environment; the value is the environment name.
pub const PROXY: &str = "dev.dockyard.proxy";
/// Site hostname.
pub const HOST: &str = "dev.dockyard.host";
pub const DATABASE_ENGINE: &str = "dev.dockyard.database-engine";
pub const DATABASE_VERSION: &str = "dev.dockyard.database-version";
pub const DATABASE_PORT: &str = "dev.dockyard.database-port";
/// Wire-compatible database family (`mysql` or `postgres`).
pub const DATABASE_COMPATIBILITY: &str = "dev.dockyard.database-compatibility";

pub const TYPE_DATABASE: &str = "database";
pub const TYPE_MAILHOG: &str = "mailhog";
pub const TYPE_SITE: &str = "site";

/// An immutable conjunction of `key=value` label constraints.
///
/// Predicates are values: extending one returns a new predicate and leaves the
/// original untouched, so a base predicate can be shared across iterations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPredicate {
    labels: BTreeMap<String, String>,
}

impl LabelPredicate {
    /// Matches every object of `environment`.
    #[must_use]
    pub fn environment(environment: &str) -> Self {
        Self::default().with(ENVIRONMENT, environment)
    }

    /// Returns a copy with one more constraint.
    #[must_use]
    pub fn with(&self, key: &str, value: &str) -> Self {
        let mut labels = self.labels.clone();
        labels.insert(key.to_string(), value.to_string());
        Self { labels }
    }

    /// True if every constraint is satisfied by `labels`.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.labels
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|actual| actual == v))
    }

    /// `key=value` strings in the form the runtime's `label` filter expects.
    #[must_use]
    pub fn to_filters(&self) -> Vec<String> {
        self.labels.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    #[must_use]
    pub const fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }
}
