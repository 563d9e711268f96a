//! Declarative description of one dockyard environment.
//!
//! An environment is loaded from `~/.dockyard/<name>.yaml` and is treated as
//! read-only by the convergence engine.
//!
//! # Example
//! ```yaml
//! databases:
//!   - engine: postgres
//!     version: "15"
//!     port: "5432"
//! services:
//!   mailhog: true
//! sites:
//!   - hostname: app.test
//!     aliases: [www.app.test]
//!     php: "8.2"
//!     path: ~/dev/app
//! ```

pub mod paths;
pub mod runtime;

pub use runtime::{Blackfire, RuntimeSettings};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while reading or validating an environment file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No environment name was provided.
    #[error("missing the environment name")]
    NoEnvironment,

    /// The environment file does not exist.
    #[error("there is no config file for the environment at {}", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but could not be read.
    #[error("unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for an environment.
    #[error("unable to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The file parsed but describes an impossible environment.
    #[error("invalid environment config: {0}")]
    Invalid(String),
}

/// Root configuration for an environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentConfig {
    /// Environment name. Not part of the file; filled in by the loader.
    #[serde(skip)]
    pub name: String,

    /// Language-runtime settings shared by every site.
    #[serde(default, rename = "php")]
    pub runtime: RuntimeSettings,

    #[serde(default, skip_serializing_if = "Blackfire::is_empty")]
    pub blackfire: Blackfire,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<Database>,

    #[serde(default)]
    pub services: Services,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sites: Vec<Site>,
}

/// Optional auxiliary services, each toggled by a flag.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Services {
    /// Outbound mail capture.
    #[serde(default)]
    pub mailhog: bool,
}

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    Mysql,
    Mariadb,
    Postgres,
}

impl DatabaseEngine {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Mariadb => "mariadb",
            Self::Postgres => "postgres",
        }
    }

    /// The wire-compatible family, used when importing backups.
    #[must_use]
    pub const fn compatibility(self) -> &'static str {
        match self {
            Self::Mysql | Self::Mariadb => "mysql",
            Self::Postgres => "postgres",
        }
    }
}

impl std::fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A database container declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    pub engine: DatabaseEngine,
    pub version: String,
    pub port: String,
}

impl Database {
    /// Deterministic runtime identity, e.g. `mysql-8-0-3306`.
    ///
    /// Used as both the container name and the volume name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the version or port is empty.
    pub fn hostname(&self) -> Result<String, ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "database {} has no version",
                self.engine
            )));
        }
        if self.port.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "database {} {} has no port",
                self.engine, self.version
            )));
        }

        Ok(format!("{}-{}-{}", self.engine, self.version, self.port).replace('.', "-"))
    }
}

/// An extra bind mount for a site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteMount {
    /// Host path; `~` and relative paths resolve against the home directory.
    pub source: String,
    /// Absolute path inside the container.
    pub target: String,
}

/// A web application served through the proxy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Site {
    pub hostname: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// Language-runtime version, used as the image tag.
    #[serde(rename = "php")]
    pub version: String,

    /// Project root on the host, mounted at `/app`.
    pub path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<SiteMount>,

    /// Step debugger toggle.
    #[serde(default)]
    pub xdebug: bool,
}

impl Site {
    /// The hostname followed by every alias.
    #[must_use]
    pub fn hostnames(&self) -> Vec<String> {
        std::iter::once(self.hostname.clone())
            .chain(self.aliases.iter().cloned())
            .collect()
    }

    /// Absolute host path of the project root.
    #[must_use]
    pub fn abs_path(&self, home: &Path) -> PathBuf {
        paths::resolve(home, &self.path)
    }

    /// Absolute host path → container target for each extra mount.
    #[must_use]
    pub fn abs_mounts(&self, home: &Path) -> Vec<(PathBuf, String)> {
        self.mounts
            .iter()
            .map(|m| (paths::resolve(home, &m.source), m.target.clone()))
            .collect()
    }
}

impl EnvironmentConfig {
    #[must_use]
    pub fn databases(&self) -> &[Database] {
        &self.databases
    }

    #[must_use]
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    #[must_use]
    pub const fn services(&self) -> Services {
        self.services
    }

    /// Environment variables injected into every site container, in a stable order.
    #[must_use]
    pub fn as_envs(&self) -> Vec<String> {
        let mut envs = self.runtime.as_envs();
        envs.extend(self.blackfire.as_envs());
        envs
    }

    /// Every hostname and alias declared by the sites.
    #[must_use]
    pub fn hostnames(&self) -> Vec<String> {
        self.sites.iter().flat_map(Site::hostnames).collect()
    }

    /// Checks invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on empty, malformed or duplicate
    /// hostnames, or on databases without a version or port.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for site in &self.sites {
            if site.hostname.trim().is_empty() {
                return Err(ConfigError::Invalid("a site has no hostname".to_string()));
            }
            for name in site.hostnames() {
                if !is_valid_hostname(&name) {
                    return Err(ConfigError::Invalid(format!(
                        "{name:?} is not a valid hostname"
                    )));
                }
                if !seen.insert(name.clone()) {
                    return Err(ConfigError::Invalid(format!(
                        "hostname {name} is declared more than once"
                    )));
                }
            }
        }

        for db in &self.databases {
            db.hostname()?;
        }

        Ok(())
    }
}

/// Dot-separated DNS labels of ASCII letters, digits and inner hyphens.
fn is_valid_hostname(name: &str) -> bool {
    name.len() <= 253
        && name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
php:
  memory_limit: 256M
databases:
  - engine: mysql
    version: "8.0"
    port: "3306"
  - engine: postgres
    version: "13"
    port: "5432"
services:
  mailhog: true
sites:
  - hostname: app.test
    aliases: [www.app.test]
    php: "8.0"
    path: ~/dev/app
    mounts:
      - source: ~/dev/shared
        target: /app/shared
    xdebug: true
"#;

    #[test]
    fn test_parse_environment() {
        let config: EnvironmentConfig = serde_yaml::from_str(SAMPLE).unwrap();

        assert_eq!(config.databases.len(), 2);
        assert_eq!(config.databases[1].engine, DatabaseEngine::Postgres);
        assert!(config.services.mailhog);
        assert_eq!(config.sites[0].version, "8.0");
        assert_eq!(config.sites[0].mounts[0].target, "/app/shared");
        assert_eq!(config.runtime.memory_limit, "256M");
        config.validate().unwrap();
    }

    #[test]
    fn test_database_hostname_replaces_dots() {
        let db = Database {
            engine: DatabaseEngine::Mysql,
            version: "5.7".to_string(),
            port: "3306".to_string(),
        };
        assert_eq!(db.hostname().unwrap(), "mysql-5-7-3306");
    }

    #[test]
    fn test_database_without_version_is_invalid() {
        let db = Database {
            engine: DatabaseEngine::Postgres,
            version: String::new(),
            port: "5432".to_string(),
        };
        assert!(matches!(db.hostname(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_engine_compatibility() {
        assert_eq!(DatabaseEngine::Mariadb.compatibility(), "mysql");
        assert_eq!(DatabaseEngine::Mysql.compatibility(), "mysql");
        assert_eq!(DatabaseEngine::Postgres.compatibility(), "postgres");
    }

    #[test]
    fn test_duplicate_alias_is_rejected() {
        let config = EnvironmentConfig {
            sites: vec![
                Site {
                    hostname: "a.test".to_string(),
                    ..Site::default()
                },
                Site {
                    hostname: "b.test".to_string(),
                    aliases: vec!["a.test".to_string()],
                    ..Site::default()
                },
            ],
            ..EnvironmentConfig::default()
        };

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_hostnames_are_rejected() {
        for bad in ["a.test,b.test", "a test", "a.test\n", "-a.test", "a..test", "a_b.test"] {
            let config = EnvironmentConfig {
                sites: vec![Site {
                    hostname: "ok.test".to_string(),
                    aliases: vec![bad.to_string()],
                    ..Site::default()
                }],
                ..EnvironmentConfig::default()
            };

            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "{bad:?} should be rejected"
            );
        }

        let config = EnvironmentConfig {
            sites: vec![Site {
                hostname: "my-app.test".to_string(),
                aliases: vec!["www2.My-App.test".to_string()],
                ..Site::default()
            }],
            ..EnvironmentConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_as_envs_appends_blackfire_after_runtime() {
        let mut config: EnvironmentConfig = serde_yaml::from_str(SAMPLE).unwrap();
        config.blackfire.server_id = "id".to_string();
        config.blackfire.server_token = "token".to_string();

        let envs = config.as_envs();
        assert_eq!(envs.first().map(String::as_str), Some("PHP_DISPLAY_ERRORS=on"));
        assert!(envs.contains(&"PHP_MEMORY_LIMIT=256M".to_string()));
        assert_eq!(
            &envs[envs.len() - 2..],
            &["BLACKFIRE_SERVER_ID=id".to_string(), "BLACKFIRE_SERVER_TOKEN=token".to_string()]
        );
    }

    #[test]
    fn test_hostnames_include_aliases() {
        let config: EnvironmentConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.hostnames(), vec!["app.test", "www.app.test"]);
    }
}
