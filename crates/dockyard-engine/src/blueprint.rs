//! Desired container configuration for each entity kind.
//!
//! These builders are pure: the same config always yields the same spec.

use crate::runtime::{ContainerSpec, MountKind, MountSpec, PortSpec, VolumeSpec};
use dockyard_core::config::{Database, DatabaseEngine, Site};
use dockyard_core::{ConfigError, LabelPredicate, labels};
use std::collections::BTreeMap;
use std::path::Path;

/// Image for site containers; `{version}` is replaced by the site's runtime version.
pub const SITE_IMAGE_TEMPLATE: &str = "docker.io/craftcms/nginx:{version}-dev";
/// Image for database containers, by engine and version.
pub const DATABASE_IMAGE_TEMPLATE: &str = "docker.io/library/{engine}:{version}";
pub const MAILHOG_IMAGE: &str = "docker.io/mailhog/mailhog:latest";
pub const MAILHOG_NAME: &str = "mailhog";
/// Where a site's project root is mounted.
pub const SITE_ROOT_TARGET: &str = "/app";

const DATABASE_CREDENTIAL: &str = "dockyard";

#[must_use]
pub fn site_image(template: &str, version: &str) -> String {
    template.replace("{version}", version)
}

#[must_use]
pub fn database_image(db: &Database) -> String {
    DATABASE_IMAGE_TEMPLATE
        .replace("{engine}", db.engine.as_str())
        .replace("{version}", &db.version)
}

/// Labels identifying a site container.
#[must_use]
pub fn site_predicate(environment: &str, hostname: &str) -> LabelPredicate {
    LabelPredicate::environment(environment)
        .with(labels::TYPE, labels::TYPE_SITE)
        .with(labels::HOST, hostname)
}

/// Labels identifying a database container.
#[must_use]
pub fn database_predicate(environment: &str, db: &Database) -> LabelPredicate {
    LabelPredicate::environment(environment)
        .with(labels::TYPE, labels::TYPE_DATABASE)
        .with(labels::DATABASE_ENGINE, db.engine.as_str())
        .with(labels::DATABASE_VERSION, &db.version)
        .with(labels::DATABASE_PORT, &db.port)
}

/// Labels identifying the mail-capture container.
#[must_use]
pub fn mailhog_predicate(environment: &str) -> LabelPredicate {
    LabelPredicate::environment(environment).with(labels::TYPE, labels::TYPE_MAILHOG)
}

/// Labels identifying the proxy container.
#[must_use]
pub fn proxy_predicate(environment: &str) -> LabelPredicate {
    LabelPredicate::default().with(labels::PROXY, environment)
}

fn stamped(predicate: &LabelPredicate) -> BTreeMap<String, String> {
    let mut labels = predicate.labels().clone();
    labels.insert(labels::MANAGED.to_string(), "true".to_string());
    labels
}

/// Volume and container for a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseBlueprint {
    pub hostname: String,
    pub volume: VolumeSpec,
    pub container: ContainerSpec,
}

/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the database has no version or port.
pub fn database(environment: &str, db: &Database) -> Result<DatabaseBlueprint, ConfigError> {
    let hostname = db.hostname()?;

    let mut labels = stamped(&database_predicate(environment, db));
    labels.insert(
        labels::DATABASE_COMPATIBILITY.to_string(),
        db.engine.compatibility().to_string(),
    );

    let (target, env) = match db.engine {
        DatabaseEngine::Postgres => (
            "/var/lib/postgresql/data",
            vec![
                format!("POSTGRES_USER={DATABASE_CREDENTIAL}"),
                format!("POSTGRES_DB={DATABASE_CREDENTIAL}"),
                format!("POSTGRES_PASSWORD={DATABASE_CREDENTIAL}"),
            ],
        ),
        DatabaseEngine::Mysql | DatabaseEngine::Mariadb => (
            "/var/lib/mysql",
            vec![
                format!("MYSQL_ROOT_PASSWORD={DATABASE_CREDENTIAL}"),
                format!("MYSQL_DATABASE={DATABASE_CREDENTIAL}"),
                format!("MYSQL_USER={DATABASE_CREDENTIAL}"),
                format!("MYSQL_PASSWORD={DATABASE_CREDENTIAL}"),
            ],
        ),
    };

    let container = ContainerSpec {
        name: hostname.clone(),
        image: database_image(db),
        labels: labels.clone(),
        env,
        mounts: vec![MountSpec {
            kind: MountKind::Volume,
            source: hostname.clone(),
            target: target.to_string(),
        }],
        ports: vec![PortSpec::same(&db.port)],
        extra_hosts: Vec::new(),
        network: environment.to_string(),
    };

    Ok(DatabaseBlueprint {
        volume: VolumeSpec {
            name: hostname.clone(),
            labels,
        },
        hostname,
        container,
    })
}

#[must_use]
pub fn mailhog(environment: &str) -> ContainerSpec {
    ContainerSpec {
        name: MAILHOG_NAME.to_string(),
        image: MAILHOG_IMAGE.to_string(),
        labels: stamped(&mailhog_predicate(environment)),
        env: Vec::new(),
        mounts: Vec::new(),
        ports: vec![PortSpec::same("1025"), PortSpec::same("8025")],
        extra_hosts: Vec::new(),
        network: environment.to_string(),
    }
}

/// Container for a site.
///
/// `shared_env` is the environment-wide list; the debugger toggle is appended
/// per site, so one site's setting never leaks into the next.
#[must_use]
pub fn site(
    environment: &str,
    home: &Path,
    site: &Site,
    shared_env: &[String],
    image_template: &str,
) -> ContainerSpec {
    let mut mounts = vec![MountSpec {
        kind: MountKind::Bind,
        source: site.abs_path(home).display().to_string(),
        target: SITE_ROOT_TARGET.to_string(),
    }];
    mounts.extend(site.abs_mounts(home).into_iter().map(|(source, target)| MountSpec {
        kind: MountKind::Bind,
        source: source.display().to_string(),
        target,
    }));

    let mut env = shared_env.to_vec();
    env.push(if site.xdebug {
        "XDEBUG_MODE=develop,debug".to_string()
    } else {
        "XDEBUG_MODE=off".to_string()
    });

    let extra_hosts = site
        .hostnames()
        .into_iter()
        .map(|h| format!("{h}:127.0.0.1"))
        .collect();

    ContainerSpec {
        name: site.hostname.clone(),
        image: site_image(image_template, &site.version),
        labels: stamped(&site_predicate(environment, &site.hostname)),
        env,
        mounts,
        ports: Vec::new(),
        extra_hosts,
        network: environment.to_string(),
    }
}
