//! Reading an environment file from disk.

use dockyard_core::{ConfigError, EnvironmentConfig};
use dockyard_utils::env::config_dir;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Location of the file describing `environment`.
#[must_use]
pub fn config_path(home: &Path, environment: &str) -> PathBuf {
    config_dir(home).join(format!("{environment}.yaml"))
}

/// Loads and validates `<home>/.dockyard/<environment>.yaml`.
///
/// # Errors
///
/// Returns [`ConfigError::NoEnvironment`] for an empty name,
/// [`ConfigError::NotFound`] if the file is missing, and parse or validation
/// errors otherwise.
pub fn load(home: &Path, environment: &str) -> Result<EnvironmentConfig, ConfigError> {
    let environment = environment.trim();
    if environment.is_empty() {
        return Err(ConfigError::NoEnvironment);
    }

    let path = config_path(home, environment);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound { path });
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };

    // An empty file is an environment with nothing declared.
    let mut config: EnvironmentConfig = if content.trim().is_empty() {
        EnvironmentConfig::default()
    } else {
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?
    };
    config.name = environment.to_string();
    config.validate()?;

    debug!(
        path = %path.display(),
        databases = config.databases().len(),
        sites = config.sites().len(),
        "Loaded environment"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(home: &TempDir, env: &str, content: &str) {
        let dir = home.path().join(".dockyard");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{env}.yaml")), content).unwrap();
    }

    #[test]
    fn test_load_sets_name() {
        let home = TempDir::new().unwrap();
        write(
            &home,
            "dev",
            "sites:\n  - hostname: a.test\n    php: \"8.0\"\n    path: ~/a\n",
        );

        let config = load(home.path(), "dev").unwrap();
        assert_eq!(config.name, "dev");
        assert_eq!(config.sites()[0].hostname, "a.test");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let home = TempDir::new().unwrap();
        let err = load(home.path(), "dev").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { ref path } if path.ends_with(".dockyard/dev.yaml")));
    }

    #[test]
    fn test_empty_name() {
        let home = TempDir::new().unwrap();
        assert!(matches!(load(home.path(), " "), Err(ConfigError::NoEnvironment)));
    }

    #[test]
    fn test_duplicate_hostnames_rejected() {
        let home = TempDir::new().unwrap();
        write(
            &home,
            "dev",
            "sites:\n  - hostname: a.test\n    php: \"8.0\"\n    path: a\n  - hostname: b.test\n    aliases: [a.test]\n    php: \"8.0\"\n    path: b\n",
        );

        assert!(matches!(load(home.path(), "dev"), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_yaml() {
        let home = TempDir::new().unwrap();
        write(&home, "dev", "sites: [");
        assert!(matches!(load(home.path(), "dev"), Err(ConfigError::Parse { .. })));
    }
}
