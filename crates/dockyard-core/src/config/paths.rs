//! Host path resolution for site sources and mounts.

use std::path::{Component, Path, PathBuf};

/// Resolves a user-supplied path against `home`.
///
/// `~` and `~/x` expand to the home directory and relative paths are taken as
/// relative to it. The result is normalised lexically; the filesystem is never
/// consulted, so drift checks stay deterministic.
#[must_use]
pub fn resolve(home: &Path, raw: &str) -> PathBuf {
    let joined = if raw == "~" {
        home.to_path_buf()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else {
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            home.join(path)
        }
    };

    normalize(&joined)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tilde_expands_to_home() {
        let home = Path::new("/home/dev");
        assert_eq!(resolve(home, "~"), PathBuf::from("/home/dev"));
        assert_eq!(resolve(home, "~/sites/app"), PathBuf::from("/home/dev/sites/app"));
    }

    #[test]
    fn test_relative_resolves_against_home() {
        let home = Path::new("/home/dev");
        assert_eq!(resolve(home, "sites/./app"), PathBuf::from("/home/dev/sites/app"));
    }

    #[test]
    fn test_absolute_is_normalised() {
        let home = Path::new("/home/dev");
        assert_eq!(resolve(home, "/srv/app/../shared/"), PathBuf::from("/srv/shared"));
    }
}
