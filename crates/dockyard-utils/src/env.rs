//! Environment variable and path utilities.

use std::path::PathBuf;

/// Overrides the home directory used to locate environment files.
pub const HOME_VAR: &str = "DOCKYARD_HOME";
/// Set to `false` to never touch the hosts file.
pub const EDIT_HOSTS_VAR: &str = "DOCKYARD_EDIT_HOSTS";
/// Address of the proxy control endpoint.
pub const PROXY_ADDR_VAR: &str = "DOCKYARD_PROXY_ADDR";
/// Hosts file rewritten by the privileged helper.
pub const HOSTS_FILE_VAR: &str = "DOCKYARD_HOSTS_FILE";

pub const DEFAULT_PROXY_ADDR: &str = "127.0.0.1:5000";

/// Returns the user's home directory, honouring `DOCKYARD_HOME`.
pub fn get_home_dir() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_VAR).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(home));
    }
    directories::UserDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Directory holding `<environment>.yaml` files.
pub fn config_dir(home: &std::path::Path) -> PathBuf {
    home.join(".dockyard")
}

/// False only when `DOCKYARD_EDIT_HOSTS` is explicitly `false`.
pub fn edit_hosts_enabled() -> bool {
    parse_edit_hosts(std::env::var(EDIT_HOSTS_VAR).ok().as_deref())
}

fn parse_edit_hosts(value: Option<&str>) -> bool {
    !matches!(value.map(str::trim), Some(v) if v.eq_ignore_ascii_case("false"))
}

/// The proxy control address, from `DOCKYARD_PROXY_ADDR` or the default.
pub fn proxy_addr() -> String {
    std::env::var(PROXY_ADDR_VAR)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_PROXY_ADDR.to_string())
}

/// The hosts file path override, if any.
pub fn hosts_file_override() -> Option<PathBuf> {
    std::env::var_os(HOSTS_FILE_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
