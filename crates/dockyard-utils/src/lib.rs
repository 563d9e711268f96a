//! Shared utilities for dockyard.

/// Environment variable and path utilities.
pub mod env;
/// Re-invoking dockyard with elevated privileges.
pub mod privileged;
