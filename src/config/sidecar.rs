//! Command sidecar configuration

use serde::{Deserialize, Serialize};

/// Substrings that mark a shell command as destructive.
pub const DEFAULT_DENY_LIST: &[&str] = &["rm -rf", "del /f", "format ", "mkfs", "dd if="];

/// Settings for the local command / filesystem sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SidecarConfig {
    /// Block commands matching `deny_list`.
    pub safe_mode: bool,
    pub command_timeout_seconds: u64,
    pub deny_list: Vec<String>,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            safe_mode: true,
            command_timeout_seconds: 30,
            deny_list: DEFAULT_DENY_LIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}
