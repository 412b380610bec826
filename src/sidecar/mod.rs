//! Local command execution and directory listing for the frontend.
//!
//! Both operations act on the machine the backend runs on. Commands run
//! through the platform shell with a hard timeout; in safe mode commands
//! containing a deny-listed substring are refused before anything is
//! spawned.

pub mod command;
pub mod fs_list;

pub use command::{CommandOutput, CommandRunner};
pub use fs_list::{list_dir, DirListing, FileEntry};

use thiserror::Error;

/// Errors from sidecar operations.
#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("Invalid command: must be a non-empty string")]
    EmptyCommand,

    #[error("Command blocked for safety reasons")]
    Forbidden { command: String },

    #[error("Command execution timeout ({seconds}s)")]
    Timeout { seconds: u64, command: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Command execution failed: {0}")]
    Execution(String),

    #[error("Failed to list directory: {0}")]
    Io(String),
}
