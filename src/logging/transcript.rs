//! Append-only transcript files.
//!
//! - `chat.log`: `[YYYY-mm-dd HH:MM:SS] [ROLE] <content prefix>`
//! - `ai-commands.log`: one block per executed sidecar command
//!
//! Entries are cut to a bounded number of characters. Files are only ever
//! appended to and never read back. Write failures are logged and swallowed.

use crate::config::LoggingConfig;
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub const CHAT_LOG_FILE: &str = "chat.log";
pub const COMMAND_LOG_FILE: &str = "ai-commands.log";
pub const SERVER_LOG_FILE: &str = "server_log.txt";

/// Longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Current local time in the transcript format.
fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Writer for the chat and command transcripts.
#[derive(Debug)]
pub struct TranscriptLog {
    /// `None` disables all writes.
    dir: Option<PathBuf>,
    max_chars: usize,
    /// Serialises appends from this process so entries never interleave.
    write_lock: Mutex<()>,
}

impl TranscriptLog {
    pub fn new(dir: impl Into<PathBuf>, max_chars: usize) -> Self {
        Self {
            dir: Some(dir.into()),
            max_chars,
            write_lock: Mutex::new(()),
        }
    }

    /// A transcript that drops everything.
    pub fn disabled() -> Self {
        Self {
            dir: None,
            max_chars: 0,
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        if config.enabled {
            Self::new(&config.log_dir, config.transcript_max_chars)
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Append one chat turn.
    pub async fn log_chat(&self, role: &str, content: &str) {
        let line = format!(
            "[{}] [{}] {}\n",
            timestamp(),
            role.to_uppercase(),
            truncate_chars(content, self.max_chars)
        );
        self.append(CHAT_LOG_FILE, &line).await;
    }

    /// Append one executed command with its outcome.
    pub async fn log_command(&self, command: &str, result: &str, exit_code: i32) {
        let entry = format!(
            "[{}]\nCommand: {}\nExit Code: {}\nResult: {}\n{}\n\n",
            timestamp(),
            command,
            exit_code,
            truncate_chars(result, self.max_chars),
            "=".repeat(80)
        );
        self.append(COMMAND_LOG_FILE, &entry).await;
    }

    async fn append(&self, file: &str, text: &str) {
        let Some(dir) = &self.dir else {
            return;
        };
        let path = dir.join(file);

        let _guard = self.write_lock.lock().await;
        let result = async {
            tokio::fs::create_dir_all(dir).await?;
            let mut handle = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            handle.write_all(text.as_bytes()).await?;
            handle.flush().await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write transcript");
        }
    }
}
