//! Directory listing.

use super::SidecarError;
use serde::Serialize;
use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub is_dir: bool,
    /// Byte size for files, 0 for directories, absent for the parent entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_parent: bool,
}

impl FileEntry {
    fn parent() -> Self {
        Self {
            name: "..".to_string(),
            is_dir: true,
            size: None,
            is_parent: true,
        }
    }
}

/// Listing response body.
#[derive(Debug, Clone, Serialize)]
pub struct DirListing {
    pub files: Vec<FileEntry>,
    /// Absolute path of the listed directory.
    pub cwd: PathBuf,
}

/// Parent entry first, then directories, then case-insensitive name.
fn listing_order(a: &FileEntry, b: &FileEntry) -> Ordering {
    b.is_parent
        .cmp(&a.is_parent)
        .then_with(|| b.is_dir.cmp(&a.is_dir))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
}

/// List `path`. Entries whose metadata cannot be read are skipped.
///
/// Resolves relative paths against the process working directory.
pub async fn list_dir(path: &Path) -> Result<DirListing, SidecarError> {
    let display = path.display().to_string();

    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(SidecarError::NotFound(format!("Directory not found: {}", display)))
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            return Err(SidecarError::PermissionDenied(format!("Permission denied: {}", display)))
        }
        Err(e) => return Err(SidecarError::Io(e.to_string())),
    };
    if !metadata.is_dir() {
        return Err(SidecarError::NotADirectory(display));
    }

    let cwd = std::path::absolute(path).map_err(|e| SidecarError::Io(e.to_string()))?;

    let mut files = Vec::new();
    if cwd.parent().is_some() {
        files.push(FileEntry::parent());
    }

    let mut entries = tokio::fs::read_dir(&cwd).await.map_err(|e| match e.kind() {
        io::ErrorKind::PermissionDenied => {
            SidecarError::PermissionDenied(format!("Permission denied: {}", display))
        }
        _ => SidecarError::Io(e.to_string()),
    })?;

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Directory read stopped early");
                break;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        match entry.metadata().await {
            Ok(meta) => {
                let is_dir = meta.is_dir();
                files.push(FileEntry {
                    name,
                    is_dir,
                    size: Some(if is_dir { 0 } else { meta.len() }),
                    is_parent: false,
                });
            }
            Err(e) => {
                tracing::debug!(name = %name, error = %e, "Skipping file");
            }
        }
    }

    files.sort_by(listing_order);
    Ok(DirListing { files, cwd })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_dir_ordering() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("A.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("zeta")).unwrap();
        std::fs::create_dir(dir.path().join("Alpha")).unwrap();

        let listing = list_dir(dir.path()).await.unwrap();
        let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();

        assert_eq!(names, vec!["..", "Alpha", "zeta", "A.txt", "b.txt"]);
        assert!(listing.files[0].is_parent);
        assert_eq!(listing.files[1].size, Some(0));
        assert_eq!(listing.files[4].size, Some(5));
        assert!(listing.cwd.is_absolute());
    }

    #[tokio::test]
    async fn test_list_dir_missing() {
        let err = list_dir(Path::new("/definitely/not/here")).await.unwrap_err();
        assert!(matches!(err, SidecarError::NotFound(m) if m.contains("Directory not found")));
    }

    #[tokio::test]
    async fn test_list_dir_on_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = list_dir(file.path()).await.unwrap_err();
        assert!(matches!(err, SidecarError::NotADirectory(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_root_has_no_parent_entry() {
        let listing = list_dir(Path::new("/")).await.unwrap();
        assert!(listing.files.iter().all(|f| !f.is_parent));
    }

    #[test]
    fn test_parent_entry_serialization() {
        let json = serde_json::to_value(FileEntry::parent()).unwrap();
        assert_eq!(json, serde_json::json!({"name": "..", "is_dir": true, "is_parent": true}));
    }
}
