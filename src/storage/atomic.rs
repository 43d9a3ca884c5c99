//! Whole-file replacement through a sibling temp file

use crate::error::{StoreError, StoreResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Temp file used while replacing `path`: `<file name>.tmp` in the same directory
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `contents` to `path` so readers observe either the old file or the
/// complete new one, never a partial write.
///
/// Callers must serialize writers of the same `path`; the temp file name is
/// derived from it and is not unique per call.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> StoreResult<()> {
    let tmp = temp_path(path);

    if let Err(e) = write_and_sync(&tmp, contents).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::io(&tmp, e));
    }

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::io(path, e));
    }

    Ok(())
}

async fn write_and_sync(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_atomic_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");

        write_atomic(&path, b"first version, longer").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "second");
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_write_atomic_missing_dir_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("doc.json");

        let err = write_atomic(&path, b"x").await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let path = Path::new("/root/alice/trip.json");
        assert_eq!(temp_path(path), Path::new("/root/alice/trip.json.tmp"));
    }
}
