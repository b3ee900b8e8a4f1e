use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::BlobStore;
use crate::error::StorageError;

/// Filesystem store rooted at a directory. Objects live at
/// `{root}/{bucket}/{path}`; signed URLs are `file://` URLs carrying an
/// `expires` timestamp.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of an object. Rejects paths escaping the root.
    pub fn object_file(&self, bucket: &str, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(bucket).join(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("object path escapes store root: {}", relative.display()),
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for LocalStore {
    fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
        overwrite: bool,
    ) -> Result<(), StorageError> {
        let file = self.object_file(bucket, path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let mut handle = options.open(&file).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => StorageError::AlreadyExists(format!("{bucket}/{path}")),
            _ => StorageError::Io(e),
        })?;
        handle.write_all(bytes)?;
        Ok(())
    }

    fn signed_url(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String, StorageError> {
        let file = self.object_file(bucket, path)?;
        if !file.is_file() {
            return Err(StorageError::NotFound(format!("{bucket}/{path}")));
        }
        let absolute = fs::canonicalize(&file)?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Ok(format!(
            "file://{}?expires={}",
            absolute.display(),
            now.saturating_add(ttl_secs)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_under_bucket_and_signs() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        store
            .put("cookbooks", "u1/d1.pdf", b"%PDF-", "application/pdf", true)
            .unwrap();
        let on_disk = dir.path().join("cookbooks/u1/d1.pdf");
        assert_eq!(fs::read(&on_disk).unwrap(), b"%PDF-");

        let url = store.signed_url("cookbooks", "u1/d1.pdf", 3600).unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.contains("u1/d1.pdf?expires="));
    }

    #[test]
    fn respects_overwrite_flag() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        store.put("b", "a.pdf", b"1", "application/pdf", false).unwrap();
        let err = store.put("b", "a.pdf", b"2", "application/pdf", false).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        store.put("b", "a.pdf", b"3", "application/pdf", true).unwrap();
        assert_eq!(fs::read(dir.path().join("b/a.pdf")).unwrap(), b"3");
    }

    #[test]
    fn rejects_escaping_paths() {
        let store = LocalStore::new("/tmp/forge-store");
        assert!(store.object_file("b", "../etc/passwd").is_err());
        assert!(store.object_file("b", "/abs.pdf").is_err());
    }

    #[test]
    fn missing_object_cannot_be_signed() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let err = store.signed_url("b", "nope.pdf", 60).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
