use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::BlobStore;
use crate::error::StorageError;

#[derive(Debug, Clone)]
struct Object {
    bytes: Vec<u8>,
    content_type: String,
}

/// In-memory store. Clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<String, Object>>>,
    fail_uploads: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose uploads always fail with HTTP 503.
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    pub fn get(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.read()
            .get(&key(bucket, path))
            .map(|o| o.bytes.clone())
    }

    pub fn content_type(&self, bucket: &str, path: &str) -> Option<String> {
        self.read()
            .get(&key(bucket, path))
            .map(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Object>> {
        // A panicked writer cannot leave a half-written entry behind.
        self.objects.read().unwrap_or_else(|e| e.into_inner())
    }
}

fn key(bucket: &str, path: &str) -> String {
    format!("{bucket}/{path}")
}

impl BlobStore for MemoryStore {
    fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        overwrite: bool,
    ) -> Result<(), StorageError> {
        if self.fail_uploads {
            return Err(StorageError::Http {
                status: 503,
                body: "storage unavailable".to_string(),
            });
        }
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        let key = key(bucket, path);
        if !overwrite && objects.contains_key(&key) {
            return Err(StorageError::AlreadyExists(key));
        }
        objects.insert(
            key,
            Object {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn signed_url(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String, StorageError> {
        let key = key(bucket, path);
        if !self.read().contains_key(&key) {
            return Err(StorageError::NotFound(key));
        }
        Ok(format!("memory://{key}?expires_in={ttl_secs}"))
    }
}
