//! Publication adapter – stores rendered PDFs and hands out time-limited
//! retrieval URLs.
//!
//! Stores are opened per request from the caller's credentials through a
//! [`StoreFactory`]; nothing is shared between requests.

mod local;
mod memory;
mod supabase;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use supabase::{SupabaseFactory, SupabaseStore};

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Signed URLs are valid for one year.
pub const SIGNED_URL_TTL_SECS: u64 = 31_536_000;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Object storage with signed-URL issuance.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `bucket/path`. Fails with
    /// [`StorageError::AlreadyExists`] if the object exists and `overwrite`
    /// is false.
    fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        overwrite: bool,
    ) -> Result<(), StorageError>;

    /// A URL granting read access to `bucket/path` for `ttl_secs` seconds.
    fn signed_url(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String, StorageError>;
}

/// Where to publish, as supplied with a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCredentials {
    pub url: String,
    pub key: String,
}

/// Opens a store for one request.
pub trait StoreFactory: Send + Sync {
    fn open(&self, credentials: &StorageCredentials) -> Result<Box<dyn BlobStore>, StorageError>;
}

impl<F> StoreFactory for F
where
    F: Fn(&StorageCredentials) -> Result<Box<dyn BlobStore>, StorageError> + Send + Sync,
{
    fn open(&self, credentials: &StorageCredentials) -> Result<Box<dyn BlobStore>, StorageError> {
        self(credentials)
    }
}

/// Storage key for a requester's document.
pub fn object_path(requester_id: &str, document_id: &str) -> String {
    format!("{requester_id}/{document_id}.pdf")
}

/// Upload a rendered PDF (replacing any previous version) and return its
/// signed URL.
pub fn publish(
    store: &dyn BlobStore,
    bucket: &str,
    requester_id: &str,
    document_id: &str,
    bytes: &[u8],
    ttl_secs: u64,
) -> Result<String, StorageError> {
    let path = object_path(requester_id, document_id);
    store.put(bucket, &path, bytes, PDF_CONTENT_TYPE, true)?;
    log::debug!("Uploaded {} bytes to {bucket}/{path}", bytes.len());
    store.signed_url(bucket, &path, ttl_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_layout() {
        assert_eq!(object_path("user-1", "doc-9"), "user-1/doc-9.pdf");
    }

    #[test]
    fn publish_overwrites_and_signs() {
        let store = MemoryStore::new();
        let first = publish(&store, "cookbooks", "u", "d", b"%PDF-1", SIGNED_URL_TTL_SECS).unwrap();
        let second = publish(&store, "cookbooks", "u", "d", b"%PDF-2", SIGNED_URL_TTL_SECS).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("cookbooks/u/d.pdf"));
        assert_eq!(store.get("cookbooks", "u/d.pdf").unwrap(), b"%PDF-2");
        assert_eq!(store.content_type("cookbooks", "u/d.pdf").as_deref(), Some(PDF_CONTENT_TYPE));
    }

    #[test]
    fn closures_are_factories() {
        let factory = |_: &StorageCredentials| -> Result<Box<dyn BlobStore>, StorageError> {
            Ok(Box::new(MemoryStore::new()))
        };
        let creds = StorageCredentials {
            url: "mem://".into(),
            key: "k".into(),
        };
        let store = factory.open(&creds).unwrap();
        assert!(store.signed_url("b", "missing.pdf", 60).is_err());
    }
}
