//! Supabase Storage over its REST API.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use ureq::Agent;

use super::{BlobStore, StorageCredentials, StoreFactory};
use crate::error::StorageError;

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 60;

/// Characters left as-is in a path segment: A-Z a-z 0-9 - . _ ~
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Client for one Supabase project.
pub struct SupabaseStore {
    agent: Agent,
    base_url: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl SupabaseStore {
    pub fn new(credentials: &StorageCredentials) -> Self {
        Self::with_timeout(credentials, Duration::from_secs(DEFAULT_TIMEOUT))
    }

    pub fn with_timeout(credentials: &StorageCredentials, timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            base_url: credentials.url.trim_end_matches('/').to_owned(),
            key: credentials.key.clone(),
        }
    }

    fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.base_url)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/object/{}", self.storage_url(), object_key(bucket, path))
    }

    fn sign_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/object/sign/{}", self.storage_url(), object_key(bucket, path))
    }

    /// Absolute download URL from the `signedURL` the API returns (a path
    /// relative to `/storage/v1`).
    fn absolute(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            return signed.to_string();
        }
        format!("{}/{}", self.storage_url(), signed.trim_start_matches('/'))
    }
}

/// `bucket/path` with every segment percent-encoded; `/` separates segments.
fn object_key(bucket: &str, path: &str) -> String {
    std::iter::once(bucket)
        .chain(path.split('/'))
        .map(|segment| utf8_percent_encode(segment, SEGMENT_ENCODE_SET).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

impl BlobStore for SupabaseStore {
    fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        overwrite: bool,
    ) -> Result<(), StorageError> {
        let url = self.object_url(bucket, path);
        log::info!("Uploading {} bytes to {bucket}/{path}", bytes.len());

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.key))
            .header("apikey", &self.key)
            .header("Content-Type", content_type)
            .header("x-upsert", if overwrite { "true" } else { "false" })
            .send(bytes)?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response
                .into_body()
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_string());
            if status == 409 && !overwrite {
                return Err(StorageError::AlreadyExists(format!("{bucket}/{path}")));
            }
            return Err(StorageError::Http { status, body });
        }
        Ok(())
    }

    fn signed_url(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String, StorageError> {
        let url = self.sign_url(bucket, path);
        log::debug!("Requesting signed URL for {bucket}/{path} ({ttl_secs}s)");

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.key))
            .header("apikey", &self.key)
            .send_json(serde_json::json!({ "expiresIn": ttl_secs }))?;

        let status = response.status().as_u16();
        let mut body = response.into_body();
        if status >= 400 {
            let body = body
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_string());
            return Err(StorageError::Http { status, body });
        }
        let signed: SignResponse = body.read_json()?;
        Ok(self.absolute(&signed.signed_url))
    }
}

/// Opens a [`SupabaseStore`] per request from the request's credentials.
#[derive(Debug, Clone, Copy)]
pub struct SupabaseFactory {
    timeout: Duration,
}

impl SupabaseFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SupabaseFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT))
    }
}

impl StoreFactory for SupabaseFactory {
    fn open(&self, credentials: &StorageCredentials) -> Result<Box<dyn BlobStore>, StorageError> {
        Ok(Box::new(SupabaseStore::with_timeout(credentials, self.timeout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SupabaseStore {
        SupabaseStore::new(&StorageCredentials {
            url: "https://proj.supabase.co/".into(),
            key: "service-key".into(),
        })
    }

    #[test]
    fn endpoint_urls() {
        let s = store();
        assert_eq!(
            s.object_url("cookbooks", "u/d.pdf"),
            "https://proj.supabase.co/storage/v1/object/cookbooks/u/d.pdf"
        );
        assert_eq!(
            s.sign_url("cookbooks", "u/d.pdf"),
            "https://proj.supabase.co/storage/v1/object/sign/cookbooks/u/d.pdf"
        );
    }

    #[test]
    fn path_segments_are_encoded() {
        let s = store();
        assert_eq!(
            s.object_url("cookbooks", "user 1/doc#2?v=3.pdf"),
            "https://proj.supabase.co/storage/v1/object/cookbooks/user%201/doc%232%3Fv%3D3.pdf"
        );
        assert_eq!(
            s.sign_url("my bucket", "u/Crème.pdf"),
            "https://proj.supabase.co/storage/v1/object/sign/my%20bucket/u/Cr%C3%A8me.pdf"
        );
        assert_eq!(object_key("b", "a-b_c.d~e/f.pdf"), "b/a-b_c.d~e/f.pdf");
    }

    #[test]
    fn signed_path_is_joined_to_storage_root() {
        let s = store();
        assert_eq!(
            s.absolute("/object/sign/cookbooks/u/d.pdf?token=abc"),
            "https://proj.supabase.co/storage/v1/object/sign/cookbooks/u/d.pdf?token=abc"
        );
        assert_eq!(s.absolute("https://cdn.example/x"), "https://cdn.example/x");
    }

    #[test]
    fn sign_response_field_name() {
        let r: SignResponse = serde_json::from_str(r#"{"signedURL": "/object/sign/a"}"#).unwrap();
        assert_eq!(r.signed_url, "/object/sign/a");
    }
}
