//! Pipeline – validates a generation request, composes the cookbook,
//! renders it and publishes the PDF.
//!
//! Each request is independent: a fresh engine session is launched and
//! released before publication, and a fresh store is opened from the
//! request's credentials.

use std::env;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::compose::{compose, ComposedDocument};
use crate::engine::{render_document, RenderEngine, RenderOptions};
use crate::error::Error;
use crate::model::Cookbook;
use crate::storage::{publish, StorageCredentials, StoreFactory, SIGNED_URL_TTL_SECS};

pub const DEFAULT_BUCKET: &str = "cookbooks";

/// Configuration for the generation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Storage bucket PDFs are uploaded to (default: "cookbooks").
    pub bucket: String,
    /// Lifetime of issued URLs (default: one year).
    pub signed_url_ttl_secs: u64,
    /// Page geometry and engine timeout.
    pub render: RenderOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            signed_url_ttl_secs: SIGNED_URL_TTL_SECS,
            render: RenderOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `FORGE_BUCKET`, `FORGE_SIGNED_URL_TTL`
    /// (seconds) and `FORGE_RENDER_TIMEOUT` (seconds). Unparseable values
    /// are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(bucket) = env::var("FORGE_BUCKET").ok().filter(|b| !b.trim().is_empty()) {
            config.bucket = bucket;
        }
        if let Some(ttl) = env_secs("FORGE_SIGNED_URL_TTL") {
            config.signed_url_ttl_secs = ttl;
        }
        if let Some(timeout) = env_secs("FORGE_RENDER_TIMEOUT") {
            config.render.timeout = Duration::from_secs(timeout);
        }
        config
    }
}

fn env_secs(name: &str) -> Option<u64> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(secs) => Some(secs),
        Err(e) => {
            log::warn!("Ignoring {name}={raw:?}: {e}");
            None
        }
    }
}

/// A request to generate and publish one cookbook PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub requester_id: String,
    pub document_id: String,
    pub cookbook_data: Option<Cookbook>,
    pub storage_url: String,
    pub storage_key: String,
}

/// Wire form of a request. The cookbook stays untyped until the other
/// fields have been checked.
#[derive(Deserialize)]
struct RequestBody {
    #[serde(default)]
    requester_id: String,
    #[serde(default)]
    document_id: String,
    #[serde(default)]
    cookbook_data: Option<serde_json::Value>,
    #[serde(default, alias = "supabase_url")]
    storage_url: String,
    #[serde(default, alias = "supabase_key")]
    storage_key: String,
}

impl GenerateRequest {
    /// Parse a request body.
    ///
    /// Unparseable JSON and missing fields are client errors. A cookbook
    /// whose overall shape cannot be composed at all (say `recipes` is a
    /// string) is an [`Error::Composition`].
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let body: RequestBody = serde_json::from_str(json)?;
        let mut request = Self {
            requester_id: body.requester_id,
            document_id: body.document_id,
            cookbook_data: None,
            storage_url: body.storage_url,
            storage_key: body.storage_key,
        };
        let Some(value) = body.cookbook_data.filter(|v| !v.is_null()) else {
            return Ok(request);
        };
        request.validate_fields()?;
        let cookbook = Cookbook::from_value(value)
            .map_err(|e| Error::Composition(format!("cookbook_data has an unusable shape: {e}")))?;
        request.cookbook_data = Some(cookbook);
        Ok(request)
    }

    /// Reject the request if any required field is missing or blank.
    pub fn validate(&self) -> Result<(), Error> {
        self.validate_fields()?;
        if self.cookbook_data.is_none() {
            return Err(Error::MissingField("cookbook_data"));
        }
        Ok(())
    }

    fn validate_fields(&self) -> Result<(), Error> {
        let required = [
            ("requester_id", self.requester_id.as_str()),
            ("document_id", self.document_id.as_str()),
            ("storage_url", self.storage_url.as_str()),
            ("storage_key", self.storage_key.as_str()),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::MissingField(name));
            }
        }
        Ok(())
    }

    pub fn credentials(&self) -> StorageCredentials {
        StorageCredentials {
            url: self.storage_url.clone(),
            key: self.storage_key.clone(),
        }
    }
}

/// Outcome of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip, default = "GenerateResponse::ok_status")]
    status: u16,
}

impl GenerateResponse {
    pub fn success(pdf_url: String) -> Self {
        Self {
            success: true,
            pdf_url: Some(pdf_url),
            error: None,
            status: 200,
        }
    }

    pub fn failure(error: &Error) -> Self {
        Self {
            success: false,
            pdf_url: None,
            error: Some(error.to_string()),
            status: error.status_code(),
        }
    }

    fn ok_status() -> u16 {
        200
    }

    /// HTTP status for this response: 200, 400 or 500.
    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Compose and render a cookbook. Returns the PDF bytes and the composed
/// document they were rendered from.
pub fn generate_pdf(
    cookbook: &Cookbook,
    engine: &dyn RenderEngine,
    options: &RenderOptions,
) -> Result<(Vec<u8>, ComposedDocument), Error> {
    let started = Instant::now();
    let document = compose(cookbook);
    log::debug!(
        "Composed {} page blocks in {:?}",
        document.page_count,
        started.elapsed()
    );

    let options = RenderOptions {
        title: cookbook.cover_title().to_string(),
        ..options.clone()
    };
    let bytes = render_document(engine, &document.html, &options)?;
    Ok((bytes, document))
}

/// Run a request end to end and return the signed URL of the published PDF.
pub fn generate(
    request: &GenerateRequest,
    engine: &dyn RenderEngine,
    stores: &dyn StoreFactory,
    config: &PipelineConfig,
) -> Result<String, Error> {
    request.validate()?;
    let cookbook = request
        .cookbook_data
        .as_ref()
        .ok_or(Error::MissingField("cookbook_data"))?;

    log::info!(
        "Generating PDF for document {} (requester {}) with the {} engine",
        request.document_id,
        request.requester_id,
        engine.name()
    );
    let (bytes, document) = generate_pdf(cookbook, engine, &config.render)?;
    log::info!(
        "Rendered {} bytes from {} page blocks",
        bytes.len(),
        document.page_count
    );

    let store = stores.open(&request.credentials())?;
    let url = publish(
        store.as_ref(),
        &config.bucket,
        &request.requester_id,
        &request.document_id,
        &bytes,
        config.signed_url_ttl_secs,
    )?;
    log::info!("Published document {}", request.document_id);
    Ok(url)
}

/// [`generate`] folded into a response.
pub fn handle_request(
    request: &GenerateRequest,
    engine: &dyn RenderEngine,
    stores: &dyn StoreFactory,
    config: &PipelineConfig,
) -> GenerateResponse {
    match generate(request, engine, stores, config) {
        Ok(url) => GenerateResponse::success(url),
        Err(e) => {
            if e.is_client_error() {
                log::info!("Rejected request: {e}");
            } else {
                log::error!("Generation failed: {e}");
            }
            GenerateResponse::failure(&e)
        }
    }
}

/// Parse a JSON request body and handle it.
pub fn handle_json(
    body: &str,
    engine: &dyn RenderEngine,
    stores: &dyn StoreFactory,
    config: &PipelineConfig,
) -> GenerateResponse {
    match GenerateRequest::from_json(body) {
        Ok(request) => handle_request(&request, engine, stores, config),
        Err(e) => {
            log::info!("Rejected request: {e}");
            GenerateResponse::failure(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DraftEngine;
    use crate::error::StorageError;
    use crate::storage::{BlobStore, MemoryStore};

    fn request() -> GenerateRequest {
        GenerateRequest {
            requester_id: "user-1".into(),
            document_id: "doc-1".into(),
            cookbook_data: Some(Cookbook {
                name: "Test".into(),
                ..Cookbook::default()
            }),
            storage_url: "https://proj.supabase.co".into(),
            storage_key: "key".into(),
        }
    }

    #[test]
    fn validate_names_first_missing_field() {
        let mut r = request();
        r.document_id = "  ".into();
        assert!(matches!(r.validate(), Err(Error::MissingField("document_id"))));

        let mut r = request();
        r.cookbook_data = None;
        assert!(matches!(r.validate(), Err(Error::MissingField("cookbook_data"))));

        assert!(request().validate().is_ok());
    }

    #[test]
    fn supabase_aliases_accepted() {
        let r = GenerateRequest::from_json(
            r#"{"requester_id":"u","document_id":"d","cookbook_data":{"name":"X"},
                "supabase_url":"https://s","supabase_key":"k"}"#,
        )
        .unwrap();
        assert_eq!(r.storage_url, "https://s");
        assert_eq!(r.storage_key, "k");
        assert!(r.validate().is_ok());
    }

    #[test]
    fn response_json_shapes() {
        let ok = GenerateResponse::success("https://x/y.pdf".into());
        assert_eq!(ok.to_json(), r#"{"success":true,"pdf_url":"https://x/y.pdf"}"#);
        assert_eq!(ok.status_code(), 200);

        let bad = GenerateResponse::failure(&Error::MissingField("requester_id"));
        assert_eq!(
            bad.to_json(),
            r#"{"success":false,"error":"missing required field: requester_id"}"#
        );
        assert_eq!(bad.status_code(), 400);
    }

    #[test]
    fn end_to_end_with_memory_store() {
        let store = MemoryStore::new();
        let handle = store.clone();
        let factory = move |_: &StorageCredentials| -> Result<Box<dyn BlobStore>, StorageError> {
            Ok(Box::new(handle.clone()))
        };
        let response = handle_request(&request(), &DraftEngine::new(), &factory, &PipelineConfig::default());
        assert!(response.success, "{:?}", response.error);
        assert_eq!(response.pdf_url.as_deref(), Some("memory://cookbooks/user-1/doc-1.pdf?expires_in=31536000"));
        let pdf = store.get("cookbooks", "user-1/doc-1.pdf").unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[test]
    fn malformed_json_is_client_error() {
        let factory = |_: &StorageCredentials| -> Result<Box<dyn BlobStore>, StorageError> {
            Ok(Box::new(MemoryStore::new()))
        };
        let response = handle_json("{not json", &DraftEngine::new(), &factory, &PipelineConfig::default());
        assert!(!response.success);
        assert_eq!(response.status_code(), 400);
    }

    #[test]
    fn unusable_cookbook_shape_is_internal_error() {
        let err = GenerateRequest::from_json(
            r#"{"requester_id":"u","document_id":"d","cookbook_data":{"name":"X","recipes":"soup"},
                "storage_url":"https://s","storage_key":"k"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Composition(_)), "{err}");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn missing_field_reported_before_cookbook_shape() {
        let err = GenerateRequest::from_json(
            r#"{"document_id":"d","cookbook_data":{"recipes":"soup"},
                "storage_url":"https://s","storage_key":"k"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingField("requester_id")));
    }

    #[test]
    fn null_cookbook_is_missing() {
        let r = GenerateRequest::from_json(
            r#"{"requester_id":"u","document_id":"d","cookbook_data":null,
                "storage_url":"https://s","storage_key":"k"}"#,
        )
        .unwrap();
        assert!(matches!(r.validate(), Err(Error::MissingField("cookbook_data"))));
    }

    #[test]
    fn config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.bucket, "cookbooks");
        assert_eq!(config.signed_url_ttl_secs, 31_536_000);
        assert_eq!(config.render.timeout, Duration::from_secs(60));
    }
}
