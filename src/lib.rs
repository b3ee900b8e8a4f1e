//! # cookbook-forge – cookbook → paginated HTML → PDF
//!
//! Turns a structured cookbook (recipes, section dividers, front matter,
//! cover settings) into one self-contained, print-ready HTML document and
//! from there into a published PDF. The stages are:
//!
//! 1. **Model** – typed cookbook records parsed from JSON ([`model`])
//! 2. **Compose** – order the content, render each fragment, estimate the
//!    TOC and wrap everything with the style sheet ([`compose`],
//!    [`fragments`], [`toc`], [`style`])
//! 3. **Render** – hand the markup to an engine: headless Chrome or the
//!    in-process draft engine ([`engine`], [`fonts`], [`layout`], [`render`])
//! 4. **Publish** – upload the PDF and issue a signed URL ([`storage`])
//!
//! [`pipeline`] ties the stages together behind a request/response API, and
//! a C-compatible FFI surface is exposed via the [`ffi`] module.

pub mod compose;
pub mod dom;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod fonts;
pub mod fragments;
pub mod layout;
pub mod layout_config;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod samples;
pub mod storage;
pub mod style;
pub mod toc;

// Re-exports for convenience
pub use compose::{compose, compose_html, ComposedDocument};
pub use error::{Error, RenderError, StorageError};
pub use model::{Cookbook, Cover, Divider, FrontMatterPage, Recipe, TocStyle};
pub use pipeline::{generate_pdf, handle_request, GenerateRequest, GenerateResponse, PipelineConfig};
pub use toc::{estimate_toc, TocEntry};
