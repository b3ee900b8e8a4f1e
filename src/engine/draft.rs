//! In-process draft engine: lays the markup out with measured glyph advances
//! and writes the PDF with `printpdf`. Needs no browser, so it is always
//! available.

use std::path::Path;
use std::sync::Arc;

use super::{EngineSession, RenderEngine, RenderOptions};
use crate::error::RenderError;
use crate::fonts::FontManager;
use crate::layout::layout_document;
use crate::render::render_pdf;

/// Draft engine over a set of faces. The default uses the bundled
/// Helvetica family.
#[derive(Debug, Clone, Default)]
pub struct DraftEngine {
    fonts: Arc<FontManager>,
}

impl DraftEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fonts(fonts: FontManager) -> Self {
        Self {
            fonts: Arc::new(fonts),
        }
    }

    /// Engine using [`FontManager::discover`].
    pub fn discover(font: Option<&Path>) -> Result<Self, RenderError> {
        Ok(Self::with_fonts(FontManager::discover(font)?))
    }

    pub fn fonts(&self) -> &FontManager {
        &self.fonts
    }
}

impl RenderEngine for DraftEngine {
    fn name(&self) -> &'static str {
        "draft"
    }

    fn launch(&self) -> Result<Box<dyn EngineSession>, RenderError> {
        Ok(Box::new(DraftSession {
            fonts: Arc::clone(&self.fonts),
        }))
    }
}

struct DraftSession {
    fonts: Arc<FontManager>,
}

impl EngineSession for DraftSession {
    fn render(&mut self, markup: &str, options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
        let layout = layout_document(markup, options, &self.fonts);
        log::debug!("draft layout: {} page(s)", layout.pages.len());
        render_pdf(&layout, &self.fonts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::render_document;

    #[test]
    fn renders_pdf_bytes() {
        let html = r#"<html><body><div class="page cover"><h1 class="cover-title">T</h1></div></body></html>"#;
        let bytes = render_document(&DraftEngine::new(), html, &RenderOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn sessions_share_the_engine_faces() {
        let engine = DraftEngine::new();
        let copy = engine.clone();
        assert!(Arc::ptr_eq(&engine.fonts, &copy.fonts));
        assert_eq!(engine.fonts().faces().len(), 4);
    }
}
