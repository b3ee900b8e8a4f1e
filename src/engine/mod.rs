//! Rendering adapter – turns composed markup into PDF bytes.
//!
//! An engine is launched once per document: [`RenderEngine::launch`] hands
//! out an [`EngineSession`] owning whatever the engine needs (a scratch
//! directory and browser process for Chrome, nothing much for the draft
//! engine). Dropping the session releases it, so a failed render cannot leak
//! into the next request.

pub mod chrome;
pub mod draft;

use std::path::PathBuf;
use std::time::{Duration, Instant};

pub use chrome::ChromeEngine;
pub use draft::DraftEngine;

use crate::error::RenderError;
use crate::style::{Margins, PageFormat, PAGE_FORMAT};

/// Default upper bound on one render.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Page geometry and limits handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub format: PageFormat,
    /// Outer margins. Page blocks carry their own inner margin, so the
    /// default is zero.
    pub margins: Margins,
    pub timeout: Duration,
    /// Document title for PDF metadata.
    pub title: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: PAGE_FORMAT,
            margins: Margins::default(),
            timeout: DEFAULT_RENDER_TIMEOUT,
            title: "Cookbook".to_string(),
        }
    }
}

impl RenderOptions {
    /// `@page` rule matching these options.
    pub fn page_rule(&self) -> String {
        let m = &self.margins;
        format!(
            "@page {{ size: {}mm {}mm; margin: {}mm {}mm {}mm {}mm; }}",
            self.format.width_mm, self.format.height_mm, m.top, m.right, m.bottom, m.left
        )
    }
}

/// A rendering backend.
pub trait RenderEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Acquire a fresh engine instance for one document.
    fn launch(&self) -> Result<Box<dyn EngineSession>, RenderError>;
}

/// One acquired engine instance. Released on drop.
pub trait EngineSession {
    fn render(&mut self, markup: &str, options: &RenderOptions) -> Result<Vec<u8>, RenderError>;
}

/// Launch `engine`, render `markup`, and release the session before
/// returning, whether or not rendering succeeded.
pub fn render_document(
    engine: &dyn RenderEngine,
    markup: &str,
    options: &RenderOptions,
) -> Result<Vec<u8>, RenderError> {
    let started = Instant::now();
    let mut session = engine.launch()?;
    let result = session.render(markup, options);
    drop(session);

    match &result {
        Ok(bytes) => log::debug!(
            "{} engine rendered {} bytes in {:?}",
            engine.name(),
            bytes.len(),
            started.elapsed()
        ),
        Err(e) => log::warn!("{} engine failed after {:?}: {e}", engine.name(), started.elapsed()),
    }
    result
}

/// Select an engine by name: `draft` or `chrome`.
pub fn engine_by_name(
    name: &str,
    chrome_path: Option<PathBuf>,
) -> Result<Box<dyn RenderEngine>, RenderError> {
    match name {
        "draft" => Ok(Box::new(DraftEngine::discover(None)?)),
        "chrome" => Ok(Box::new(ChromeEngine::discover(chrome_path.as_deref())?)),
        other => Err(RenderError::UnknownEngine(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        released: Arc<AtomicUsize>,
        fail: bool,
    }

    struct CountingSession {
        released: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Drop for CountingSession {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl RenderEngine for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn launch(&self) -> Result<Box<dyn EngineSession>, RenderError> {
            Ok(Box::new(CountingSession {
                released: Arc::clone(&self.released),
                fail: self.fail,
            }))
        }
    }

    impl EngineSession for CountingSession {
        fn render(&mut self, _markup: &str, _options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
            if self.fail {
                Err(RenderError::Timeout(Duration::from_millis(1)))
            } else {
                Ok(b"%PDF-1.7".to_vec())
            }
        }
    }

    #[test]
    fn session_released_on_success_and_failure() {
        let released = Arc::new(AtomicUsize::new(0));
        let ok = Counting {
            released: Arc::clone(&released),
            fail: false,
        };
        let bad = Counting {
            released: Arc::clone(&released),
            fail: true,
        };
        let opts = RenderOptions::default();
        assert!(render_document(&ok, "<p>x</p>", &opts).is_ok());
        assert!(render_document(&bad, "<p>x</p>", &opts).is_err());
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn page_rule_reflects_options() {
        let opts = RenderOptions {
            format: PageFormat::LETTER,
            margins: Margins::uniform(5.0),
            ..RenderOptions::default()
        };
        assert_eq!(
            opts.page_rule(),
            "@page { size: 215.9mm 279.4mm; margin: 5mm 5mm 5mm 5mm; }"
        );
    }

    #[test]
    fn unknown_engine_name() {
        assert!(engine_by_name("wkhtmltopdf", None).is_err());
        assert_eq!(engine_by_name("draft", None).unwrap().name(), "draft");
    }
}
