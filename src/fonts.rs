//! Font loading and text measurement using `ttf-parser`.
//!
//! The default faces are the Helvetica TrueType files bundled with
//! `printpdf`, so the draft layout and the written PDF agree on every glyph
//! advance. Those faces cover the Windows-1252 repertoire; for other scripts
//! a Unicode face can be loaded from disk ([`FontManager::discover`]).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use printpdf::BuiltinFont;

use crate::error::RenderError;
use crate::layout_config::FontStyle;

/// Environment variable naming a TrueType/OpenType face for the draft engine.
pub const FONT_ENV: &str = "FORGE_FONT";

/// Well-known Unicode faces, regular then bold.
const SYSTEM_FONTS: &[(&str, &str)] = &[
    (
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/noto/NotoSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    ),
    (
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    ),
    ("C:\\Windows\\Fonts\\arial.ttf", "C:\\Windows\\Fonts\\arialbd.ttf"),
];

/// Advance for characters the face has no glyph for, in em.
const FALLBACK_ADVANCE_EM: f32 = 0.5;

/// Word space when the face maps no space glyph (Helvetica's width).
const DEFAULT_SPACE_EM: f32 = 0.278;

/// A loaded font face with metrics.
#[derive(Clone)]
pub struct FontData {
    /// Where the face came from: a builtin name or a file path.
    pub name: String,
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API).
    bytes: Arc<[u8]>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
    pub line_gap: f32,
}

impl fmt::Debug for FontData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontData")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("units_per_em", &self.units_per_em)
            .finish_non_exhaustive()
    }
}

impl FontData {
    /// Parse a TTF/OTF face from bytes.
    pub fn parse(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, RenderError> {
        let name = name.into();
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| RenderError::Font(format!("failed to parse '{name}': {e}")))?;
        Ok(Self {
            units_per_em: f32::from(face.units_per_em()).max(1.0),
            ascender: f32::from(face.ascender()),
            descender: f32::from(face.descender()),
            line_gap: f32::from(face.line_gap()),
            name,
            bytes: bytes.into(),
        })
    }

    /// Read and parse a face from disk.
    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path)
            .map_err(|e| RenderError::Font(format!("reading '{}': {e}", path.display())))?;
        Self::parse(path.display().to_string(), bytes)
    }

    /// One of the faces bundled with `printpdf`.
    fn builtin(font: BuiltinFont) -> Self {
        let name = font.get_id().to_string();
        let bytes = font.get_subset_font().bytes;
        Self::parse(name.clone(), bytes.clone()).unwrap_or_else(|e| {
            log::warn!("{e}; using synthetic metrics");
            Self {
                name,
                bytes: bytes.into(),
                units_per_em: 1000.0,
                ascender: 750.0,
                descender: -250.0,
                line_gap: 0.0,
            }
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.bytes, 0).ok()
    }
}

/// The faces used for each [`FontStyle`].
#[derive(Debug, Clone)]
pub struct FontManager {
    faces: Vec<FontData>,
    /// Index into `faces` for regular, bold, italic and bold italic.
    styles: [usize; 4],
}

impl Default for FontManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FontManager {
    /// The bundled Helvetica family.
    pub fn new() -> Self {
        Self {
            faces: vec![
                FontData::builtin(BuiltinFont::Helvetica),
                FontData::builtin(BuiltinFont::HelveticaBold),
                FontData::builtin(BuiltinFont::HelveticaOblique),
                FontData::builtin(BuiltinFont::HelveticaBoldOblique),
            ],
            styles: [0, 1, 2, 3],
        }
    }

    /// A family from disk. Italic styles reuse the upright faces; without a
    /// bold file the regular face serves every style.
    pub fn from_files(regular: &Path, bold: Option<&Path>) -> Result<Self, RenderError> {
        let mut faces = vec![FontData::from_file(regular)?];
        let bold_index = match bold {
            Some(path) => {
                faces.push(FontData::from_file(path)?);
                1
            }
            None => 0,
        };
        Ok(Self {
            faces,
            styles: [0, bold_index, 0, bold_index],
        })
    }

    /// Resolve the faces to use: `explicit`, then `FORGE_FONT`, then the
    /// first well-known system face, then the bundled Helvetica family.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, RenderError> {
        let configured = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(FONT_ENV).filter(|v| !v.is_empty()).map(PathBuf::from));
        if let Some(path) = configured {
            let bold = bold_sibling(&path);
            log::debug!("Loading font '{}'", path.display());
            return Self::from_files(&path, bold.as_deref());
        }

        for (regular, bold) in SYSTEM_FONTS {
            let regular = Path::new(regular);
            if !regular.is_file() {
                continue;
            }
            let bold = Path::new(bold);
            match Self::from_files(regular, bold.is_file().then_some(bold)) {
                Ok(fonts) => {
                    log::debug!("Using system font '{}'", regular.display());
                    return Ok(fonts);
                }
                Err(e) => log::debug!("Skipping system font: {e}"),
            }
        }
        Ok(Self::new())
    }

    /// Replace the face for one style.
    pub fn load_font(&mut self, style: FontStyle, data: FontData) {
        self.faces.push(data);
        self.styles[slot(style)] = self.faces.len() - 1;
    }

    pub fn faces(&self) -> &[FontData] {
        &self.faces
    }

    /// Index into [`faces`](Self::faces) used for `style`.
    pub fn face_index(&self, style: FontStyle) -> usize {
        self.styles[slot(style)]
    }

    pub fn get(&self, style: FontStyle) -> &FontData {
        &self.faces[self.face_index(style)]
    }

    /// Width of `text` in points at `font_size`, summed from glyph advances.
    pub fn measure_text_width(&self, text: &str, font_size: f32, style: FontStyle) -> f32 {
        let data = self.get(style);
        let Some(face) = data.face() else {
            return text.chars().count() as f32 * font_size * FALLBACK_ADVANCE_EM;
        };
        let ems: f32 = text.chars().map(|ch| advance_em(&face, data, ch)).sum();
        ems * font_size
    }

    /// Width of a word space in em.
    pub fn space_em(&self, style: FontStyle) -> f32 {
        let data = self.get(style);
        data.face()
            .map(|face| advance_em(&face, data, ' '))
            .unwrap_or(DEFAULT_SPACE_EM)
    }

    /// Ascender in points at `font_size`.
    pub fn ascender_pt(&self, font_size: f32, style: FontStyle) -> f32 {
        let data = self.get(style);
        data.ascender * font_size / data.units_per_em
    }

    /// Number of visible characters in `text` the face has no glyph for.
    pub fn missing_glyphs(&self, text: &str, style: FontStyle) -> usize {
        let Some(face) = self.get(style).face() else {
            return 0;
        };
        text.chars()
            .filter(|ch| !ch.is_whitespace() && glyph(&face, *ch).is_none())
            .count()
    }
}

fn slot(style: FontStyle) -> usize {
    match style {
        FontStyle::Regular => 0,
        FontStyle::Bold => 1,
        FontStyle::Italic => 2,
        FontStyle::BoldItalic => 3,
    }
}

/// Glyph for `ch`, treating `.notdef` as missing.
fn glyph(face: &ttf_parser::Face<'_>, ch: char) -> Option<ttf_parser::GlyphId> {
    face.glyph_index(ch).filter(|id| id.0 != 0)
}

fn advance_em(face: &ttf_parser::Face<'_>, data: &FontData, ch: char) -> f32 {
    let advance = |ch| {
        glyph(face, ch)
            .and_then(|id| face.glyph_hor_advance(id))
            .map(|a| f32::from(a) / data.units_per_em)
    };
    if ch.is_whitespace() {
        return advance(' ').unwrap_or(DEFAULT_SPACE_EM);
    }
    advance(ch).unwrap_or(FALLBACK_ADVANCE_EM)
}

/// `Foo-Regular.ttf` → `Foo-Bold.ttf`, `Foo.ttf` → `Foo-Bold.ttf`, if present.
fn bold_sibling(regular: &Path) -> Option<PathBuf> {
    let stem = regular.file_stem()?.to_str()?;
    let ext = regular.extension().and_then(|e| e.to_str()).unwrap_or("ttf");
    let bold_stem = if stem.contains("Regular") {
        stem.replace("Regular", "Bold")
    } else {
        format!("{stem}-Bold")
    };
    let candidate = regular.with_file_name(format!("{bold_stem}.{ext}"));
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_real_advances() {
        let fonts = FontManager::new();
        let narrow = fonts.measure_text_width("iiii", 12.0, FontStyle::Regular);
        let wide = fonts.measure_text_width("WWWW", 12.0, FontStyle::Regular);
        assert!(wide > narrow * 3.0, "W should be much wider than i: {wide} vs {narrow}");

        // Helvetica 'a' is 556/1000 em.
        let a = fonts.measure_text_width("a", 10.0, FontStyle::Regular);
        assert!((a - 5.56).abs() < 0.05, "got {a}");
    }

    #[test]
    fn bold_is_wider_than_regular() {
        let fonts = FontManager::new();
        let regular = fonts.measure_text_width("Tiramisu", 12.0, FontStyle::Regular);
        let bold = fonts.measure_text_width("Tiramisu", 12.0, FontStyle::Bold);
        assert!(bold > regular);
    }

    #[test]
    fn latin_accents_are_covered() {
        let fonts = FontManager::new();
        assert_eq!(fonts.missing_glyphs("Crème brûlée – ½ cup, 230 °C", FontStyle::Regular), 0);
        assert_eq!(fonts.missing_glyphs("味噌汁 Miso", FontStyle::Regular), 3);
    }

    #[test]
    fn spaces_have_width() {
        let fonts = FontManager::new();
        let space = fonts.space_em(FontStyle::Regular);
        assert!(space > 0.2 && space < 0.4, "got {space}");
        let joined = fonts.measure_text_width("a b", 10.0, FontStyle::Regular);
        let parts = fonts.measure_text_width("ab", 10.0, FontStyle::Regular);
        assert!((joined - parts - space * 10.0).abs() < 0.01);
    }

    #[test]
    fn load_font_replaces_one_style() {
        let mut fonts = FontManager::new();
        let bold = fonts.get(FontStyle::Bold).clone();
        fonts.load_font(FontStyle::Regular, bold);
        assert_eq!(fonts.face_index(FontStyle::Regular), 4);
        assert_eq!(
            fonts.measure_text_width("Focaccia", 11.0, FontStyle::Regular),
            fonts.measure_text_width("Focaccia", 11.0, FontStyle::Bold)
        );
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = FontData::parse("junk", b"not a font".to_vec()).unwrap_err();
        assert!(matches!(err, RenderError::Font(_)));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = FontManager::discover(Some(Path::new("/nonexistent/face.ttf"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/face.ttf"));
    }

    #[test]
    fn font_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let regular = dir.path().join("Kitchen-Regular.ttf");
        let bold = dir.path().join("Kitchen-Bold.ttf");
        std::fs::write(&regular, FontManager::new().get(FontStyle::Regular).bytes()).unwrap();
        std::fs::write(&bold, FontManager::new().get(FontStyle::Bold).bytes()).unwrap();

        assert_eq!(bold_sibling(&regular), Some(bold.clone()));
        let fonts = FontManager::discover(Some(&regular)).unwrap();
        assert_eq!(fonts.faces().len(), 2);
        assert_eq!(fonts.face_index(FontStyle::BoldItalic), 1);
        assert_eq!(fonts.face_index(FontStyle::Italic), 0);
    }
}
