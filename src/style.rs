//! Style sheet provider – the one constant rule set every composed cookbook
//! embeds, plus the physical page geometry it is written against.
//!
//! The print-page abstraction lives here: a `.page` block is exactly one
//! physical page (A4) with an 18 mm inner margin, clips anything that does
//! not fit, and forces a break after itself unless it is the last block.

use serde::{Deserialize, Serialize};

/// Physical page size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageFormat {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl PageFormat {
    /// ISO A4, 210 × 297 mm.
    pub const A4: PageFormat = PageFormat {
        width_mm: 210.0,
        height_mm: 297.0,
    };

    /// US Letter, 8.5 × 11 in.
    pub const LETTER: PageFormat = PageFormat {
        width_mm: 215.9,
        height_mm: 279.4,
    };

    pub fn width_pt(&self) -> f32 {
        mm_to_pt(self.width_mm)
    }

    pub fn height_pt(&self) -> f32 {
        mm_to_pt(self.height_mm)
    }
}

impl Default for PageFormat {
    fn default() -> Self {
        Self::A4
    }
}

/// Outer page margins in millimetres, applied by the rendering engine on top
/// of the page block's own inner margin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn uniform(mm: f32) -> Self {
        Self {
            top: mm,
            right: mm,
            bottom: mm,
            left: mm,
        }
    }
}

/// The format the style sheet is written for.
pub const PAGE_FORMAT: PageFormat = PageFormat::A4;

/// Inner margin of every page block.
pub const PAGE_MARGIN_MM: f32 = 18.0;

pub fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// The global style sheet.
pub fn stylesheet() -> &'static str {
    STYLESHEET
}

const STYLESHEET: &str = r#"
@page { size: A4; margin: 0; }

* { box-sizing: border-box; }

html, body {
    margin: 0;
    padding: 0;
    font-family: Georgia, "Times New Roman", serif;
    font-size: 11pt;
    line-height: 1.5;
    color: #2d2a26;
    background: #ffffff;
    -webkit-print-color-adjust: exact;
    print-color-adjust: exact;
}

h1, h2, h3 {
    font-family: "Helvetica Neue", Helvetica, Arial, sans-serif;
    font-weight: 700;
    margin: 0 0 6mm 0;
    color: #1f1c18;
}
h1 { font-size: 32pt; line-height: 1.15; }
h2 { font-size: 22pt; line-height: 1.2; }
h3 { font-size: 13pt; text-transform: uppercase; letter-spacing: 0.08em; color: #8a5a2b; }

.page {
    width: 210mm;
    height: 297mm;
    padding: 18mm;
    position: relative;
    overflow: hidden;
    page-break-after: always;
    break-after: page;
}
.page:last-child {
    page-break-after: auto;
    break-after: auto;
}

/* cover */
.cover {
    display: flex;
    flex-direction: column;
    align-items: center;
    justify-content: center;
    text-align: center;
}
.cover-photo {
    max-width: 100%;
    max-height: 150mm;
    object-fit: cover;
    margin-bottom: 12mm;
    border-radius: 2mm;
}
.cover-title { font-size: 40pt; }
.cover-author { font-size: 16pt; font-style: italic; margin: 2mm 0; }
.cover-year { font-size: 12pt; color: #6b6359; margin: 2mm 0; }

/* front matter */
.front-matter {
    display: flex;
    flex-direction: column;
    justify-content: center;
}
.dedication, .foreword {
    align-items: center;
    text-align: center;
}
.front-matter-text {
    font-style: italic;
    font-size: 14pt;
    max-width: 130mm;
    white-space: pre-wrap;
}
.photo-page { align-items: center; text-align: center; }
.front-matter-photo { max-width: 100%; max-height: 220mm; object-fit: contain; }
.caption { font-style: italic; color: #6b6359; margin-top: 6mm; }
.story { justify-content: flex-start; }
.story-text { white-space: pre-wrap; text-align: justify; }

/* table of contents */
.toc {
    padding: 18mm;
    page-break-after: always;
    break-after: page;
}
.toc:last-child {
    page-break-after: auto;
    break-after: auto;
}
.toc-entries { list-style: none; margin: 0; padding: 0; }
.toc-entry {
    display: flex;
    justify-content: space-between;
    padding: 1.5mm 0;
    break-inside: avoid;
}
.toc-classic .toc-entry { border-bottom: 1px dotted #b8ad9f; }
.toc-modern h2 { text-transform: uppercase; letter-spacing: 0.12em; color: #8a5a2b; }
.toc-modern .toc-page { font-weight: 700; color: #8a5a2b; }
.toc-minimal h2 { font-size: 16pt; font-weight: 400; }
.toc-minimal .toc-entry { padding: 0.8mm 0; }

/* recipes */
.recipe-title { border-bottom: 0.6mm solid #8a5a2b; padding-bottom: 3mm; }
.ingredients { list-style: none; padding: 0; margin: 0 0 8mm 0; }
.ingredients li { padding: 0.8mm 0; border-bottom: 1px solid #efe9e1; }
.directions { padding-left: 6mm; margin: 0; }
.directions li { margin-bottom: 3mm; }
.recipe-photo {
    display: flex;
    align-items: center;
    justify-content: center;
}
.recipe-photo-img { max-width: 100%; max-height: 100%; object-fit: contain; }
.photo-placeholder {
    width: 100%;
    height: 100%;
    display: flex;
    align-items: center;
    justify-content: center;
    background: #f4efe8;
    color: #a39a8f;
    font-size: 18pt;
    font-style: italic;
}

/* dividers */
.divider {
    display: flex;
    flex-direction: column;
    align-items: center;
    justify-content: center;
    text-align: center;
    background: #f4efe8;
}
.divider-title { font-size: 36pt; }
.divider-subtitle { font-size: 14pt; font-style: italic; color: #6b6359; }
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_declares_page_block() {
        let css = stylesheet();
        assert!(css.contains("@page { size: A4; margin: 0; }"));
        assert!(css.contains(".page:last-child"));
        assert!(css.contains("break-after: page"));
    }

    #[test]
    fn stylesheet_has_no_markup_delimiters() {
        // The composer embeds this verbatim inside <style>.
        assert!(!stylesheet().contains('<'));
    }

    #[test]
    fn a4_in_points() {
        assert!((PageFormat::A4.width_pt() - 595.28).abs() < 0.01);
        assert!((PageFormat::A4.height_pt() - 841.89).abs() < 0.01);
    }
}
