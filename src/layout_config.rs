//! Draft layout – the intermediate representation between draft layout and
//! PDF writing. Encodes exactly what goes on each physical page, with
//! coordinates in points measured from the page's top-left corner.

use serde::{Deserialize, Serialize};

use crate::style::PageFormat;

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftLayout {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "DraftLayout::default_title")]
    pub title: String,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub pages: Vec<PageLayout>,
}

/// One physical page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    /// Kind of block the page came from, e.g. `cover`, `recipe`, `toc`.
    pub block: String,
    #[serde(default)]
    pub rects: Vec<FillRect>,
    #[serde(default)]
    pub images: Vec<ImageBox>,
    #[serde(default)]
    pub lines: Vec<TextLine>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

/// A single line of already-wrapped text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub x: f32,
    /// Top of the line box.
    pub y: f32,
    pub font_size: f32,
    #[serde(default)]
    pub style: FontStyle,
    pub color: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBox {
    pub src: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: [f32; 3],
}

impl DraftLayout {
    pub fn new(title: impl Into<String>, format: PageFormat) -> Self {
        Self {
            title: title.into(),
            page_width_pt: format.width_pt(),
            page_height_pt: format.height_pt(),
            pages: Vec::new(),
        }
    }

    fn default_title() -> String {
        "Cookbook".to_string()
    }

    /// Append an empty page for `block` and return it.
    pub fn push_page(&mut self, block: &str) -> &mut PageLayout {
        let page_index = self.pages.len();
        self.pages.push(PageLayout {
            page_index,
            block: block.to_string(),
            rects: Vec::new(),
            images: Vec::new(),
            lines: Vec::new(),
        });
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl PageLayout {
    /// All text on the page, one line per entry.
    pub fn text(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_keeps_pages() {
        let mut layout = DraftLayout::new("Soup Book", PageFormat::A4);
        let page = layout.push_page("recipe");
        page.lines.push(TextLine {
            text: "Soup".into(),
            x: 51.0,
            y: 51.0,
            font_size: 20.0,
            style: FontStyle::Bold,
            color: [0.0, 0.0, 0.0],
        });
        layout.push_page("recipe-photo");

        let json = layout.to_json().unwrap();
        assert!(json.contains("\"style\": \"bold\""));
        let back = DraftLayout::from_json(&json).unwrap();
        assert_eq!(back, layout);
        assert_eq!(back.pages[1].page_index, 1);
    }

    #[test]
    fn missing_title_defaults() {
        let layout =
            DraftLayout::from_json(r#"{"page_width_pt": 595.0, "page_height_pt": 842.0, "pages": []}"#)
                .unwrap();
        assert_eq!(layout.title, "Cookbook");
    }
}
