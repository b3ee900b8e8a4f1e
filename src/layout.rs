//! Draft layout engine – walks the blocks of a composed document and places
//! text, images and fills on physical pages.
//!
//! Glyph widths come from the faces in a [`FontManager`]. There is no CSS
//! cascade: the style sheet's look is reproduced from the class names the
//! fragment renderers emit. Page blocks map to
//! exactly one page each and clip whatever does not fit. The TOC section
//! flows over as many pages as it needs.

use crate::dom::{body_children, document_blocks, parse_html, Element, Node};
use crate::engine::RenderOptions;
use crate::fonts::FontManager;
use crate::layout_config::{DraftLayout, FillRect, FontStyle, ImageBox, PageLayout, TextLine};
use crate::render::image_dimensions;
use crate::style::{mm_to_pt, PAGE_MARGIN_MM};

const INK: [f32; 3] = [0.176, 0.165, 0.149];
const ACCENT: [f32; 3] = [0.541, 0.353, 0.169];
const MUTED: [f32; 3] = [0.420, 0.388, 0.349];
const RULE: [f32; 3] = [0.722, 0.678, 0.624];
const PLACEHOLDER_FILL: [f32; 3] = [0.953, 0.933, 0.902];

const LINE_HEIGHT: f32 = 1.4;
const LIST_INDENT: f32 = 16.0;

/// Page kinds whose content is centred on the page.
const CENTERED_BLOCKS: &[&str] = &["cover", "divider", "dedication", "foreword", "photo-page", "recipe-photo"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

/// How one run of text is set.
#[derive(Debug, Clone, Copy)]
struct TextStyle {
    size: f32,
    style: FontStyle,
    color: [f32; 3],
    space_after: f32,
}

impl TextStyle {
    const fn new(size: f32, style: FontStyle, color: [f32; 3], space_after: f32) -> Self {
        Self {
            size,
            style,
            color,
            space_after,
        }
    }
}

const BODY: TextStyle = TextStyle::new(11.0, FontStyle::Regular, INK, 6.0);

/// Lay out composed markup for the draft engine.
pub fn layout_document(markup: &str, options: &RenderOptions, fonts: &FontManager) -> DraftLayout {
    let nodes = parse_html(markup);
    let body = body_children(&nodes);
    let blocks = document_blocks(&body);

    let mut layout = DraftLayout::new(options.title.clone(), options.format);
    let geometry = Geometry::new(&layout, options);

    for block in blocks {
        let mut flow = Flow::new(&mut layout, geometry, fonts);
        if block.has_class("page") {
            let kind = block_kind(block);
            flow.start_page(&kind);
            flow.align = if CENTERED_BLOCKS.iter().any(|c| block.has_class(c)) {
                Align::Center
            } else {
                Align::Left
            };
            flow.children(&block.children);
            if flow.align == Align::Center {
                flow.center_vertically();
            }
        } else {
            flow.flowing = true;
            flow.toc_style = TocLook::from_classes(block);
            flow.start_page("toc");
            flow.children(&block.children);
        }
        if flow.clipped > 0 {
            log::debug!(
                "Clipped {} line(s) overflowing a '{}' page",
                flow.clipped,
                flow.block
            );
        }
    }

    layout
}

/// Page kind from the block's classes: the most specific class after `page`.
fn block_kind(block: &Element) -> String {
    block
        .classes()
        .iter()
        .rev()
        .find(|c| **c != "page")
        .map(|c| c.to_string())
        .unwrap_or_else(|| "page".to_string())
}

#[derive(Debug, Clone, Copy)]
struct Geometry {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

impl Geometry {
    fn new(layout: &DraftLayout, options: &RenderOptions) -> Self {
        let inner = mm_to_pt(PAGE_MARGIN_MM);
        let m = &options.margins;
        Self {
            left: mm_to_pt(m.left) + inner,
            right: layout.page_width_pt - mm_to_pt(m.right) - inner,
            top: mm_to_pt(m.top) + inner,
            bottom: layout.page_height_pt - mm_to_pt(m.bottom) - inner,
        }
    }

    fn width(&self) -> f32 {
        self.right - self.left
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum TocLook {
    #[default]
    Classic,
    Modern,
    Minimal,
}

impl TocLook {
    fn from_classes(section: &Element) -> Self {
        if section.has_class("toc-modern") {
            TocLook::Modern
        } else if section.has_class("toc-minimal") {
            TocLook::Minimal
        } else {
            TocLook::Classic
        }
    }
}

/// Cursor over the pages produced by one block.
struct Flow<'a> {
    layout: &'a mut DraftLayout,
    fonts: &'a FontManager,
    geometry: Geometry,
    block: String,
    y: f32,
    align: Align,
    /// Overflow continues on a new page instead of being clipped.
    flowing: bool,
    toc_style: TocLook,
    clipped: usize,
    last_space: f32,
}

impl<'a> Flow<'a> {
    fn new(layout: &'a mut DraftLayout, geometry: Geometry, fonts: &'a FontManager) -> Self {
        Self {
            layout,
            fonts,
            geometry,
            block: String::new(),
            y: geometry.top,
            align: Align::Left,
            flowing: false,
            toc_style: TocLook::Classic,
            clipped: 0,
            last_space: 0.0,
        }
    }

    fn start_page(&mut self, block: &str) {
        self.block = block.to_string();
        self.layout.push_page(block);
        self.y = self.geometry.top;
        self.last_space = 0.0;
    }

    fn page(&mut self) -> &mut PageLayout {
        let last = self.layout.pages.len() - 1;
        &mut self.layout.pages[last]
    }

    /// Make room for `height` points. Returns false when the content must
    /// be clipped.
    fn ensure(&mut self, height: f32) -> bool {
        if self.y + height <= self.geometry.bottom {
            return true;
        }
        if self.flowing && self.y > self.geometry.top {
            let block = self.block.clone();
            self.start_page(&block);
            return true;
        }
        self.clipped += 1;
        false
    }

    fn remaining(&self) -> f32 {
        (self.geometry.bottom - self.y).max(0.0)
    }

    fn children(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node {
                Node::Element(e) => self.element(e),
                Node::Text(t) => self.paragraph(t, BODY),
            }
        }
    }

    fn element(&mut self, e: &Element) {
        match e.name.as_str() {
            "h1" => {
                let size = if e.has_class("cover-title") { 34.0 } else { 28.0 };
                self.paragraph(&e.text_content(), TextStyle::new(size, FontStyle::Bold, INK, 14.0));
            }
            "h2" => self.heading2(e),
            "h3" => {
                let text = e.text_content().to_uppercase();
                self.paragraph(&text, TextStyle::new(12.0, FontStyle::Bold, ACCENT, 6.0));
            }
            "p" => self.paragraph(&e.text_content(), paragraph_style(e)),
            "ul" | "ol" => self.list(e),
            "img" => self.image(e),
            "div" if e.has_class("photo-placeholder") => self.placeholder(&e.text_content()),
            _ => self.children(&e.children),
        }
    }

    fn heading2(&mut self, e: &Element) {
        let style = if self.flowing {
            match self.toc_style {
                TocLook::Classic => TextStyle::new(20.0, FontStyle::Bold, INK, 14.0),
                TocLook::Modern => TextStyle::new(20.0, FontStyle::Bold, ACCENT, 14.0),
                TocLook::Minimal => TextStyle::new(16.0, FontStyle::Regular, INK, 10.0),
            }
        } else {
            TextStyle::new(20.0, FontStyle::Bold, INK, 12.0)
        };
        let text = match self.toc_style {
            TocLook::Modern if self.flowing => e.text_content().to_uppercase(),
            _ => e.text_content(),
        };
        self.paragraph(&text, style);

        if e.has_class("recipe-title") {
            let rule_y = self.y - style.space_after + 3.0;
            let (left, width) = (self.geometry.left, self.geometry.width());
            self.page().rects.push(FillRect {
                x: left,
                y: rule_y,
                width,
                height: 1.7,
                color: ACCENT,
            });
            self.y += 6.0;
        }
    }

    /// Wrapped text, honouring embedded newlines.
    fn paragraph(&mut self, text: &str, style: TextStyle) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let line_height = style.size * LINE_HEIGHT;
        let width = self.geometry.width();
        for source_line in text.lines() {
            let wrapped = wrap_text(self.fonts, source_line.trim(), style.size, style.style, width);
            if wrapped.is_empty() {
                self.y += line_height;
                continue;
            }
            for line in wrapped {
                self.text_line(line, style, self.geometry.left, width, line_height);
            }
        }
        self.y += style.space_after;
        self.last_space = style.space_after;
    }

    fn text_line(&mut self, text: String, style: TextStyle, x: f32, width: f32, line_height: f32) {
        if !self.ensure(line_height) {
            return;
        }
        let x = match self.align {
            Align::Left => x,
            Align::Center => {
                let used = self.fonts.measure_text_width(&text, style.size, style.style);
                x + ((width - used) / 2.0).max(0.0)
            }
        };
        let y = self.y;
        self.page().lines.push(TextLine {
            text,
            x,
            y,
            font_size: style.size,
            style: style.style,
            color: style.color,
        });
        self.y += line_height;
    }

    fn list(&mut self, list: &Element) {
        let ordered = list.name == "ol";
        let toc = list.has_class("toc-entries");
        for (i, item) in list.elements().filter(|e| e.name == "li").enumerate() {
            if toc || item.has_class("toc-entry") {
                self.toc_entry(item);
                continue;
            }
            let marker = if ordered {
                format!("{}.", i + 1)
            } else {
                "-".to_string()
            };
            self.list_item(&marker, &item.text_content());
        }
        self.y += 6.0;
        self.last_space = 6.0;
    }

    fn list_item(&mut self, marker: &str, text: &str) {
        let style = BODY;
        let line_height = style.size * LINE_HEIGHT;
        let x = self.geometry.left + LIST_INDENT;
        let width = self.geometry.width() - LIST_INDENT;
        let lines = wrap_text(self.fonts, text.trim(), style.size, style.style, width);

        for (n, line) in lines.into_iter().enumerate() {
            if !self.ensure(line_height) {
                return;
            }
            let y = self.y;
            let left = self.geometry.left;
            let page = self.page();
            if n == 0 {
                page.lines.push(TextLine {
                    text: marker.to_string(),
                    x: left,
                    y,
                    font_size: style.size,
                    style: FontStyle::Regular,
                    color: ACCENT,
                });
            }
            page.lines.push(TextLine {
                text: line,
                x,
                y,
                font_size: style.size,
                style: style.style,
                color: style.color,
            });
            self.y += line_height;
        }
        self.y += 2.0;
    }

    /// Title on the left, page number right-aligned on the first line.
    fn toc_entry(&mut self, item: &Element) {
        let find = |class: &str| {
            item.elements()
                .find(|e| e.has_class(class))
                .map(|e| e.text_content())
                .unwrap_or_default()
        };
        let (title, number) = (find("toc-title"), find("toc-page"));

        let size = if self.toc_style == TocLook::Minimal { 10.5 } else { 11.0 };
        let gap = if self.toc_style == TocLook::Minimal { 2.0 } else { 4.0 };
        let line_height = size * LINE_HEIGHT;
        let number_style = match self.toc_style {
            TocLook::Modern => (FontStyle::Bold, ACCENT),
            _ => (FontStyle::Regular, INK),
        };
        let number_width = self.fonts.measure_text_width(&number, size, number_style.0);
        let title_width = self.geometry.width() - number_width - 12.0;
        let lines = wrap_text(self.fonts, title.trim(), size, FontStyle::Regular, title_width);

        // Keep an entry's lines together.
        let needed = line_height * lines.len().max(1) as f32;
        if !self.ensure(needed) {
            return;
        }
        let top = self.y;
        let (left, right) = (self.geometry.left, self.geometry.right);
        for line in lines {
            let y = self.y;
            self.page().lines.push(TextLine {
                text: line,
                x: left,
                y,
                font_size: size,
                style: FontStyle::Regular,
                color: INK,
            });
            self.y += line_height;
        }
        let classic = self.toc_style == TocLook::Classic;
        let page = self.page();
        page.lines.push(TextLine {
            text: number,
            x: right - number_width,
            y: top,
            font_size: size,
            style: number_style.0,
            color: number_style.1,
        });
        if classic {
            page.rects.push(FillRect {
                x: left,
                y: top + line_height + gap / 2.0,
                width: right - left,
                height: 0.4,
                color: RULE,
            });
        }
        self.y += gap;
    }

    fn image(&mut self, img: &Element) {
        let Some(src) = img.src().filter(|s| !s.trim().is_empty()) else {
            return;
        };
        let max_height = if img.has_class("cover-photo") {
            mm_to_pt(150.0)
        } else if img.has_class("front-matter-photo") {
            mm_to_pt(220.0)
        } else {
            f32::INFINITY
        };
        let available = self.remaining().min(max_height);
        let max_width = self.geometry.width();

        // Unknown sizes (remote URLs, undecodable data) get a 4:3 box.
        let (px_w, px_h) = image_dimensions(src).unwrap_or((4, 3));
        let (width, height) = fit(px_w as f32, px_h as f32, max_width, available);
        if height <= 0.0 {
            self.clipped += 1;
            return;
        }

        let x = self.geometry.left + (max_width - width) / 2.0;
        let y = self.y;
        self.page().images.push(ImageBox {
            src: src.to_string(),
            x,
            y,
            width,
            height,
        });
        self.y += height + 12.0;
        self.last_space = 12.0;
    }

    /// Shaded box filling the rest of the page with a centred label.
    fn placeholder(&mut self, label: &str) {
        let height = self.remaining();
        let (left, width) = (self.geometry.left, self.geometry.width());
        let y = self.y;
        self.page().rects.push(FillRect {
            x: left,
            y,
            width,
            height,
            color: PLACEHOLDER_FILL,
        });

        let style = TextStyle::new(14.0, FontStyle::Italic, MUTED, 0.0);
        let label = label.trim();
        let label_width = self.fonts.measure_text_width(label, style.size, style.style);
        let x = left + ((width - label_width) / 2.0).max(0.0);
        self.page().lines.push(TextLine {
            text: label.to_string(),
            x,
            y: y + (height - style.size * LINE_HEIGHT) / 2.0,
            font_size: style.size,
            style: style.style,
            color: style.color,
        });
        self.y = self.geometry.bottom;
        self.last_space = 0.0;
    }

    /// Shift the current page's content so it sits in the vertical middle.
    fn center_vertically(&mut self) {
        let used = self.y - self.last_space - self.geometry.top;
        let offset = ((self.geometry.bottom - self.geometry.top - used) / 2.0).max(0.0);
        if offset == 0.0 {
            return;
        }
        let page = self.page();
        page.lines.iter_mut().for_each(|l| l.y += offset);
        page.images.iter_mut().for_each(|i| i.y += offset);
        page.rects.iter_mut().for_each(|r| r.y += offset);
    }
}

fn paragraph_style(p: &Element) -> TextStyle {
    if p.has_class("cover-author") {
        TextStyle::new(16.0, FontStyle::Italic, INK, 4.0)
    } else if p.has_class("cover-year") {
        TextStyle::new(12.0, FontStyle::Regular, MUTED, 4.0)
    } else if p.has_class("front-matter-text") || p.has_class("divider-subtitle") {
        TextStyle::new(14.0, FontStyle::Italic, INK, 6.0)
    } else if p.has_class("caption") {
        TextStyle::new(11.0, FontStyle::Italic, MUTED, 6.0)
    } else {
        BODY
    }
}

/// Scale `w × h` to fit inside `max_w × max_h`, never enlarging past the
/// available width.
fn fit(w: f32, h: f32, max_w: f32, max_h: f32) -> (f32, f32) {
    if w <= 0.0 || h <= 0.0 || max_h <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_w / w).min(max_h / h);
    (w * scale, h * scale)
}

/// Greedy word wrap against measured widths. Words wider than a line are
/// broken between characters.
pub fn wrap_text(fonts: &FontManager, text: &str, size: f32, style: FontStyle, max_width: f32) -> Vec<String> {
    let space = fonts.measure_text_width(" ", size, style);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut width = 0.0;

    for word in text.split_whitespace() {
        let word_width = fonts.measure_text_width(word, size, style);
        if current.is_empty() && word_width <= max_width {
            current.push_str(word);
            width = word_width;
            continue;
        }
        if !current.is_empty() && width + space + word_width <= max_width {
            current.push(' ');
            current.push_str(word);
            width += space + word_width;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            width = 0.0;
        }
        if word_width <= max_width {
            current.push_str(word);
            width = word_width;
            continue;
        }
        for ch in word.chars() {
            let ch_width = fonts.measure_text_width(ch.encode_utf8(&mut [0; 4]), size, style);
            if !current.is_empty() && width + ch_width > max_width {
                lines.push(std::mem::take(&mut current));
                width = 0.0;
            }
            current.push(ch);
            width += ch_width;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose;
    use crate::model::{Cookbook, Recipe};

    fn recipe(n: usize) -> Recipe {
        Recipe {
            id: format!("r{n}"),
            title: format!("Recipe {n}"),
            ingredients: vec!["Salt".into(), "Water".into()],
            directions: vec!["Boil".into(), "Serve".into()],
            photo_url: None,
        }
    }

    fn book(recipes: usize) -> Cookbook {
        Cookbook {
            name: "Layout Book".into(),
            author: "Ana".into(),
            recipes: (1..=recipes).map(recipe).collect(),
            ..Cookbook::default()
        }
    }

    #[test]
    fn one_page_per_page_block_plus_toc() {
        let doc = compose(&book(2));
        let layout = layout_document(&doc.html, &RenderOptions::default(), &FontManager::new());
        let kinds: Vec<&str> = layout.pages.iter().map(|p| p.block.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["cover", "toc", "recipe", "recipe-photo", "recipe", "recipe-photo"]
        );
    }

    #[test]
    fn toc_flows_over_pages() {
        let doc = compose(&book(120));
        let layout = layout_document(&doc.html, &RenderOptions::default(), &FontManager::new());
        let toc_pages = layout.pages.iter().filter(|p| p.block == "toc").count();
        assert!(toc_pages > 1, "expected the TOC to need several pages");
        assert_eq!(layout.pages.len(), doc.page_count + toc_pages);

        let last_toc = layout.pages.iter().rev().find(|p| p.block == "toc").unwrap();
        assert!(last_toc.text().contains(&"Recipe 120"));
        assert!(last_toc.text().contains(&"240"));
    }

    #[test]
    fn recipe_page_has_numbered_directions() {
        let doc = compose(&book(1));
        let layout = layout_document(&doc.html, &RenderOptions::default(), &FontManager::new());
        let recipe = layout.pages.iter().find(|p| p.block == "recipe").unwrap();
        let text = recipe.text();
        assert!(text.contains(&"Recipe 1"));
        assert!(text.contains(&"INGREDIENTS"));
        assert!(text.contains(&"1."));
        assert!(text.contains(&"2."));
        assert!(text.contains(&"Serve"));
    }

    #[test]
    fn placeholder_is_centered_label() {
        let doc = compose(&book(1));
        let layout = layout_document(&doc.html, &RenderOptions::default(), &FontManager::new());
        let photo = layout.pages.iter().find(|p| p.block == "recipe-photo").unwrap();
        assert_eq!(photo.rects.len(), 1);
        assert_eq!(photo.text(), vec!["No photo"]);
    }

    #[test]
    fn overflowing_page_block_is_clipped() {
        let mut book = book(1);
        book.recipes[0].directions = (0..400).map(|i| format!("Step {i}")).collect();
        let doc = compose(&book);
        let layout = layout_document(&doc.html, &RenderOptions::default(), &FontManager::new());
        assert_eq!(layout.pages.iter().filter(|p| p.block == "recipe").count(), 1);
        let recipe = layout.pages.iter().find(|p| p.block == "recipe").unwrap();
        let bottom = layout.page_height_pt - mm_to_pt(PAGE_MARGIN_MM);
        assert!(recipe.lines.iter().all(|l| l.y <= bottom));
    }

    #[test]
    fn cover_text_is_centered() {
        let doc = compose(&book(0));
        let layout = layout_document(&doc.html, &RenderOptions::default(), &FontManager::new());
        assert_eq!(layout.pages.len(), 1);
        let title = &layout.pages[0].lines[0];
        assert_eq!(title.text, "Layout Book");
        assert!(title.x > mm_to_pt(PAGE_MARGIN_MM));
        assert!(title.y > layout.page_height_pt / 4.0);
    }

    #[test]
    fn wrap_breaks_on_words_and_long_tokens() {
        let fonts = FontManager::new();
        let lines = wrap_text(&fonts, "aaa bbb ccc", 10.0, FontStyle::Regular, 30.0);
        assert_eq!(lines, vec!["aaa", "bbb", "ccc"]);
        // a b d e = 5.56pt, c = 5.0pt, f = 2.78pt: "abcdef" overflows 28pt.
        let lines = wrap_text(&fonts, "abcdefghijkl", 10.0, FontStyle::Regular, 28.0);
        assert_eq!(lines, vec!["abcde", "fghijkl"]);
        assert!(wrap_text(&fonts, "   ", 10.0, FontStyle::Regular, 100.0).is_empty());
    }

    #[test]
    fn wrapped_lines_fit_their_width() {
        let fonts = FontManager::new();
        let text = "Whisk the yolks with sugar until pale, then fold in the mascarpone and whipped whites";
        let lines = wrap_text(&fonts, text, 11.0, FontStyle::Regular, 120.0);
        assert!(lines.len() > 2);
        for line in &lines {
            assert!(fonts.measure_text_width(line, 11.0, FontStyle::Regular) <= 120.0, "{line}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn narrow_letters_pack_more_per_line() {
        let fonts = FontManager::new();
        let narrow = wrap_text(&fonts, &"il ".repeat(60), 11.0, FontStyle::Regular, 200.0);
        let wide = wrap_text(&fonts, &"WM ".repeat(60), 11.0, FontStyle::Regular, 200.0);
        assert!(narrow.len() < wide.len());
    }

    #[test]
    fn unicode_text_is_kept_verbatim() {
        let mut book = book(1);
        book.recipes[0].title = "味噌汁 Miso".into();
        let doc = compose(&book);
        let layout = layout_document(&doc.html, &RenderOptions::default(), &FontManager::new());
        let recipe = layout.pages.iter().find(|p| p.block == "recipe").unwrap();
        assert!(recipe.text().contains(&"味噌汁 Miso"));
    }
}
