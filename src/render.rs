//! PDF writer – takes a [`DraftLayout`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API), embedding the faces of a [`FontManager`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use printpdf::*;

use crate::error::RenderError;
use crate::fonts::{FontManager, FONT_ENV};
use crate::layout_config::{DraftLayout, FontStyle, ImageBox, TextLine};

const PT_TO_MM: f32 = 0.352_778;
const MISSING_IMAGE_FILL: [f32; 3] = [0.88, 0.86, 0.83];

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Render a layout into PDF bytes.
///
/// Images whose `src` is not a base64 data URI, or whose bytes cannot be
/// decoded, are drawn as a plain shaded box and a warning is logged.
/// Characters the faces have no glyph for are counted and reported in a
/// warning.
pub fn render_pdf(layout: &DraftLayout, fonts: &FontManager) -> Result<Vec<u8>, RenderError> {
    let page_w = Mm(layout.page_width_pt * PT_TO_MM);
    let page_h = Mm(layout.page_height_pt * PT_TO_MM);

    let mut doc = PdfDocument::new(&layout.title);
    let font_ids = register_fonts(&mut doc, layout, fonts)?;

    let missing: usize = layout
        .pages
        .iter()
        .flat_map(|p| &p.lines)
        .map(|l| fonts.missing_glyphs(&l.text, l.style))
        .sum();
    if missing > 0 {
        log::warn!(
            "{missing} character(s) have no glyph in '{}'; set {FONT_ENV} to a face that covers them",
            fonts.get(FontStyle::Regular).name
        );
    }

    // Register each distinct image once.
    let srcs: BTreeSet<&str> = layout
        .pages
        .iter()
        .flat_map(|p| p.images.iter().map(|i| i.src.as_str()))
        .collect();

    let mut images: HashMap<&str, ImageResource> = HashMap::new();
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    for src in srcs {
        let bytes = match parse_data_uri(src) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("Skipping image: {e}");
                continue;
            }
        };
        let decoded = match ::image::load_from_memory(&bytes) {
            Ok(img) => img,
            Err(e) => {
                log::warn!("Skipping image: decode error: {e}");
                continue;
            }
        };
        let raw = match RawImage::decode_from_bytes(&bytes, &mut warnings) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Skipping image: PDF encode error: {e}");
                continue;
            }
        };
        images.insert(
            src,
            ImageResource {
                xobj_id: doc.add_image(&raw),
                px_width: decoded.width(),
                px_height: decoded.height(),
            },
        );
    }

    let mut pages = Vec::with_capacity(layout.pages.len().max(1));
    for page in &layout.pages {
        let mut ops = Vec::new();
        for rect in &page.rects {
            fill_rect(&mut ops, rect.x, rect.y, rect.width, rect.height, rect.color, layout.page_height_pt);
        }
        for image in &page.images {
            draw_image(&mut ops, image, images.get(image.src.as_str()), layout.page_height_pt);
        }
        for line in &page.lines {
            if let Some(font) = font_ids.get(&fonts.face_index(line.style)) {
                draw_text(&mut ops, line, font, fonts, layout.page_height_pt);
            }
        }
        pages.push(PdfPage::new(page_w, page_h, ops));
    }

    // Ensure at least one page.
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    let bytes = doc.save(&PdfSaveOptions::default(), &mut Vec::new());
    if bytes.is_empty() {
        return Err(RenderError::Pdf("printpdf produced an empty document".into()));
    }
    Ok(bytes)
}

/// Embed each face the layout's text uses, once.
fn register_fonts(
    doc: &mut PdfDocument,
    layout: &DraftLayout,
    fonts: &FontManager,
) -> Result<BTreeMap<usize, FontId>, RenderError> {
    let used: BTreeSet<usize> = layout
        .pages
        .iter()
        .flat_map(|p| &p.lines)
        .map(|l| fonts.face_index(l.style))
        .collect();

    let mut ids = BTreeMap::new();
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    for index in used {
        let data = &fonts.faces()[index];
        let parsed = ParsedFont::from_bytes(data.bytes(), 0, &mut warnings)
            .ok_or_else(|| RenderError::Font(format!("printpdf could not load '{}'", data.name)))?;
        ids.insert(index, doc.add_font(&parsed));
    }
    Ok(ids)
}

/// Pixel dimensions of a base64 data-URI image, if it decodes.
pub fn image_dimensions(src: &str) -> Option<(u32, u32)> {
    let bytes = parse_data_uri(src).ok()?;
    let img = ::image::load_from_memory(&bytes).ok()?;
    Some((img.width(), img.height()))
}

fn rgb(color: [f32; 3]) -> Color {
    Color::Rgb(Rgb {
        r: color[0],
        g: color[1],
        b: color[2],
        icc_profile: None,
    })
}

fn corner(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Filled rectangle; `y` is the top edge measured from the top of the page.
fn fill_rect(ops: &mut Vec<Op>, x: f32, y: f32, width: f32, height: f32, color: [f32; 3], page_height: f32) {
    // PDF origin is bottom-left.
    let top = page_height - y;
    let bottom = top - height;
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![
                    corner(x, bottom),
                    corner(x + width, bottom),
                    corner(x + width, top),
                    corner(x, top),
                ],
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    });
}

fn draw_image(ops: &mut Vec<Op>, image: &ImageBox, resource: Option<&ImageResource>, page_height: f32) {
    let Some(res) = resource else {
        fill_rect(ops, image.x, image.y, image.width, image.height, MISSING_IMAGE_FILL, page_height);
        return;
    };
    // At dpi=72 printpdf renders 1 px = 1 pt, so scale = desired_pt / px.
    let scale_x = if res.px_width > 0 {
        image.width / res.px_width as f32
    } else {
        1.0
    };
    let scale_y = if res.px_height > 0 {
        image.height / res.px_height as f32
    } else {
        1.0
    };
    ops.push(Op::UseXobject {
        id: res.xobj_id.clone(),
        transform: XObjectTransform {
            translate_x: Some(Pt(image.x)),
            translate_y: Some(Pt(page_height - image.y - image.height)),
            dpi: Some(72.0),
            scale_x: Some(scale_x),
            scale_y: Some(scale_y),
            rotate: None,
        },
    });
}

fn draw_text(ops: &mut Vec<Op>, line: &TextLine, font: &FontId, fonts: &FontManager, page_height: f32) {
    if line.text.is_empty() {
        return;
    }
    let baseline = page_height - line.y - fonts.ascender_pt(line.font_size, line.style);

    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(line.x),
            y: Pt(baseline),
        },
    });
    ops.push(Op::SetFontSize {
        size: Pt(line.font_size),
        font: font.clone(),
    });
    ops.push(Op::SetFillColor { col: rgb(line.color) });
    ops.push(Op::WriteText {
        items: text_items(&line.text, fonts.space_em(line.style)),
        font: font.clone(),
    });
    ops.push(Op::EndTextSection);
}

/// Words as text runs with spaces written as positioning offsets, so a face
/// without a space glyph still spaces words by its measured width.
fn text_items(text: &str, space_em: f32) -> Vec<TextItem> {
    let mut items = Vec::new();
    for (i, word) in text.split(' ').enumerate() {
        if i > 0 {
            // Offsets are in thousandths of an em; negative moves right.
            items.push(TextItem::Offset(-space_em * 1000.0));
        }
        if !word.is_empty() {
            items.push(TextItem::Text(word.to_string()));
        }
    }
    items
}

/// Parse a `data:<mime>;base64,<data>` URI and return the decoded bytes.
fn parse_data_uri(src: &str) -> Result<Vec<u8>, String> {
    let Some(rest) = src.strip_prefix("data:") else {
        let preview: String = src.chars().take(80).collect();
        return Err(format!("only base64 data URIs can be embedded, got {preview:?}"));
    };
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| "invalid data URI: missing ',' separator".to_string())?;
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::PageFormat;

    // 1×1 transparent PNG.
    const PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn render_empty_layout() {
        let layout = DraftLayout::new("Empty", PageFormat::A4);
        let bytes = render_pdf(&layout, &FontManager::new()).unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn remote_image_becomes_shaded_box() {
        let mut layout = DraftLayout::new("Photo", PageFormat::A4);
        layout.push_page("recipe-photo").images.push(ImageBox {
            src: "https://example.com/soup.jpg".into(),
            x: 51.0,
            y: 51.0,
            width: 200.0,
            height: 150.0,
        });
        let bytes = render_pdf(&layout, &FontManager::new()).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn data_uri_dimensions() {
        assert_eq!(image_dimensions(PIXEL_PNG), Some((1, 1)));
        assert_eq!(image_dimensions("https://example.com/a.png"), None);
        assert_eq!(image_dimensions("data:image/png,notbase64"), None);
    }

    #[test]
    fn spaces_become_offsets() {
        let items = text_items("Add  passata", 0.278);
        assert_eq!(items.len(), 4);
        assert!(matches!(&items[0], TextItem::Text(t) if t == "Add"));
        assert!(matches!(items[1], TextItem::Offset(o) if (o + 278.0).abs() < 0.01));
        assert!(matches!(items[2], TextItem::Offset(_)));
        assert!(matches!(&items[3], TextItem::Text(t) if t == "passata"));
    }

    fn line(text: &str, style: FontStyle) -> TextLine {
        TextLine {
            text: text.into(),
            x: 51.0,
            y: 51.0,
            font_size: 12.0,
            style,
            color: [0.0, 0.0, 0.0],
        }
    }

    #[test]
    fn non_ascii_text_is_not_replaced() {
        let mut layout = DraftLayout::new("Miso", PageFormat::A4);
        let page = layout.push_page("recipe");
        page.lines.push(line("味噌汁 Miso", FontStyle::Bold));
        page.lines.push(line("Crème brûlée", FontStyle::Regular));
        let bytes = render_pdf(&layout, &FontManager::new()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(!bytes.windows(8).any(|w| w == b"??? Miso"));
        assert!(!bytes.windows(12).any(|w| w == b"Creme brulee"));
    }

    #[test]
    fn one_face_per_style_used() {
        let fonts = FontManager::new();
        let mut layout = DraftLayout::new("Faces", PageFormat::A4);
        let page = layout.push_page("recipe");
        page.lines.push(line("Soup", FontStyle::Bold));
        page.lines.push(line("Water", FontStyle::Regular));
        page.lines.push(line("Salt", FontStyle::Regular));
        let mut doc = PdfDocument::new("Faces");
        let ids = register_fonts(&mut doc, &layout, &fonts).unwrap();
        assert_eq!(ids.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
    }
}
