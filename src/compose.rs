//! Document composer – orders the content items, dispatches each to its
//! fragment renderer and assembles cover, front matter, TOC and body into a
//! single HTML document.
//!
//! Composition is a pure function of the cookbook: the same input always
//! produces byte-identical markup.

use std::collections::HashMap;

use html_escape::encode_text;

use crate::fragments::{
    render_cover, render_divider, render_front_matter, render_recipe, render_toc, Fragment,
};
use crate::model::{ContentKind, ContentRef, Cookbook, Divider, Recipe};
use crate::style::stylesheet;
use crate::toc::{estimate_toc, TocEntry};

/// The composed document plus what the composer learned building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedDocument {
    pub html: String,
    /// Page blocks in `html` (the flowing TOC section is not one).
    pub page_count: usize,
    pub toc: Vec<TocEntry>,
}

/// One resolved body item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContentItem<'a> {
    Recipe(&'a Recipe),
    Divider(&'a Divider),
}

impl<'a> ContentItem<'a> {
    pub fn id(&self) -> &'a str {
        match *self {
            ContentItem::Recipe(r) => &r.id,
            ContentItem::Divider(d) => &d.id,
        }
    }

    fn render(&self) -> Fragment {
        match self {
            ContentItem::Recipe(r) => render_recipe(r),
            ContentItem::Divider(d) => render_divider(d),
        }
    }
}

/// Resolve the body order.
///
/// Uses `content_order` when it is non-empty, otherwise every recipe in
/// collection order (and no dividers). References that do not resolve are
/// skipped.
pub fn content_sequence(cookbook: &Cookbook) -> Vec<ContentItem<'_>> {
    if cookbook.content_order.is_empty() {
        return cookbook.recipes.iter().map(ContentItem::Recipe).collect();
    }

    // Id-less items can only appear through the default order.
    let mut recipes: HashMap<&str, &Recipe> = HashMap::with_capacity(cookbook.recipes.len());
    for recipe in cookbook.recipes.iter().filter(|r| !r.id.is_empty()) {
        recipes.entry(recipe.id.as_str()).or_insert(recipe);
    }
    let mut dividers: HashMap<&str, &Divider> = HashMap::with_capacity(cookbook.dividers.len());
    for divider in cookbook.dividers.iter().filter(|d| !d.id.is_empty()) {
        dividers.entry(divider.id.as_str()).or_insert(divider);
    }

    cookbook
        .content_order
        .iter()
        .filter_map(|content_ref| {
            let resolved = resolve(content_ref, &recipes, &dividers);
            if resolved.is_none() {
                log::debug!(
                    "Skipping unresolved {:?} reference '{}'",
                    content_ref.kind,
                    content_ref.id
                );
            }
            resolved
        })
        .collect()
}

fn resolve<'a>(
    content_ref: &ContentRef,
    recipes: &HashMap<&str, &'a Recipe>,
    dividers: &HashMap<&str, &'a Divider>,
) -> Option<ContentItem<'a>> {
    match content_ref.kind {
        ContentKind::Recipe => recipes
            .get(content_ref.id.as_str())
            .copied()
            .map(ContentItem::Recipe),
        ContentKind::Divider => dividers
            .get(content_ref.id.as_str())
            .copied()
            .map(ContentItem::Divider),
        ContentKind::Unknown => None,
    }
}

/// Compose the full document.
pub fn compose(cookbook: &Cookbook) -> ComposedDocument {
    let mut body = Fragment::empty();
    for item in content_sequence(cookbook) {
        body.append(item.render());
    }

    let mut front_matter = Fragment::empty();
    for page in &cookbook.front_matter_pages {
        front_matter.append(render_front_matter(page));
    }

    // Always from the recipe collection, never from content_order.
    let style = cookbook.toc_style();
    let toc = estimate_toc(&cookbook.recipes, style);

    let mut content = render_cover(cookbook);
    content.append(front_matter);
    content.append(render_toc(&toc, style));
    content.append(body);

    log::debug!(
        "Composed '{}': {} page blocks, {} TOC entries",
        cookbook.name,
        content.pages,
        toc.len()
    );

    ComposedDocument {
        html: wrap_document(cookbook.cover_title(), &content.html),
        page_count: content.pages,
        toc,
    }
}

/// Convenience: composed markup only.
pub fn compose_html(cookbook: &Cookbook) -> String {
    compose(cookbook).html
}

fn wrap_document(title: &str, content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        encode_text(title),
        stylesheet(),
        content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cover, FrontMatterPage};

    fn recipe(id: &str, title: &str) -> Recipe {
        Recipe {
            id: id.into(),
            title: title.into(),
            ingredients: vec!["Flour".into()],
            directions: vec!["Mix".into()],
            photo_url: None,
        }
    }

    fn divider(id: &str, title: &str) -> Divider {
        Divider {
            id: id.into(),
            title: title.into(),
            subtitle: None,
        }
    }

    fn book() -> Cookbook {
        Cookbook {
            name: "Test Kitchen".into(),
            author: "Sam".into(),
            recipes: vec![recipe("r1", "Soup"), recipe("r2", "Bread"), recipe("r3", "Pie")],
            dividers: vec![divider("d1", "Starters"), divider("d2", "Sweets")],
            ..Cookbook::default()
        }
    }

    #[test]
    fn empty_reference_does_not_match_idless_recipe() {
        let mut book = book();
        book.recipes[0].id = String::new();
        book.content_order = vec![ContentRef::recipe(""), ContentRef::recipe("r2")];
        assert_eq!(ids(&content_sequence(&book)), vec!["r2"]);
    }

        fn ids(items: &[ContentItem<'_>]) -> Vec<String> {
        items.iter().map(|i| i.id().to_string()).collect()
    }

    #[test]
    fn default_order_is_recipes_only() {
        let book = book();
        let seq = content_sequence(&book);
        assert_eq!(ids(&seq), vec!["r1", "r2", "r3"]);
        assert!(seq.iter().all(|i| matches!(i, ContentItem::Recipe(_))));
    }

    #[test]
    fn explicit_order_interleaves_dividers() {
        let mut book = book();
        book.content_order = vec![
            ContentRef::divider("d2"),
            ContentRef::recipe("r3"),
            ContentRef::divider("d1"),
            ContentRef::recipe("r1"),
        ];
        assert_eq!(ids(&content_sequence(&book)), vec!["d2", "r3", "d1", "r1"]);
    }

    #[test]
    fn unresolved_refs_are_skipped() {
        let mut book = book();
        book.content_order = vec![
            ContentRef::recipe("missing"),
            ContentRef::recipe("r2"),
            ContentRef::divider("r1"),
            ContentRef {
                id: "d1".into(),
                kind: ContentKind::Unknown,
            },
        ];
        assert_eq!(ids(&content_sequence(&book)), vec!["r2"]);

        let doc = compose(&book);
        // cover + one recipe
        assert_eq!(doc.page_count, 3);
    }

    #[test]
    fn document_order_is_cover_front_matter_toc_body() {
        let mut book = book();
        book.front_matter_pages = vec![FrontMatterPage::Dedication {
            text: Some("For everyone who cooked with us".into()),
        }];
        let html = compose(&book).html;
        let cover = html.find("class=\"page cover\"").unwrap();
        let dedication = html.find("class=\"page front-matter dedication\"").unwrap();
        let toc = html.find("class=\"toc toc-classic\"").unwrap();
        let first_recipe = html.find("class=\"page recipe\"").unwrap();
        assert!(cover < dedication && dedication < toc && toc < first_recipe);
    }

    #[test]
    fn toc_ignores_content_order() {
        let mut book = book();
        book.content_order = vec![ContentRef::recipe("r3"), ContentRef::divider("d1")];
        let doc = compose(&book);
        let titles: Vec<&str> = doc.toc.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Soup", "Bread", "Pie"]);
        assert_eq!(doc.toc[2].page_number, 6);
    }

    #[test]
    fn page_count_adds_up() {
        let mut book = book();
        book.cover = Some(Cover::default());
        book.front_matter_pages = vec![
            FrontMatterPage::Foreword { text: None },
            FrontMatterPage::Unknown,
        ];
        book.content_order = vec![
            ContentRef::divider("d1"),
            ContentRef::recipe("r1"),
            ContentRef::recipe("r2"),
        ];
        let doc = compose(&book);
        // cover 1 + foreword 1 + divider 1 + 2 recipes × 2
        assert_eq!(doc.page_count, 7);
        assert_eq!(doc.html.matches("class=\"page ").count(), 7);
    }

    #[test]
    fn document_embeds_stylesheet_once() {
        let html = compose_html(&book());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert_eq!(html.matches("<style>").count(), 1);
        assert!(html.contains("<title>Test Kitchen</title>"));
    }

    #[test]
    fn duplicate_ids_resolve_to_first() {
        let mut book = book();
        book.recipes.push(recipe("r1", "Second Soup"));
        book.content_order = vec![ContentRef::recipe("r1")];
        let html = compose_html(&book);
        assert!(html.contains(">Soup</h2>"));
        assert!(!html.contains("Second Soup</h2>"));
    }
}
