//! Content fragment renderers.
//!
//! Each renderer turns one typed record into a [`Fragment`]: markup made of
//! zero or more page blocks (`<div class="page …">`). Missing optional text
//! renders as nothing; no renderer can fail.

use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::model::{non_empty, Cookbook, Divider, FrontMatterPage, Recipe, TocStyle};
use crate::toc::TocEntry;

/// Literal shown on a recipe's photo page when it has no photo.
pub const NO_PHOTO: &str = "No photo";

/// Rendered markup for one content item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub html: String,
    /// Number of page blocks in `html`.
    pub pages: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }

    /// Wrap `body` in a single page block carrying the extra `classes`.
    fn page(classes: &str, body: &str) -> Self {
        Self {
            html: format!("<div class=\"page {classes}\">\n{body}</div>\n"),
            pages: 1,
        }
    }

    pub fn append(&mut self, other: Fragment) {
        self.html.push_str(&other.html);
        self.pages += other.pages;
    }
}

/// Cover: one page with photo, title, author line and year line.
pub fn render_cover(cookbook: &Cookbook) -> Fragment {
    let cover = cookbook.cover.clone().unwrap_or_default();
    let mut body = String::new();

    if let Some(url) = cover.photo() {
        let _ = writeln!(body, "<img class=\"cover-photo\" src=\"{}\" alt=\"\">", attr(url));
    }
    let _ = writeln!(
        body,
        "<h1 class=\"cover-title\">{}</h1>",
        text(cookbook.cover_title())
    );
    if cover.author_visible && !cookbook.author.trim().is_empty() {
        let _ = writeln!(
            body,
            "<p class=\"cover-author\">By {}</p>",
            text(&cookbook.author)
        );
    }
    if let Some(year) = cover.visible_year() {
        let _ = writeln!(body, "<p class=\"cover-year\">{}</p>", text(year));
    }

    Fragment::page("cover", &body)
}

/// Recipe: always two pages, text then photo.
pub fn render_recipe(recipe: &Recipe) -> Fragment {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<h2 class=\"recipe-title\">{}</h2>",
        text(&recipe.title)
    );

    body.push_str("<h3>Ingredients</h3>\n<ul class=\"ingredients\">\n");
    for item in &recipe.ingredients {
        let _ = writeln!(body, "<li>{}</li>", text(item));
    }
    body.push_str("</ul>\n");

    body.push_str("<h3>Directions</h3>\n<ol class=\"directions\">\n");
    for step in &recipe.directions {
        let _ = writeln!(body, "<li>{}</li>", text(step));
    }
    body.push_str("</ol>\n");

    let mut fragment = Fragment::page("recipe", &body);

    let photo = match recipe.photo() {
        Some(url) => format!(
            "<img class=\"recipe-photo-img\" src=\"{}\" alt=\"{}\">\n",
            attr(url),
            attr(&recipe.title)
        ),
        None => format!("<div class=\"photo-placeholder\">{NO_PHOTO}</div>\n"),
    };
    fragment.append(Fragment::page("recipe-photo", &photo));
    fragment
}

/// Divider: one page with title and optional subtitle.
pub fn render_divider(divider: &Divider) -> Fragment {
    let mut body = format!(
        "<h1 class=\"divider-title\">{}</h1>\n",
        text(&divider.title)
    );
    if let Some(subtitle) = non_empty(divider.subtitle.as_deref()) {
        let _ = writeln!(body, "<p class=\"divider-subtitle\">{}</p>", text(subtitle));
    }
    Fragment::page("divider", &body)
}

/// Front matter: one page per recognised entry, nothing for unknown tags.
pub fn render_front_matter(page: &FrontMatterPage) -> Fragment {
    match page {
        FrontMatterPage::Dedication { text: t } => centered_text("dedication", t.as_deref()),
        FrontMatterPage::Foreword { text: t } => centered_text("foreword", t.as_deref()),
        FrontMatterPage::Photo { photo_url, caption } => {
            let mut body = String::new();
            if let Some(url) = non_empty(photo_url.as_deref()) {
                let _ = writeln!(
                    body,
                    "<img class=\"front-matter-photo\" src=\"{}\" alt=\"\">",
                    attr(url)
                );
            }
            if let Some(caption) = non_empty(caption.as_deref()) {
                let _ = writeln!(body, "<p class=\"caption\">{}</p>", text(caption));
            }
            Fragment::page("front-matter photo-page", &body)
        }
        FrontMatterPage::Story { title, text: t } => {
            let mut body = String::new();
            if let Some(title) = non_empty(title.as_deref()) {
                let _ = writeln!(body, "<h2 class=\"story-title\">{}</h2>", text(title));
            }
            let _ = writeln!(
                body,
                "<p class=\"story-text\">{}</p>",
                text(t.as_deref().unwrap_or_default())
            );
            Fragment::page("front-matter story", &body)
        }
        FrontMatterPage::Unknown => Fragment::empty(),
    }
}

fn centered_text(kind: &str, body_text: Option<&str>) -> Fragment {
    let body = format!(
        "<p class=\"front-matter-text\">{}</p>\n",
        text(body_text.unwrap_or_default())
    );
    Fragment::page(&format!("front-matter {kind}"), &body)
}

/// Table of contents.
///
/// The TOC is a flowing section rather than a fixed-size page block: its
/// length grows with the recipe count. It contributes no page blocks and is
/// omitted entirely when there is nothing to list.
pub fn render_toc(entries: &[TocEntry], style: TocStyle) -> Fragment {
    if entries.is_empty() {
        return Fragment::empty();
    }
    let mut html = format!(
        "<section class=\"toc toc-{}\">\n<h2>Table of Contents</h2>\n<ol class=\"toc-entries\">\n",
        style.as_str()
    );
    for entry in entries {
        let _ = writeln!(
            html,
            "<li class=\"toc-entry\"><span class=\"toc-title\">{}</span><span class=\"toc-page\">{}</span></li>",
            text(&entry.title),
            entry.page_number
        );
    }
    html.push_str("</ol>\n</section>\n");
    Fragment { html, pages: 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cover;

    fn page_blocks(html: &str) -> usize {
        html.matches("class=\"page ").count()
    }

    fn book_with_cover(cover: Option<Cover>) -> Cookbook {
        Cookbook {
            name: "The Family Table".into(),
            author: "Rosa Delgado".into(),
            cover,
            ..Cookbook::default()
        }
    }

    #[test]
    fn cover_defaults_without_cover_record() {
        let f = render_cover(&book_with_cover(None));
        assert_eq!(f.pages, 1);
        assert!(f.html.contains("The Family Table"));
        assert!(f.html.contains("By Rosa Delgado"));
        assert!(!f.html.contains("<img"));
        assert!(!f.html.contains("cover-year"));
    }

    #[test]
    fn cover_hides_author_and_year() {
        let cover = Cover {
            title: Some("Holiday Baking".into()),
            author_visible: false,
            year: Some("2023".into()),
            year_visible: false,
            photo_url: Some("https://img.example/cover.jpg".into()),
        };
        let f = render_cover(&book_with_cover(Some(cover)));
        assert!(f.html.contains("Holiday Baking"));
        assert!(!f.html.contains("cover-author"));
        assert!(!f.html.contains("2023"));
        assert!(f.html.contains("src=\"https://img.example/cover.jpg\""));
    }

    #[test]
    fn cover_shows_visible_year() {
        let cover = Cover {
            year: Some("1998".into()),
            ..Cover::default()
        };
        let f = render_cover(&book_with_cover(Some(cover)));
        assert!(f.html.contains("<p class=\"cover-year\">1998</p>"));
    }

    #[test]
    fn recipe_is_two_pages_with_numbered_directions() {
        let recipe = Recipe {
            id: "soup".into(),
            title: "Soup".into(),
            ingredients: vec!["Water".into(), "Salt".into()],
            directions: vec!["Boil".into(), "Season".into()],
            photo_url: None,
        };
        let f = render_recipe(&recipe);
        assert_eq!(f.pages, 2);
        assert_eq!(page_blocks(&f.html), 2);
        assert!(f.html.contains("<ol class=\"directions\">\n<li>Boil</li>\n<li>Season</li>"));
        assert!(f.html.contains("<li>Water</li>\n<li>Salt</li>"));
        assert!(f.html.contains(NO_PHOTO));
    }

    #[test]
    fn recipe_with_photo_has_no_placeholder() {
        let recipe = Recipe {
            id: "pie".into(),
            title: "Pie".into(),
            photo_url: Some("https://img.example/pie.jpg".into()),
            ..Recipe::default()
        };
        let f = render_recipe(&recipe);
        assert_eq!(f.pages, 2);
        assert!(!f.html.contains(NO_PHOTO));
        assert!(f.html.contains("alt=\"Pie\""));
    }

    #[test]
    fn recipe_text_is_escaped() {
        let recipe = Recipe {
            id: "x".into(),
            title: "Mac & Cheese <Deluxe>".into(),
            ingredients: vec!["1 \"big\" pot".into()],
            ..Recipe::default()
        };
        let f = render_recipe(&recipe);
        assert!(f.html.contains("Mac &amp; Cheese &lt;Deluxe&gt;"));
        assert!(!f.html.contains("<Deluxe>"));
    }

    #[test]
    fn divider_subtitle_is_optional() {
        let with = render_divider(&Divider {
            id: "d".into(),
            title: "Desserts".into(),
            subtitle: Some("Sweet endings".into()),
        });
        assert_eq!(with.pages, 1);
        assert!(with.html.contains("Sweet endings"));

        let without = render_divider(&Divider {
            id: "d".into(),
            title: "Desserts".into(),
            subtitle: None,
        });
        assert!(!without.html.contains("divider-subtitle"));
    }

    #[test]
    fn front_matter_variants() {
        let dedication = render_front_matter(&FrontMatterPage::Dedication { text: None });
        assert_eq!(dedication.pages, 1);
        assert!(dedication.html.contains("<p class=\"front-matter-text\"></p>"));

        let photo = render_front_matter(&FrontMatterPage::Photo {
            photo_url: None,
            caption: Some("Kitchen, 1975".into()),
        });
        assert_eq!(photo.pages, 1);
        assert!(!photo.html.contains("<img"));
        assert!(photo.html.contains("Kitchen, 1975"));

        let story = render_front_matter(&FrontMatterPage::Story {
            title: None,
            text: Some("It started with bread.".into()),
        });
        assert!(!story.html.contains("story-title"));
        assert!(story.html.contains("It started with bread."));
    }

    #[test]
    fn unknown_front_matter_is_empty() {
        let f = render_front_matter(&FrontMatterPage::Unknown);
        assert!(f.is_empty());
        assert_eq!(f.pages, 0);
    }

    #[test]
    fn toc_lists_entries_without_page_blocks() {
        let entries = vec![
            TocEntry {
                title: "Soup".into(),
                page_number: 2,
            },
            TocEntry {
                title: "Bread".into(),
                page_number: 4,
            },
        ];
        let f = render_toc(&entries, TocStyle::Modern);
        assert_eq!(f.pages, 0);
        assert_eq!(page_blocks(&f.html), 0);
        assert!(f.html.contains("toc-modern"));
        assert!(f.html.contains("<span class=\"toc-title\">Bread</span><span class=\"toc-page\">4</span>"));
        assert!(render_toc(&[], TocStyle::Classic).is_empty());
    }
}
