//! Table-of-contents estimator.
//!
//! Page numbers are a fixed-stride projection: the cover is page 1 and every
//! recipe is assumed to take exactly two pages, so recipe `i` lands on
//! `2 + 2 * i`. Front matter, dividers and the TOC itself are not counted.
//! This is a known approximation; exact numbers would need real page
//! accounting across the whole document.

use serde::{Deserialize, Serialize};

use crate::model::{Recipe, TocStyle};

/// Page number assigned to the first recipe.
pub const FIRST_RECIPE_PAGE: usize = 2;

/// Pages every recipe is assumed to occupy.
pub const PAGES_PER_RECIPE: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub title: String,
    pub page_number: usize,
}

/// Estimate a TOC entry for every recipe, in collection order.
///
/// `_style` is accepted so callers can pass the book's TOC style through; it
/// does not affect the numbering.
pub fn estimate_toc(recipes: &[Recipe], _style: TocStyle) -> Vec<TocEntry> {
    recipes
        .iter()
        .enumerate()
        .map(|(i, recipe)| TocEntry {
            title: recipe.title.clone(),
            page_number: FIRST_RECIPE_PAGE + i * PAGES_PER_RECIPE,
        })
        .collect()
}
