//! Cookbook records – the typed input to the composition engine.
//!
//! Everything here is plain data. Optional collections accept `null` as well
//! as being absent, and optional URLs treat the empty string as "no photo".
//! Collection entries are read one by one: an entry of the wrong shape is
//! dropped (recipes, dividers) or kept as an inert `Unknown` (front matter,
//! content references) instead of failing the whole cookbook.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// A complete cookbook as submitted for generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cookbook {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub author: String,
    #[serde(default)]
    pub cover: Option<Cover>,
    #[serde(default)]
    pub toc_style: Option<TocStyle>,
    #[serde(default, deserialize_with = "front_matter_entries")]
    pub front_matter_pages: Vec<FrontMatterPage>,
    #[serde(default, deserialize_with = "content_items")]
    pub recipes: Vec<Recipe>,
    /// Canonical body order. Empty means "every recipe, in collection order".
    #[serde(default, deserialize_with = "content_refs")]
    pub content_order: Vec<ContentRef>,
    #[serde(default, deserialize_with = "content_items")]
    pub dividers: Vec<Divider>,
}

impl Cookbook {
    /// Parse a cookbook from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Build a cookbook from an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Serialise to pretty JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Title shown on the cover: the cover's own title, else the book name.
    pub fn cover_title(&self) -> &str {
        self.cover
            .as_ref()
            .and_then(|c| c.title.as_deref())
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.name)
    }

    pub fn toc_style(&self) -> TocStyle {
        self.toc_style.unwrap_or_default()
    }
}

/// Cover page settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cover {
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "shown", deserialize_with = "visibility")]
    pub author_visible: bool,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default = "shown", deserialize_with = "visibility")]
    pub year_visible: bool,
}

impl Default for Cover {
    fn default() -> Self {
        Self {
            photo_url: None,
            title: None,
            author_visible: true,
            year: None,
            year_visible: true,
        }
    }
}

impl Cover {
    pub fn photo(&self) -> Option<&str> {
        non_empty(self.photo_url.as_deref())
    }

    /// The year line, if it is both present and not hidden.
    pub fn visible_year(&self) -> Option<&str> {
        if self.year_visible {
            non_empty(self.year.as_deref())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub ingredients: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub directions: Vec<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl Recipe {
    pub fn photo(&self) -> Option<&str> {
        non_empty(self.photo_url.as_deref())
    }
}

/// A section divider placed between recipes via `content_order`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Divider {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
}

/// A reference into the recipe or divider collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
}

impl ContentRef {
    pub fn recipe(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ContentKind::Recipe,
        }
    }

    pub fn divider(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ContentKind::Divider,
        }
    }

    /// A reference that never resolves.
    pub fn unknown() -> Self {
        Self {
            id: String::new(),
            kind: ContentKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Recipe,
    Divider,
    /// Any other `type` value. Never resolves.
    #[serde(other)]
    Unknown,
}

/// Pages printed between the cover and the table of contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrontMatterPage {
    Dedication {
        #[serde(default)]
        text: Option<String>,
    },
    Foreword {
        #[serde(default)]
        text: Option<String>,
    },
    Photo {
        #[serde(default)]
        photo_url: Option<String>,
        #[serde(default)]
        caption: Option<String>,
    },
    Story {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
    /// Unrecognised tag; renders to nothing.
    #[serde(other)]
    Unknown,
}

/// Visual treatment of the table of contents. Never changes page numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TocStyle {
    Modern,
    Minimal,
    #[default]
    #[serde(other)]
    Classic,
}

impl TocStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            TocStyle::Classic => "classic",
            TocStyle::Modern => "modern",
            TocStyle::Minimal => "minimal",
        }
    }
}

pub(crate) fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

fn shown() -> bool {
    true
}

/// `null` reads as the type's default instead of failing.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Read a list element by element. Elements that do not parse are logged and
/// replaced by `fallback()`, or dropped when it returns `None`.
fn entries<'de, D, T>(deserializer: D, what: &str, fallback: fn() -> Option<T>) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("Ignoring malformed {what}: {e}");
                fallback()
            }
        })
        .collect())
}

fn front_matter_entries<'de, D>(deserializer: D) -> Result<Vec<FrontMatterPage>, D::Error>
where
    D: Deserializer<'de>,
{
    entries(deserializer, "front matter page", || Some(FrontMatterPage::Unknown))
}

fn content_refs<'de, D>(deserializer: D) -> Result<Vec<ContentRef>, D::Error>
where
    D: Deserializer<'de>,
{
    entries(deserializer, "content reference", || Some(ContentRef::unknown()))
}

fn content_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    entries(deserializer, "content item", || None)
}

/// Visibility flags are shown unless explicitly `false`.
fn visibility<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}
