//! Sample cookbooks for testing and demonstration.
//!
//! Each sample exercises a different part of the composer.

use crate::model::Cookbook;

/// One recipe, no cover record, no photo.
pub fn soup_json() -> &'static str {
    r#"{
    "name": "Soup Book",
    "author": "Ana",
    "recipes": [
        {
            "id": "r1",
            "title": "Soup",
            "ingredients": ["Water", "Salt"],
            "directions": ["Boil", "Serve"]
        }
    ]
}"#
}

/// Cover settings, all front-matter kinds, dividers and an explicit order
/// including a dangling reference.
pub fn family_json() -> &'static str {
    r#"{
    "name": "The Rossi Kitchen",
    "author": "Maria Rossi",
    "toc_style": "modern",
    "cover": {
        "title": "Recipes from Nonna's Table",
        "photo_url": "",
        "author_visible": true,
        "year": "2024",
        "year_visible": true
    },
    "front_matter_pages": [
        { "type": "dedication", "text": "For everyone who ever stole a meatball off the stove." },
        { "type": "foreword", "text": "These recipes travelled from Bologna to Boston in a tin box.\nNow they travel to you." },
        { "type": "photo", "photo_url": "https://images.example.com/kitchen.jpg", "caption": "The kitchen on Via Saragozza, 1961" },
        { "type": "story", "title": "Sunday Lunch", "text": "Every Sunday the table grew a leaf and the pot grew a little bigger." },
        { "type": "hologram", "text": "Not a page kind anyone renders." }
    ],
    "recipes": [
        {
            "id": "ragu",
            "title": "Ragù alla Bolognese",
            "ingredients": ["500 g beef mince", "200 g pork mince", "1 onion", "1 carrot", "1 celery stalk", "200 ml milk", "200 ml red wine", "400 g tomato passata"],
            "directions": ["Sweat the soffritto slowly in olive oil.", "Brown the meat in batches.", "Add milk and reduce, then wine and reduce.", "Add passata and simmer for three hours."],
            "photo_url": "https://images.example.com/ragu.jpg"
        },
        {
            "id": "tiramisu",
            "title": "Tiramisù",
            "ingredients": ["4 eggs", "100 g sugar", "500 g mascarpone", "300 ml espresso", "Savoiardi", "Cocoa"],
            "directions": ["Whisk yolks with sugar until pale.", "Fold in mascarpone, then whipped whites.", "Layer dipped biscuits and cream.", "Chill overnight and dust with cocoa."]
        },
        {
            "id": "focaccia",
            "title": "Focaccia",
            "ingredients": ["500 g flour", "400 ml water", "7 g yeast", "10 g salt", "Olive oil"],
            "directions": ["Mix and rest for 30 minutes.", "Fold four times over two hours.", "Dimple into an oiled tray and bake at 230 °C."]
        }
    ],
    "dividers": [
        { "id": "mains", "title": "Mains", "subtitle": "The Sunday pot" },
        { "id": "sweets", "title": "Sweets" }
    ],
    "content_order": [
        { "id": "mains", "type": "divider" },
        { "id": "ragu", "type": "recipe" },
        { "id": "focaccia", "type": "recipe" },
        { "id": "deleted-recipe", "type": "recipe" },
        { "id": "sweets", "type": "divider" },
        { "id": "tiramisu", "type": "recipe" }
    ]
}"#
}

/// No recipes, one divider placed through the content order.
pub fn divider_only_json() -> &'static str {
    r#"{
    "name": "Coming Soon",
    "author": "",
    "recipes": [],
    "dividers": [{ "id": "d1", "title": "Breakfast", "subtitle": "Recipes to come" }],
    "content_order": [{ "id": "d1", "type": "divider" }]
}"#
}

pub fn soup() -> Cookbook {
    parse(soup_json())
}

pub fn family() -> Cookbook {
    parse(family_json())
}

pub fn divider_only() -> Cookbook {
    parse(divider_only_json())
}

/// Every sample by name.
pub fn all() -> Vec<(&'static str, Cookbook)> {
    vec![
        ("soup", soup()),
        ("family", family()),
        ("divider-only", divider_only()),
    ]
}

// The fixtures above are constants covered by the tests below.
fn parse(json: &str) -> Cookbook {
    Cookbook::from_json(json).unwrap_or_default()
}
