//! Slug derivation shared by every lookup and payload that needs one.

use regex::Regex;
use std::sync::LazyLock;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("Invalid slug regex"));

/// Derive a NetBox-style slug from a display name.
///
/// Lowercases and trims, spells out `&` as `and`, collapses every run of
/// non-alphanumeric characters into one hyphen and strips leading and
/// trailing hyphens.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase().replace('&', "and");
    NON_ALNUM
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Slug for a manufacturer/model pair, as used by the device-type library.
pub fn model_slug(manufacturer: &str, model: &str) -> String {
    slugify(&format!("{manufacturer} {model}"))
}
