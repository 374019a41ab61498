use rand::distr::Alphanumeric;
use rand::Rng;

use linkcard_themes::ThemeCatalog;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_ITEM_VALUE_LEN: usize = 255;

const SLUG_SUFFIX_LEN: usize = 6;

/// Normalizes an accent color to `#RRGGBB`/`#RGB` uppercase form. Accepts 3-
/// or 6-digit hex with or without the leading `#`; anything else falls back.
pub fn normalize_color(input: Option<&str>, fallback: &str) -> String {
    let Some(raw) = input else {
        return fallback.to_string();
    };
    let digits = raw.trim().trim_start_matches('#');
    let valid = matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        format!("#{}", digits.to_uppercase())
    } else {
        fallback.to_string()
    }
}

/// Resolves a theme slug against the catalog. Tries the lower-cased input,
/// then each fallback in order, then the catalog's first entry. `None` only
/// when the catalog is empty.
pub fn normalize_theme(
    input: Option<&str>,
    fallbacks: &[&str],
    catalog: &ThemeCatalog,
) -> Option<String> {
    for candidate in input.into_iter().chain(fallbacks.iter().copied()) {
        let slug = candidate.trim().to_lowercase();
        if catalog.contains(&slug) {
            return Some(slug);
        }
    }
    catalog.first_slug().map(str::to_string)
}

pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("name is required".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("name must be at most {} characters", MAX_NAME_LEN));
    }
    Ok(())
}

/// Derives a URL-safe slug from the card name. Uniqueness is enforced by the
/// database; collisions are retried with [`slug_with_suffix`].
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "card".to_string()
    } else {
        slug
    }
}

pub fn slug_with_suffix(base: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}-{}", base, suffix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkcard_themes::DEFAULT_ACCENT_COLOR;

    #[test]
    fn color_gains_hash_and_uppercase() {
        assert_eq!(normalize_color(Some("1D4ED8"), DEFAULT_ACCENT_COLOR), "#1D4ED8");
        assert_eq!(normalize_color(Some("#ff8800"), DEFAULT_ACCENT_COLOR), "#FF8800");
        assert_eq!(normalize_color(Some("abc"), DEFAULT_ACCENT_COLOR), "#ABC");
    }

    #[test]
    fn invalid_color_falls_back_to_default() {
        assert_eq!(normalize_color(Some("zzzzzz"), DEFAULT_ACCENT_COLOR), DEFAULT_ACCENT_COLOR);
        assert_eq!(normalize_color(Some("#12345"), DEFAULT_ACCENT_COLOR), DEFAULT_ACCENT_COLOR);
        assert_eq!(normalize_color(None, DEFAULT_ACCENT_COLOR), DEFAULT_ACCENT_COLOR);
    }

    #[test]
    fn invalid_color_falls_back_to_existing_value_on_update() {
        assert_eq!(normalize_color(Some("not-a-color"), "#AABBCC"), "#AABBCC");
    }

    #[test]
    fn name_bounds_are_enforced() {
        assert!(validate_name("Jane").is_ok());
        assert!(validate_name("  ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn slugify_collapses_separator_runs() {
        assert_eq!(slugify("Jane  Q.  Doe"), "jane-q-doe");
        assert_eq!(slugify("--- hello ---"), "hello");
        assert_eq!(slugify("日本語"), "card");
    }

    #[test]
    fn slug_suffix_preserves_base() {
        let slug = slug_with_suffix("jane-doe");
        assert!(slug.starts_with("jane-doe-"));
        assert_eq!(slug.len(), "jane-doe-".len() + 6);
    }
}
