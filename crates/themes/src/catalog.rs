use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use linkcard_common::EnvVars;

pub struct ThemesEnv {
    pub themes_root: String,
}

impl EnvVars for ThemesEnv {
    fn load() -> Self {
        Self {
            themes_root: std::env::var("THEMES_ROOT").unwrap(),
        }
    }

    fn get_env_var(&self, key: &str) -> String {
        match key {
            "THEMES_ROOT" => self.themes_root.clone(),
            _ => panic!("{} is not set", key),
        }
    }
}

/// Metadata parsed from a theme's `style.css` header block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeMeta {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
}

/// Installed theme packages, discovered from the themes root directory.
///
/// Each immediate subdirectory is a candidate theme keyed by its directory
/// name; it is included only when its `style.css` opens with a `Key: Value`
/// comment header naming at least `Theme Name`. Re-scanning the directory is
/// always safe, so callers may hold the catalog for as long as they like.
#[derive(Debug, Clone)]
pub struct ThemeCatalog {
    themes: Vec<ThemeMeta>,
    dirs: HashMap<String, PathBuf>,
}

impl ThemeCatalog {
    pub fn discover(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let mut themes = Vec::new();
        let mut dirs = HashMap::new();

        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("[ThemeCatalog] cannot read themes root '{}': {}", root.display(), e);
                return Self { themes, dirs };
            }
        };

        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let Some(dir_name) = dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // slugs are lower-cased for case-insensitive matching elsewhere
            let slug = dir_name.to_lowercase();

            let Ok(css) = std::fs::read_to_string(dir.join("style.css")) else {
                continue;
            };
            let Some(meta) = parse_style_header(&slug, &css) else {
                continue;
            };

            dirs.insert(slug, dir);
            themes.push(meta);
        }

        themes.sort_by(|a, b| a.slug.cmp(&b.slug));
        Self { themes, dirs }
    }

    pub fn from_env() -> Self {
        Self::discover(ThemesEnv::load().themes_root)
    }

    pub fn themes(&self) -> &[ThemeMeta] {
        &self.themes
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.dirs.contains_key(slug)
    }

    pub fn first_slug(&self) -> Option<&str> {
        self.themes.first().map(|t| t.slug.as_str())
    }

    /// Path to the theme's `card.html` template, if the theme is installed.
    pub fn template_path(&self, slug: &str) -> Option<PathBuf> {
        self.dirs.get(slug).map(|dir| dir.join("card.html"))
    }
}

/// Parses the leading `/* Key: Value */` block of a stylesheet. Returns
/// `None` when the block is missing or carries no `Theme Name`, which
/// silently excludes the theme.
fn parse_style_header(slug: &str, css: &str) -> Option<ThemeMeta> {
    let trimmed = css.trim_start();
    let body = trimmed.strip_prefix("/*")?;
    let (header, _) = body.split_once("*/")?;

    let mut fields: HashMap<&str, String> = HashMap::new();
    for line in header.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if !value.is_empty() {
            // first occurrence of a header key wins
            fields.entry(key.trim()).or_insert_with(|| value.to_string());
        }
    }

    let name = fields.remove("Theme Name")?;
    Some(ThemeMeta {
        slug: slug.to_string(),
        name,
        description: fields.remove("Description"),
        version: fields.remove("Version"),
        author: fields.remove("Author"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_with_all_keys_parses() {
        let css = "/*\n Theme Name: Aurora\n Description: Gradient glass\n Version: 1.2.0\n Author: Jin\n*/\nbody {}";
        let meta = parse_style_header("aurora", css).unwrap();
        assert_eq!(meta.name, "Aurora");
        assert_eq!(meta.description.as_deref(), Some("Gradient glass"));
        assert_eq!(meta.version.as_deref(), Some("1.2.0"));
        assert_eq!(meta.author.as_deref(), Some("Jin"));
    }

    #[test]
    fn header_without_theme_name_is_excluded() {
        let css = "/* Description: anonymous */ body {}";
        assert!(parse_style_header("x", css).is_none());
    }

    #[test]
    fn stylesheet_without_header_is_excluded() {
        assert!(parse_style_header("x", "body { color: red }").is_none());
    }

    #[test]
    fn starred_comment_lines_parse() {
        let css = "/*\n * Theme Name: Mono\n * Author: K\n */";
        let meta = parse_style_header("mono", css).unwrap();
        assert_eq!(meta.name, "Mono");
        assert_eq!(meta.author.as_deref(), Some("K"));
    }
}
