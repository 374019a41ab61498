use std::collections::HashSet;

use serde::Serialize;
use tera::Tera;

use crate::ThemeCatalog;

pub const DEFAULT_CARD_NAME: &str = "Card";
pub const DEFAULT_ACCENT_COLOR: &str = "#1D4ED8";

/// The narrow data contract handed to theme templates. Always fully
/// populated: templates never see a missing name, color, or items key.
#[derive(Debug, Clone, Serialize)]
pub struct CardContext {
    pub name: String,
    pub color: String,
    pub banner_url: Option<String>,
    pub avatar_url: Option<String>,
    pub qr_image_url: Option<String>,
    pub items: Vec<ItemContext>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemContext {
    pub item_type: String,
    pub label: Option<String>,
    pub value: String,
}

impl CardContext {
    /// Normalizes loose card data into the fixed template shape.
    pub fn normalized(
        name: Option<String>,
        color: Option<String>,
        banner_url: Option<String>,
        avatar_url: Option<String>,
        qr_image_url: Option<String>,
        items: Vec<ItemContext>,
    ) -> Self {
        Self {
            name: name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| DEFAULT_CARD_NAME.to_string()),
            color: color.filter(|c| !c.trim().is_empty()).unwrap_or_else(|| DEFAULT_ACCENT_COLOR.to_string()),
            banner_url,
            avatar_url,
            qr_image_url,
            items,
        }
    }
}

/// Renders a card through a theme template, falling back to a built-in
/// template on any failure. A broken or missing theme never breaks the
/// public page.
pub struct ThemeRenderer {
    tera: Tera,
    registered: HashSet<String>,
}

impl ThemeRenderer {
    /// Compiles every installed theme's `card.html` into a closed template
    /// set. Themes whose template is missing or fails to compile are left
    /// out and will hit the fallback at render time.
    pub fn from_catalog(catalog: &ThemeCatalog) -> Self {
        let mut tera = Tera::default();
        let mut registered = HashSet::new();

        for theme in catalog.themes() {
            let Some(template_path) = catalog.template_path(&theme.slug) else {
                continue;
            };
            let source = match std::fs::read_to_string(&template_path) {
                Ok(source) => source,
                Err(e) => {
                    tracing::warn!("[ThemeRenderer] theme '{}' has no template: {}", theme.slug, e);
                    continue;
                }
            };
            match tera.add_raw_template(&template_name(&theme.slug), &source) {
                Ok(()) => {
                    registered.insert(theme.slug.clone());
                }
                Err(e) => {
                    tracing::warn!("[ThemeRenderer] theme '{}' failed to compile: {}", theme.slug, e);
                }
            }
        }

        Self { tera, registered }
    }

    /// Renders `context` with the theme's template. Unknown slugs, missing
    /// templates, and render-time errors all land on the fallback; this
    /// method never fails.
    pub fn render(&self, theme_slug: &str, context: &CardContext) -> String {
        let slug = theme_slug.to_lowercase();
        if self.registered.contains(&slug) {
            let rendered = tera::Context::from_serialize(context)
                .and_then(|ctx| self.tera.render(&template_name(&slug), &ctx));
            match rendered {
                Ok(html) => return html,
                Err(e) => {
                    tracing::warn!("[ThemeRenderer] theme '{}' failed to render, using fallback: {}", slug, e);
                }
            }
        }
        fallback_html(context)
    }
}

fn template_name(slug: &str) -> String {
    format!("{}.html", slug)
}

/// Minimal built-in page: name, QR image if present, every item. Built by
/// hand so the fallback path itself cannot fail.
fn fallback_html(context: &CardContext) -> String {
    let mut html = String::new();
    html.push_str("<!doctype html><html><head><meta charset=\"utf-8\"><title>");
    html.push_str(&escape_html(&context.name));
    html.push_str("</title></head><body>");
    html.push_str(&format!(
        "<h1 style=\"color:{}\">{}</h1>",
        escape_html(&context.color),
        escape_html(&context.name)
    ));
    if let Some(qr) = &context.qr_image_url {
        html.push_str(&format!(
            "<img src=\"{}\" alt=\"QR code\" width=\"160\" height=\"160\">",
            escape_html(qr)
        ));
    }
    html.push_str("<ul>");
    for item in &context.items {
        match &item.label {
            Some(label) => html.push_str(&format!(
                "<li><strong>{}</strong>: {}</li>",
                escape_html(label),
                escape_html(&item.value)
            )),
            None => html.push_str(&format!("<li>{}</li>", escape_html(&item.value))),
        }
    }
    html.push_str("</ul></body></html>");
    html
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_fills_defaults() {
        let context = CardContext::normalized(None, Some("  ".into()), None, None, None, vec![]);
        assert_eq!(context.name, DEFAULT_CARD_NAME);
        assert_eq!(context.color, DEFAULT_ACCENT_COLOR);
        assert!(context.items.is_empty());
    }

    #[test]
    fn fallback_contains_name_items_and_qr() {
        let context = CardContext::normalized(
            Some("Jane Doe".into()),
            Some("#1D4ED8".into()),
            None,
            None,
            Some("https://cards.test/qr/x.png".into()),
            vec![ItemContext {
                item_type: "name".into(),
                label: Some("Full name".into()),
                value: "Jane Doe".into(),
            }],
        );
        let html = fallback_html(&context);
        assert!(html.contains("Jane Doe"));
        assert!(html.contains("https://cards.test/qr/x.png"));
        assert!(html.contains("Full name"));
    }

    #[test]
    fn fallback_escapes_markup() {
        let context = CardContext::normalized(
            Some("<script>alert(1)</script>".into()),
            None,
            None,
            None,
            None,
            vec![],
        );
        let html = fallback_html(&context);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
