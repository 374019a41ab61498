mod catalog;
mod renderer;

pub use catalog::{ThemeCatalog, ThemeMeta, ThemesEnv};
pub use renderer::{CardContext, ItemContext, ThemeRenderer, DEFAULT_ACCENT_COLOR, DEFAULT_CARD_NAME};
