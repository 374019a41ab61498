use std::sync::Arc;

use linkcard_cards::CardAggregateService;
use linkcard_themes::ThemeRenderer;

/// Shared handler state. The service owns the pool and the asset roots; the
/// renderer holds the compiled theme templates.
#[derive(Clone)]
pub struct AppState {
    pub cards: Arc<CardAggregateService>,
    pub renderer: Arc<ThemeRenderer>,
}

impl AppState {
    pub fn new(cards: CardAggregateService, renderer: ThemeRenderer) -> Self {
        Self {
            cards: Arc::new(cards),
            renderer: Arc::new(renderer),
        }
    }
}
