use anyhow::Result;
use axum::Router;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use linkcard_assets::{ImageAssetStore, QrCodeGenerator, StorageConfig};
use linkcard_cards::CardAggregateService;
use linkcard_database::init_database;
use linkcard_service_api::{card_routes, public_routes, setup_tracing, theme_routes, AppState};
use linkcard_themes::{ThemeCatalog, ThemeRenderer};

init_database!([
    linkcard_cards::Card,
    linkcard_cards::CardItem,
    linkcard_cards::CardImage
]);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let cors = CorsLayer::very_permissive();
    let trace = TraceLayer::new_for_http();

    let pool = connect(false, true).await.clone();

    let storage = StorageConfig::from_env();
    let catalog = ThemeCatalog::from_env();
    let renderer = ThemeRenderer::from_catalog(&catalog);
    tracing::info!("loaded {} theme(s)", catalog.themes().len());

    let default_theme = std::env::var("DEFAULT_THEME").ok();
    let cards = CardAggregateService::new(
        pool,
        ImageAssetStore::new(storage.clone()),
        QrCodeGenerator::new(storage),
        catalog,
        default_theme,
    );

    let app = Router::new()
        .merge(card_routes())
        .merge(theme_routes())
        .merge(public_routes())
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
        .layer(cors)
        .layer(trace)
        .with_state(AppState::new(cards, renderer));

    let port: u16 = std::env::var("PORT")
        .unwrap_or("3033".into())
        .parse()
        .expect("failed to convert to number");

    let listener = tokio::net::TcpListener::bind(format!(":::{port}"))
        .await
        .unwrap();

    tracing::info!("LISTENING ON {port}");
    axum::serve(listener, app.into_make_service()).await.unwrap();
    Ok(())
}
