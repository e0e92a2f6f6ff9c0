use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filmdeck_core::{
    create_identity_provider, load_config, validate_config, CatalogBackend, CatalogProvider,
    Config, FavouritesSession, FixtureCatalog, PageAggregator, PersistenceBackend,
    PersistenceProvider, RestFavourites, SqliteFavourites, TmdbCatalog,
};
use filmdeck_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("FILMDECK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Catalog backend: {}", config.catalog.backend.as_str());
    info!("Persistence backend: {}", config.persistence.backend.as_str());

    let catalog = create_catalog(&config)?;
    info!("Using catalog: {}", catalog.name());
    let aggregator = PageAggregator::from_config(catalog, &config.aggregator);

    let persistence = create_persistence(&config)?;

    // Identity and favourites
    let identity = Arc::new(create_identity_provider(&config.identity));
    let favourites = Arc::new(FavouritesSession::new(persistence, identity.clone()));
    if let Err(e) = favourites.sync().await {
        // The session task retries on the next identity change
        warn!("Initial favourites hydration failed: {}", e);
    }
    let session_handle = favourites.spawn();

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, aggregator, identity, favourites));

    // Create router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    session_handle.abort();

    Ok(())
}

fn create_catalog(config: &Config) -> Result<Arc<dyn CatalogProvider>> {
    match config.catalog.backend {
        CatalogBackend::Tmdb => {
            let tmdb_config = config
                .catalog
                .tmdb
                .clone()
                .context("TMDB backend selected but no [catalog.tmdb] section provided")?;
            let client = TmdbCatalog::new(tmdb_config).context("Failed to create TMDB client")?;
            Ok(Arc::new(client))
        }
        CatalogBackend::Fixture => {
            let fixture_config = config
                .catalog
                .fixture
                .as_ref()
                .context("Fixture backend selected but no [catalog.fixture] section provided")?;
            let catalog = FixtureCatalog::load(fixture_config).with_context(|| {
                format!("Failed to load catalog fixture {:?}", fixture_config.path)
            })?;
            Ok(Arc::new(catalog))
        }
    }
}

fn create_persistence(config: &Config) -> Result<Arc<dyn PersistenceProvider>> {
    match config.persistence.backend {
        PersistenceBackend::Sqlite => {
            let path = &config.persistence.sqlite.path;
            let store = SqliteFavourites::new(path)
                .with_context(|| format!("Failed to open favourites database {:?}", path))?;
            info!("Favourites database initialized at {:?}", path);
            Ok(Arc::new(store))
        }
        PersistenceBackend::Rest => {
            let rest_config = config
                .persistence
                .rest
                .clone()
                .context("REST backend selected but no [persistence.rest] section provided")?;
            info!("Using REST favourites at {}", rest_config.url);
            let client = RestFavourites::new(rest_config)
                .context("Failed to create REST favourites client")?;
            Ok(Arc::new(client))
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
