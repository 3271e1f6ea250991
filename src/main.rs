use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

use flashcards::{
    api::{create_router, AppState},
    logging::init_logging,
    log_system_event, Config, Database, FlashcardService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let _guard = init_logging(&config.logging, "flashcards.log")?;
    config.validate()?;
    config.log_configuration_summary();

    log_system_event!(startup, component = "server", "Starting flashcards server");

    let db = Database::new(&config.database.url).await?;
    info!("Database initialized successfully");

    let state = AppState {
        flashcard_service: FlashcardService::new(db),
    };

    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(CorsLayer::permissive())
    );

    let addr = config.server.address();
    info!("Server starting on {}", addr);
    info!("API endpoints available at http://{}/api/", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log_system_event!(shutdown, component = "server", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
