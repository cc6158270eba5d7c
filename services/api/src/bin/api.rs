//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::PgMysteryStore, generator_llm::OpenAiMysteryWriter},
    config::Config,
    error::ApiError,
    web::{
        rest::{
            create_mystery_handler, daily_mystery_handler, get_mystery_handler, hint_handler,
            player_history_handler, start_handler, submit_handler, ApiDoc,
        },
        state::AppState,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    routing::{get, post},
    Router,
};
use mystery_core::{AttemptService, CaseService, SolutionCodec};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgMysteryStore::new(db_pool));
    info!("Running database migrations...");
    store
        .run_migrations()
        .await
        .map_err(|e| ApiError::Internal(format!("migration failed: {e}")))?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);
    let writer = Arc::new(OpenAiMysteryWriter::new(
        openai_client,
        config.generator_model.clone(),
        config.generation_timeout,
    ));

    let codec = SolutionCodec::new(&config.server_secret)
        .map_err(|e| ApiError::Internal(format!("codec init failed: {e}")))?;

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        cases: CaseService::new(store.clone(), writer, codec.clone()),
        attempts: AttemptService::new(store, codec),
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/mysteries", post(create_mystery_handler))
        .route("/mysteries/daily", get(daily_mystery_handler))
        .route("/mysteries/{id}", get(get_mystery_handler))
        .route("/mysteries/{id}/start", post(start_handler))
        .route("/mysteries/{id}/hint", post(hint_handler))
        .route("/mysteries/{id}/submit", post(submit_handler))
        .route("/players/{user_id}/attempts", get(player_history_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Merge the API router with the Swagger UI router.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
