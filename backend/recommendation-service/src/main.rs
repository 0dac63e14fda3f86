use actix_web::{web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recommendation_service::config::Config;
use recommendation_service::handlers::{self, RecommendationHandlerState};
use recommendation_service::services::{CsvDatasetSource, RecommendationService};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},actix_web=info", config.app.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting recommendation-service v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Environment: {}", config.app.env);

    // Build the similarity model before accepting traffic
    let source = CsvDatasetSource::new(config.data.ratings_path(), config.data.items_path());
    let recommendation_svc =
        match RecommendationService::initialize(Box::new(source), config.recommendation.clone()) {
            Ok(service) => {
                tracing::info!("Recommendation service initialized successfully");
                Arc::new(service)
            }
            Err(e) => {
                tracing::error!("Failed to initialize recommendation service: {}", e);
                return Err(e).context("Recommendation model could not be built");
            }
        };

    let handler_state = web::Data::new(RecommendationHandlerState {
        service: recommendation_svc,
    });

    tracing::info!("HTTP server listening on 0.0.0.0:{}", config.app.port);

    HttpServer::new(move || {
        App::new()
            .app_data(handler_state.clone())
            .configure(handlers::configure)
    })
    .bind(("0.0.0.0", config.app.port))
    .with_context(|| format!("Failed to bind port {}", config.app.port))?
    .run()
    .await
    .context("HTTP server error")?;

    Ok(())
}
