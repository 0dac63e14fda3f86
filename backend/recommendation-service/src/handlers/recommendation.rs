/// Recommendation API Handlers
///
/// HTTP endpoints for item-based recommendations and model management
use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{Recommendation, RecommendationStatus, UserId};
use crate::services::RecommendationService;

const INSUFFICIENT_DATA_MESSAGE: &str =
    "Could not generate recommendations for this user. They might not have enough ratings or similar items.";
const UNKNOWN_USER_MESSAGE: &str = "This user has not rated any items yet in the dataset.";

/// Query parameters for GET /api/v1/users/{user_id}/recommendations
#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    /// Number of recommendations to return; clamped to the configured range
    pub limit: Option<usize>,
}

/// Recommendation response
#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub limit: usize,
    pub status: RecommendationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub recommendations: Vec<Recommendation>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub user_ids: Vec<UserId>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct RatedItemsResponse {
    pub user_id: UserId,
    pub titles: Vec<String>,
    pub total: usize,
    pub remaining: usize,
}

/// Handler state for recommendation service
pub struct RecommendationHandlerState {
    pub service: Arc<RecommendationService>,
}

/// GET /health
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

/// GET /api/v1/users
/// Every user present in the rating data, ascending
#[get("/api/v1/users")]
pub async fn list_users(state: web::Data<RecommendationHandlerState>) -> Result<HttpResponse> {
    let user_ids = state.service.user_ids()?;
    let count = user_ids.len();

    Ok(HttpResponse::Ok().json(UsersResponse { user_ids, count }))
}

/// GET /api/v1/users/{user_id}/ratings
/// Titles the user has rated, truncated to the display limit
#[get("/api/v1/users/{user_id}/ratings")]
pub async fn get_rated_items(
    path: web::Path<UserId>,
    state: web::Data<RecommendationHandlerState>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let display_limit = state.service.config().rated_items_display_limit;

    let rated = state.service.rated_items(user_id, display_limit)?;

    Ok(HttpResponse::Ok().json(RatedItemsResponse {
        user_id,
        titles: rated.titles,
        total: rated.total,
        remaining: rated.remaining,
    }))
}

/// GET /api/v1/users/{user_id}/recommendations
/// Top-N unseen items ranked by item-based collaborative filtering
#[get("/api/v1/users/{user_id}/recommendations")]
pub async fn get_recommendations(
    path: web::Path<UserId>,
    query: web::Query<RecommendationQuery>,
    state: web::Data<RecommendationHandlerState>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let limit = state.service.config().clamp_limit(query.limit);

    debug!("Getting recommendations for user: {}, limit: {}", user_id, limit);

    let result = match state.service.recommend(user_id, limit) {
        Ok(result) => result,
        Err(err) => {
            error!("Failed to get recommendations: {:?}", err);
            return Err(err);
        }
    };

    let message = match result.status {
        RecommendationStatus::Ok => None,
        RecommendationStatus::UnknownUser => Some(UNKNOWN_USER_MESSAGE.to_string()),
        RecommendationStatus::InsufficientData => Some(INSUFFICIENT_DATA_MESSAGE.to_string()),
    };
    let count = result.recommendations.len();

    Ok(HttpResponse::Ok().json(RecommendationResponse {
        user_id,
        limit,
        status: result.status,
        message,
        recommendations: result.recommendations,
        count,
    }))
}

/// GET /api/v1/model/info
#[get("/api/v1/model/info")]
pub async fn get_model_info(state: web::Data<RecommendationHandlerState>) -> Result<HttpResponse> {
    let info = state.service.model_info()?;
    Ok(HttpResponse::Ok().json(info))
}

/// POST /api/v1/model/reload
/// Re-read the dataset and rebuild the model if it changed
#[post("/api/v1/model/reload")]
pub async fn reload_model(state: web::Data<RecommendationHandlerState>) -> Result<HttpResponse> {
    let service = Arc::clone(&state.service);
    let outcome = web::block(move || service.reload())
        .await
        .map_err(|e| AppError::Internal(format!("reload task failed: {e}")))??;

    info!(
        rebuilt = outcome.rebuilt,
        fingerprint = %outcome.fingerprint,
        "Model reload requested"
    );

    Ok(HttpResponse::Ok().json(outcome))
}

/// GET /metrics
#[get("/metrics")]
pub async fn metrics_endpoint() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::render())
}
