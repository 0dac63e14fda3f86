pub mod recommendation;

// Re-export handlers for convenience
pub use recommendation::{
    get_model_info, get_rated_items, get_recommendations, health, list_users, metrics_endpoint,
    reload_model, RatedItemsResponse, RecommendationHandlerState, RecommendationQuery,
    RecommendationResponse, UsersResponse,
};

use actix_web::web;

/// Register every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(list_users)
        .service(get_rated_items)
        .service(get_recommendations)
        .service(get_model_info)
        .service(reload_model)
        .service(metrics_endpoint);
}
