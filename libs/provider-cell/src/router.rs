use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn provider_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_providers).post(handlers::create_provider))
        .route("/specialties", get(handlers::list_specialties))
        .route("/team", get(handlers::list_team))
        .route(
            "/{provider_id}",
            get(handlers::get_provider)
                .put(handlers::update_provider)
                .delete(handlers::deactivate_provider),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
