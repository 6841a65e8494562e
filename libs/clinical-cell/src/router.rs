use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn clinical_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/risk", post(handlers::assess))
        .route("/records", get(handlers::list_records).post(handlers::create_record))
        .route("/records/{record_id}", get(handlers::get_record))
        .route("/terms", get(handlers::search_terms))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
