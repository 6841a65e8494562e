use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn odontogram_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/patients/{patient_id}/chart", get(handlers::get_chart))
        .route(
            "/patients/{patient_id}/findings",
            get(handlers::finding_history).post(handlers::record_finding),
        )
        .route(
            "/layout",
            get(handlers::get_layout).put(handlers::save_layout).delete(handlers::reset_layout),
        )
        .route("/layout/{tooth}/drag", patch(handlers::drag_tooth))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
