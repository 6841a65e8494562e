use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use clinic_cell::router::clinic_routes;
use clinical_cell::router::clinical_routes;
use odontogram_cell::router::odontogram_routes;
use patient_cell::router::patient_routes;
use provider_cell::router::provider_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "ADIE API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/clinic", clinic_routes(state.clone()))
        .nest("/providers", provider_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/clinical", clinical_routes(state.clone()))
        .nest("/odontogram", odontogram_routes(state))
}
