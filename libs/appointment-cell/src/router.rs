use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::actor::actor_middleware;

use crate::handlers::*;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list_appointments))
        .route("/", post(create_appointment))
        .route("/{id}", get(get_appointment))
        .route("/{id}", put(update_appointment))
        .route("/{id}", delete(delete_appointment))
        .route("/patient/{id}", get(get_patient_appointments))
        .layer(middleware::from_fn(actor_middleware))
        .with_state(state)
}
