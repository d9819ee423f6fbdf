use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::error::AppError;
use shared_utils::actor::Actor;
use shared_utils::pagination::PageParams;

use crate::models::{AppointmentListQuery, CreateAppointmentRequest, UpdateAppointmentRequest};
use crate::services::BookingService;

/// Paginated envelope by default; legacy callers that pass neither `page`
/// nor `limit` get the bare array.
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Response, AppError> {
    let service = BookingService::new(&state);

    let compat = query.page.is_none() && query.limit.is_none();
    let page = if compat {
        PageParams::compat()
    } else {
        PageParams::clamp(query.page, query.limit)
    };

    let result = service.list(&query, page)?;
    if compat {
        Ok(Json(result.data).into_response())
    } else {
        Ok(Json(result).into_response())
    }
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let service = BookingService::new(&state);
    let appointment = service.get(id)?;
    Ok(Json(appointment).into_response())
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let service = BookingService::new(&state);
    let appointments = service.list_for_patient(patient_id)?;
    Ok(Json(appointments).into_response())
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Response, AppError> {
    let service = BookingService::new(&state);
    let appointment = service.create(request, &actor)?;
    Ok((StatusCode::CREATED, Json(appointment)).into_response())
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Response, AppError> {
    let service = BookingService::new(&state);
    let appointment = service.update(id, request, &actor)?;
    Ok(Json(appointment).into_response())
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let service = BookingService::new(&state);
    service.delete(id, &actor)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
