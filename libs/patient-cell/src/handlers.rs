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

use crate::models::{CreatePatientRequest, PatientListQuery, UpdatePatientRequest};
use crate::services::PatientService;

/// Paginated envelope by default; legacy callers that pass neither `page`
/// nor `limit` get the bare array.
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PatientListQuery>,
) -> Result<Response, AppError> {
    let service = PatientService::new(&state);

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
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let service = PatientService::new(&state);
    let patient = service.get(id)?;
    Ok(Json(patient).into_response())
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Response, AppError> {
    let service = PatientService::new(&state);
    let patient = service.create(request, &actor)?;
    Ok((StatusCode::CREATED, Json(patient)).into_response())
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Response, AppError> {
    let service = PatientService::new(&state);
    let patient = service.update(id, request, &actor)?;
    Ok(Json(patient).into_response())
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let service = PatientService::new(&state);
    service.delete(id, &actor)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
