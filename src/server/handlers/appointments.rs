use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::ErrorResponse;
use crate::models::{CreateAppointmentRequest, RescheduleRequest};
use crate::server::AppState;

#[derive(Deserialize)]
pub struct ManageQuery {
    pub token: Option<String>,
}

fn check_token(state: &AppState, id: &str, query: &ManageQuery) -> Result<(), Response> {
    match query.token.as_deref() {
        Some(token) if state.booking.verify_manage_token(id, token) => Ok(()),
        _ => Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("Invalid or missing manage token")),
        )
            .into_response()),
    }
}

/// Book an appointment
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAppointmentRequest>,
) -> Response {
    let appointment = match state.booking.create_appointment(&req) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };

    match state.booking.booking_response(&appointment) {
        Ok(resp) => (StatusCode::CREATED, Json(resp)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Look up an appointment with its manage token
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ManageQuery>,
) -> Response {
    if let Err(resp) = check_token(&state, &id, &query) {
        return resp;
    }

    match state.booking.get_appointment(&id) {
        Ok(appointment) => Json(state.booking.view(&appointment)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Move an appointment, authorized by its manage token
pub async fn reschedule_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ManageQuery>,
    Json(req): Json<RescheduleRequest>,
) -> Response {
    if let Err(resp) = check_token(&state, &id, &query) {
        return resp;
    }
    reschedule(&state, &id, &req)
}

/// Cancel an appointment, authorized by its manage token
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ManageQuery>,
) -> Response {
    if let Err(resp) = check_token(&state, &id, &query) {
        return resp;
    }
    cancel(&state, &id)
}

pub(super) fn reschedule(state: &AppState, id: &str, req: &RescheduleRequest) -> Response {
    let appointment = match state.booking.reschedule_appointment(id, req) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };

    match state.booking.booking_response(&appointment) {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => e.into_response(),
    }
}

pub(super) fn cancel(state: &AppState, id: &str) -> Response {
    match state.booking.cancel_appointment(id) {
        Ok(appointment) => Json(state.booking.view(&appointment)).into_response(),
        Err(e) => e.into_response(),
    }
}
