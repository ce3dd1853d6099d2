use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::appointments::{cancel, reschedule};
use crate::models::{
    AppointmentView, CreateAvailableSlotRequest, CreateBlockedDateRequest, DuplicateSlotsRequest,
    RescheduleRequest, WorkingHours,
};
use crate::server::AppState;

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: String,
}

#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

// ==================== Appointments ====================

/// All appointments on a business date
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Response {
    match state.booking.list_appointments(&query.date) {
        Ok(appointments) => {
            let views: Vec<AppointmentView> =
                appointments.iter().map(|a| state.booking.view(a)).collect();
            Json(views).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn reschedule_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RescheduleRequest>,
) -> Response {
    reschedule(&state, &id, &req)
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    cancel(&state, &id)
}

// ==================== Available slots ====================

pub async fn list_available_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Response {
    match state
        .booking
        .list_available_slots(query.from.as_deref(), query.to.as_deref())
    {
        Ok(slots) => Json(slots).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_available_slot(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAvailableSlotRequest>,
) -> Response {
    match state.booking.create_available_slot(&req) {
        Ok(slot) => (StatusCode::CREATED, Json(slot)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_available_slot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.booking.delete_available_slot(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Copy a run of days' windows onto following weeks
pub async fn duplicate_available_slots(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DuplicateSlotsRequest>,
) -> Response {
    match state.booking.duplicate_available_slots(&req) {
        Ok(result) => Json(result).into_response(),
        Err(e) => e.into_response(),
    }
}

// ==================== Blocked dates ====================

pub async fn list_blocked_dates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Response {
    match state
        .booking
        .list_blocked_dates(query.from.as_deref(), query.to.as_deref())
    {
        Ok(blocks) => Json(blocks).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_blocked_date(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBlockedDateRequest>,
) -> Response {
    match state.booking.create_blocked_date(&req) {
        Ok(block) => (StatusCode::CREATED, Json(block)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_blocked_date(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.booking.delete_blocked_date(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

// ==================== Working hours ====================

pub async fn list_working_hours(State(state): State<Arc<AppState>>) -> Response {
    match state.booking.list_working_hours() {
        Ok(hours) => Json(hours).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn set_working_hours(
    State(state): State<Arc<AppState>>,
    Json(hours): Json<Vec<WorkingHours>>,
) -> Response {
    match state.booking.set_working_hours(&hours) {
        Ok(hours) => Json(hours).into_response(),
        Err(e) => e.into_response(),
    }
}

// ==================== Maintenance ====================

#[derive(Serialize)]
pub struct CompletePastResponse {
    pub completed: usize,
}

pub async fn complete_past(State(state): State<Arc<AppState>>) -> Response {
    match state.booking.complete_past_appointments() {
        Ok(completed) => Json(CompletePastResponse { completed }).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn sync_calendar(State(state): State<Arc<AppState>>) -> Response {
    match state.booking.sync_calendar().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => e.into_response(),
    }
}
