use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::server::AppState;

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    /// `YYYY-MM-DD`, business-local
    pub date: String,
}

/// Bookable start times for one date
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Response {
    match state.booking.get_availability(&query.date) {
        Ok(availability) => Json(availability).into_response(),
        Err(e) => e.into_response(),
    }
}
