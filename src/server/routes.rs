use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::admin_auth_middleware;
use super::AppState;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes; appointment management is authorized by manage token
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/availability",
            get(handlers::availability::get_availability),
        )
        .route(
            "/api/appointments",
            post(handlers::appointments::create_appointment),
        )
        .route(
            "/api/appointments/:id",
            get(handlers::appointments::get_appointment),
        )
        .route(
            "/api/appointments/:id/reschedule",
            post(handlers::appointments::reschedule_appointment),
        )
        .route(
            "/api/appointments/:id/cancel",
            post(handlers::appointments::cancel_appointment),
        );

    // Admin routes (require admin API key)
    let admin_routes = Router::new()
        // Appointments
        .route(
            "/api/admin/appointments",
            get(handlers::admin::list_appointments),
        )
        .route(
            "/api/admin/appointments/:id/reschedule",
            post(handlers::admin::reschedule_appointment),
        )
        .route(
            "/api/admin/appointments/:id/cancel",
            post(handlers::admin::cancel_appointment),
        )
        // Availability configuration
        .route(
            "/api/admin/available-slots",
            get(handlers::admin::list_available_slots).post(handlers::admin::create_available_slot),
        )
        .route(
            "/api/admin/available-slots/duplicate",
            post(handlers::admin::duplicate_available_slots),
        )
        .route(
            "/api/admin/available-slots/:id",
            delete(handlers::admin::delete_available_slot),
        )
        .route(
            "/api/admin/blocked-dates",
            get(handlers::admin::list_blocked_dates).post(handlers::admin::create_blocked_date),
        )
        .route(
            "/api/admin/blocked-dates/:id",
            delete(handlers::admin::delete_blocked_date),
        )
        .route(
            "/api/admin/working-hours",
            get(handlers::admin::list_working_hours).put(handlers::admin::set_working_hours),
        )
        // Maintenance
        .route(
            "/api/admin/maintenance/complete-past",
            post(handlers::admin::complete_past),
        )
        .route(
            "/api/admin/maintenance/sync-calendar",
            post(handlers::admin::sync_calendar),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
