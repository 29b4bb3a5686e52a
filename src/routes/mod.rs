pub mod health;
pub mod matchmaker;
pub mod sms;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// Every route of the service, with state applied. Layers are added by the caller.
pub fn router(state: AppState) -> Router {
    let base_routes = Router::new().route("/health", get(health::health));

    let sms_callbacks = Router::new()
        .route("/sms/reply-callback", post(sms::handle_reply_callback))
        .route("/sms/status-callback", post(sms::handle_status_callback));

    let matchmaker_api = Router::new()
        .route("/api/requests", post(matchmaker::create_request))
        .route(
            "/api/requests/:id/confirm",
            post(matchmaker::confirm_request),
        )
        .route(
            "/api/tutors/:id/request-sms",
            post(matchmaker::send_request_sms),
        )
        .route(
            "/api/pupils/:id/unmatched-subjects",
            get(matchmaker::unmatched_subjects),
        );

    base_routes
        .merge(sms_callbacks)
        .merge(matchmaker_api)
        .with_state(state)
}
