// --- File: crates/opsdesk_meetings/src/routes.rs ---

use axum::{
    middleware,
    routing::{delete, get, post},
    Extension, Router,
};
use opsdesk_common::{operator_auth_middleware, OperatorAuthState};
use opsdesk_db::SchedulingStore;
use std::sync::Arc;

use crate::handlers::{
    book_handler, cancel_handler, create_time_off_handler, delete_time_off_handler,
    get_availability_handler, get_settings_handler, list_meetings_handler, list_time_off_handler,
    meeting_detail_handler, operator_cancel_handler, replace_availability_handler,
    reschedule_handler, set_status_handler, slots_handler, update_settings_handler,
    view_handler, MeetingsState,
};

/// Public booking routes plus the operator surface behind operator auth.
pub fn routes<S: SchedulingStore>(state: Arc<MeetingsState<S>>, auth: OperatorAuthState) -> Router {
    let public = Router::new()
        .route(
            "/public/operators/{operator_id}/slots",
            get(slots_handler::<S>),
        )
        .route(
            "/public/operators/{operator_id}/meetings",
            post(book_handler::<S>),
        )
        .route("/public/meetings/view", get(view_handler::<S>))
        .route("/public/meetings/cancel", post(cancel_handler::<S>))
        .route("/public/meetings/reschedule", post(reschedule_handler::<S>))
        .layer(Extension(state.client_ip))
        .with_state(state.clone());

    let operator = Router::new()
        .route(
            "/operator/settings",
            get(get_settings_handler::<S>).put(update_settings_handler::<S>),
        )
        .route(
            "/operator/availability",
            get(get_availability_handler::<S>).put(replace_availability_handler::<S>),
        )
        .route(
            "/operator/time-off",
            get(list_time_off_handler::<S>).post(create_time_off_handler::<S>),
        )
        .route("/operator/time-off/{id}", delete(delete_time_off_handler::<S>))
        .route("/operator/meetings", get(list_meetings_handler::<S>))
        .route("/operator/meetings/{id}", get(meeting_detail_handler::<S>))
        .route(
            "/operator/meetings/{id}/cancel",
            post(operator_cancel_handler::<S>),
        )
        .route(
            "/operator/meetings/{id}/status",
            post(set_status_handler::<S>),
        )
        .layer(middleware::from_fn_with_state(auth, operator_auth_middleware))
        .with_state(state);

    public.merge(operator)
}
