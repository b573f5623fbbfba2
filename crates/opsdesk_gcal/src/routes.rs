// --- File: crates/opsdesk_gcal/src/routes.rs ---

use axum::{middleware, routing::get, Router};
use opsdesk_common::{operator_auth_middleware, OperatorAuthState};
use opsdesk_db::SchedulingStore;
use std::sync::Arc;

use crate::handlers::{
    calendar_status_handler, connect_handler, disconnect_handler, oauth_callback_handler,
    GcalState,
};

/// Calendar connect routes.
///
/// The operator routes sit behind the operator auth middleware; the OAuth
/// callback does not, since the browser arrives from the provider and the
/// signed `state` carries the operator identity instead.
pub fn routes<S: SchedulingStore>(state: Arc<GcalState<S>>, auth: OperatorAuthState) -> Router {
    let operator = Router::new()
        .route(
            "/operator/calendar",
            get(calendar_status_handler::<S>).delete(disconnect_handler::<S>),
        )
        .route("/operator/calendar/connect", get(connect_handler::<S>))
        .layer(middleware::from_fn_with_state(auth, operator_auth_middleware))
        .with_state(state.clone());

    let public = Router::new()
        .route("/calendar/oauth/callback", get(oauth_callback_handler::<S>))
        .with_state(state);

    operator.merge(public)
}
