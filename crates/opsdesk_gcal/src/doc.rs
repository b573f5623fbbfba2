// File: crates/opsdesk_gcal/src/doc.rs

#![allow(dead_code)]
#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::handlers::{
    CalendarStatusResponse, ConnectResponse, ConnectedResponse, DisconnectResponse,
    OAuthCallbackQuery,
};

#[utoipa::path(
    get,
    path = "/operator/calendar",
    responses(
        (status = 200, description = "Calendar connection status", body = CalendarStatusResponse),
        (status = 401, description = "Missing or invalid operator credentials")
    ),
    tag = "Calendar"
)]
fn doc_calendar_status_handler() {}

#[utoipa::path(
    get,
    path = "/operator/calendar/connect",
    responses(
        (status = 200, description = "Consent URL to redirect the operator to", body = ConnectResponse),
        (status = 503, description = "Calendar integration disabled")
    ),
    tag = "Calendar"
)]
fn doc_connect_handler() {}

#[utoipa::path(
    delete,
    path = "/operator/calendar",
    responses(
        (status = 200, description = "Calendar account removed", body = DisconnectResponse)
    ),
    tag = "Calendar"
)]
fn doc_disconnect_handler() {}

#[utoipa::path(
    get,
    path = "/calendar/oauth/callback",
    params(OAuthCallbackQuery),
    responses(
        (status = 200, description = "Calendar connected", body = ConnectedResponse),
        (status = 400, description = "Consent declined or state invalid"),
        (status = 502, description = "Token exchange failed")
    ),
    tag = "Calendar"
)]
fn doc_oauth_callback_handler() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        doc_calendar_status_handler,
        doc_connect_handler,
        doc_disconnect_handler,
        doc_oauth_callback_handler
    ),
    components(
        schemas(
            CalendarStatusResponse,
            ConnectResponse,
            DisconnectResponse,
            ConnectedResponse
        )
    ),
    tags(
        (name = "Calendar", description = "Google Calendar connection for operators")
    ),
    servers(
        (url = "/api", description = "Opsdesk API server")
    )
)]
pub struct GcalApiDoc;
