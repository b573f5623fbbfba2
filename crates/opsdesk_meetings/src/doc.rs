// File: crates/opsdesk_meetings/src/doc.rs

#![allow(dead_code)]
#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::models::{
    ActionLinks, AvailabilityResponse, AvailabilityUpdate, BookMeetingRequest, BookingResponse,
    CalendarLinks, CancelRequest, DayInput, DeletedResponse, MeetingActionResponse,
    MeetingDetailResponse, MeetingListQuery, MeetingListResponse, MeetingSummary,
    MeetingUpdatedResponse, MeetingView, OperatorCancelRequest, OperatorInfo, RescheduleRequest,
    SettingsEcho, SettingsResponse, SettingsUpdate, Slot, SlotsQuery, SlotsResponse,
    StatusUpdateRequest, TimeOffListResponse, TimeOffRequest, TimeOffResponse, TokenQuery,
};

#[utoipa::path(
    get,
    path = "/public/operators/{operator_id}/slots",
    params(
        ("operator_id" = String, Path, description = "Operator to book with"),
        SlotsQuery
    ),
    responses(
        (status = 200, description = "Bookable slots in the range", body = SlotsResponse),
        (status = 400, description = "Bad date range or duration"),
        (status = 404, description = "Unknown operator"),
        (status = 409, description = "Operator is not accepting meetings")
    ),
    tag = "Booking"
)]
fn doc_slots_handler() {}

#[utoipa::path(
    post,
    path = "/public/operators/{operator_id}/meetings",
    params(("operator_id" = String, Path, description = "Operator to book with")),
    request_body = BookMeetingRequest,
    responses(
        (status = 201, description = "Meeting booked", body = BookingResponse),
        (status = 200, description = "Repeated submission; the earlier booking is returned", body = BookingResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Unknown operator"),
        (status = 409, description = "Slot or limits prevent booking"),
        (status = 429, description = "Too many booking attempts")
    ),
    tag = "Booking"
)]
fn doc_book_handler() {}

#[utoipa::path(
    get,
    path = "/public/meetings/view",
    params(TokenQuery),
    responses(
        (status = 200, description = "The meeting the token belongs to", body = MeetingActionResponse),
        (status = 401, description = "Invalid, expired or superseded token")
    ),
    tag = "Booking"
)]
fn doc_view_handler() {}

#[utoipa::path(
    post,
    path = "/public/meetings/cancel",
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Meeting cancelled", body = MeetingActionResponse),
        (status = 401, description = "Invalid or expired token"),
        (status = 409, description = "Meeting can no longer be cancelled")
    ),
    tag = "Booking"
)]
fn doc_cancel_handler() {}

#[utoipa::path(
    post,
    path = "/public/meetings/reschedule",
    request_body = RescheduleRequest,
    responses(
        (status = 200, description = "Meeting moved", body = MeetingActionResponse),
        (status = 401, description = "Invalid or expired token"),
        (status = 409, description = "Slot unavailable or reschedule not allowed")
    ),
    tag = "Booking"
)]
fn doc_reschedule_handler() {}

#[utoipa::path(
    get,
    path = "/operator/settings",
    responses((status = 200, description = "Current booking rules", body = SettingsResponse)),
    tag = "Operator"
)]
fn doc_get_settings_handler() {}

#[utoipa::path(
    put,
    path = "/operator/settings",
    request_body = SettingsUpdate,
    responses(
        (status = 200, description = "Settings saved", body = SettingsResponse),
        (status = 400, description = "Invalid settings")
    ),
    tag = "Operator"
)]
fn doc_update_settings_handler() {}

#[utoipa::path(
    get,
    path = "/operator/availability",
    responses((status = 200, description = "Weekly hours, Sunday first", body = AvailabilityResponse)),
    tag = "Operator"
)]
fn doc_get_availability_handler() {}

#[utoipa::path(
    put,
    path = "/operator/availability",
    request_body = AvailabilityUpdate,
    responses(
        (status = 200, description = "Week replaced", body = AvailabilityResponse),
        (status = 400, description = "Overlapping or empty intervals")
    ),
    tag = "Operator"
)]
fn doc_replace_availability_handler() {}

#[utoipa::path(
    get,
    path = "/operator/time-off",
    responses((status = 200, description = "All time off entries", body = TimeOffListResponse)),
    tag = "Operator"
)]
fn doc_list_time_off_handler() {}

#[utoipa::path(
    post,
    path = "/operator/time-off",
    request_body = TimeOffRequest,
    responses(
        (status = 201, description = "Time off added", body = TimeOffResponse),
        (status = 400, description = "Invalid interval")
    ),
    tag = "Operator"
)]
fn doc_create_time_off_handler() {}

#[utoipa::path(
    delete,
    path = "/operator/time-off/{id}",
    params(("id" = String, Path, description = "Time off entry id")),
    responses(
        (status = 200, description = "Entry removed", body = DeletedResponse),
        (status = 404, description = "No such entry for this operator")
    ),
    tag = "Operator"
)]
fn doc_delete_time_off_handler() {}

#[utoipa::path(
    get,
    path = "/operator/meetings",
    params(MeetingListQuery),
    responses(
        (status = 200, description = "One page of meetings", body = MeetingListResponse),
        (status = 400, description = "Bad filter")
    ),
    tag = "Operator"
)]
fn doc_list_meetings_handler() {}

#[utoipa::path(
    get,
    path = "/operator/meetings/{id}",
    params(("id" = String, Path, description = "Meeting id")),
    responses(
        (status = 200, description = "Meeting with its audit trail", body = MeetingDetailResponse),
        (status = 404, description = "No such meeting for this operator")
    ),
    tag = "Operator"
)]
fn doc_meeting_detail_handler() {}

#[utoipa::path(
    post,
    path = "/operator/meetings/{id}/cancel",
    params(("id" = String, Path, description = "Meeting id")),
    request_body(content = OperatorCancelRequest, description = "Optional reason"),
    responses(
        (status = 200, description = "Meeting cancelled", body = MeetingUpdatedResponse),
        (status = 404, description = "No such meeting for this operator"),
        (status = 409, description = "Meeting can no longer be cancelled")
    ),
    tag = "Operator"
)]
fn doc_operator_cancel_handler() {}

#[utoipa::path(
    post,
    path = "/operator/meetings/{id}/status",
    params(("id" = String, Path, description = "Meeting id")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status changed", body = MeetingUpdatedResponse),
        (status = 404, description = "No such meeting for this operator"),
        (status = 409, description = "Transition not allowed")
    ),
    tag = "Operator"
)]
fn doc_set_status_handler() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        doc_slots_handler,
        doc_book_handler,
        doc_view_handler,
        doc_cancel_handler,
        doc_reschedule_handler,
        doc_get_settings_handler,
        doc_update_settings_handler,
        doc_get_availability_handler,
        doc_replace_availability_handler,
        doc_list_time_off_handler,
        doc_create_time_off_handler,
        doc_delete_time_off_handler,
        doc_list_meetings_handler,
        doc_meeting_detail_handler,
        doc_operator_cancel_handler,
        doc_set_status_handler
    ),
    components(
        schemas(
            SlotsResponse,
            Slot,
            OperatorInfo,
            SettingsEcho,
            BookMeetingRequest,
            BookingResponse,
            MeetingSummary,
            ActionLinks,
            CalendarLinks,
            CancelRequest,
            RescheduleRequest,
            MeetingActionResponse,
            SettingsUpdate,
            SettingsResponse,
            DayInput,
            AvailabilityUpdate,
            AvailabilityResponse,
            TimeOffRequest,
            TimeOffResponse,
            TimeOffListResponse,
            MeetingView,
            MeetingListResponse,
            MeetingDetailResponse,
            MeetingUpdatedResponse,
            StatusUpdateRequest,
            OperatorCancelRequest,
            DeletedResponse
        )
    ),
    tags(
        (name = "Booking", description = "Public booking, cancel and reschedule"),
        (name = "Operator", description = "Operator settings, hours, time off and meetings")
    ),
    servers(
        (url = "/api", description = "Opsdesk API server")
    )
)]
pub struct MeetingsApiDoc;
