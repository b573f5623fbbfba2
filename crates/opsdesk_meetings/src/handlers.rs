// File: crates/opsdesk_meetings/src/handlers.rs
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::Utc;
use opsdesk_common::OperatorId;
use opsdesk_db::SchedulingStore;
use tracing::{debug, info};

use crate::booking::BookingService;
use crate::error::MeetingError;
use crate::extract::{ClientIpPolicy, ClientMeta};
use crate::links::LinkBuilder;
use crate::models::{
    AvailabilityResponse, AvailabilityUpdate, BookMeetingRequest, BookingResponse, CancelRequest,
    DeletedResponse, MeetingActionResponse, MeetingDetailResponse, MeetingListQuery,
    MeetingListResponse, MeetingUpdatedResponse, OperatorCancelRequest, RescheduleRequest,
    SettingsResponse, SettingsUpdate, SlotsQuery, SlotsResponse, StatusUpdateRequest,
    TimeOffListResponse, TimeOffRequest, TimeOffResponse, TokenQuery,
};
use crate::operator::OperatorService;
use crate::rate_limit::RateLimiter;
use crate::turnstile::TurnstileVerifier;

// Shared state for the public and operator meeting surfaces
pub struct MeetingsState<S> {
    pub booking: BookingService<S>,
    pub operator: OperatorService<S>,
    pub rate_limiter: RateLimiter<S>,
    /// `None` when no anti-automation secret is configured.
    pub turnstile: Option<TurnstileVerifier>,
    pub links: LinkBuilder,
    /// Which forwarding headers identify the client for rate limiting.
    pub client_ip: ClientIpPolicy,
}

type SharedState<S> = State<std::sync::Arc<MeetingsState<S>>>;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, MeetingError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| MeetingError::Validation(rejection.body_text()))
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, MeetingError> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| MeetingError::Validation(rejection.body_text()))
}

// --- Public ---

pub async fn slots_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    Path(operator_id): Path<String>,
    params: Result<Query<SlotsQuery>, QueryRejection>,
) -> Result<Json<SlotsResponse>, MeetingError> {
    let query = query_params(params)?;
    let response = state
        .booking
        .available_slots(
            &operator_id,
            &query.start_date,
            &query.end_date,
            query.duration,
            Utc::now(),
        )
        .await?;
    Ok(Json(response))
}

/// Books a meeting. Rate limited per client IP.
pub async fn book_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    Path(operator_id): Path<String>,
    meta: ClientMeta,
    payload: Result<Json<BookMeetingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingResponse>), MeetingError> {
    let now = Utc::now();
    let decision = state
        .rate_limiter
        .enforce(meta.rate_limit_key(), now)
        .await?;
    debug!(remaining = decision.remaining, "Booking attempt admitted");

    let request = json_body(payload)?;
    if let Some(turnstile) = &state.turnstile {
        turnstile
            .verify(request.turnstile_token.as_deref(), meta.ip.as_deref())
            .await?;
    }

    let outcome = state.booking.book(&operator_id, request, &meta, now).await?;
    let status = if outcome.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let meeting = &outcome.meeting;
    Ok((
        status,
        Json(BookingResponse {
            success: true,
            duplicate: outcome.duplicate,
            meeting: meeting.into(),
            links: state.links.action_links(&meeting.tokens),
            calendar_links: state.links.calendar_links(meeting),
        }),
    ))
}

pub async fn view_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    params: Result<Query<TokenQuery>, QueryRejection>,
) -> Result<Json<MeetingActionResponse>, MeetingError> {
    let query = query_params(params)?;
    let meeting = state.booking.view(&query.token, Utc::now()).await?;
    Ok(Json(MeetingActionResponse {
        success: true,
        meeting: (&meeting).into(),
        links: None,
    }))
}

pub async fn cancel_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    meta: ClientMeta,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<Json<MeetingActionResponse>, MeetingError> {
    let request = json_body(payload)?;
    let meeting = state
        .booking
        .cancel_with_token(&request.token, request.reason, &meta, Utc::now())
        .await?;
    Ok(Json(MeetingActionResponse {
        success: true,
        meeting: (&meeting).into(),
        links: None,
    }))
}

/// Moves a meeting. The response carries fresh links; earlier ones stop working.
pub async fn reschedule_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    meta: ClientMeta,
    payload: Result<Json<RescheduleRequest>, JsonRejection>,
) -> Result<Json<MeetingActionResponse>, MeetingError> {
    let request = json_body(payload)?;
    let meeting = state
        .booking
        .reschedule_with_token(
            &request.token,
            request.new_datetime,
            request.reason,
            &meta,
            Utc::now(),
        )
        .await?;
    Ok(Json(MeetingActionResponse {
        success: true,
        links: Some(state.links.action_links(&meeting.tokens)),
        meeting: (&meeting).into(),
    }))
}

// --- Operator ---

pub async fn get_settings_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
) -> Result<Json<SettingsResponse>, MeetingError> {
    let settings = state.operator.settings(&operator_id).await?;
    Ok(Json(SettingsResponse {
        success: true,
        settings,
    }))
}

pub async fn update_settings_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    payload: Result<Json<SettingsUpdate>, JsonRejection>,
) -> Result<Json<SettingsResponse>, MeetingError> {
    let update = json_body(payload)?;
    let settings = state.operator.update_settings(&operator_id, update).await?;
    Ok(Json(SettingsResponse {
        success: true,
        settings,
    }))
}

pub async fn get_availability_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
) -> Result<Json<AvailabilityResponse>, MeetingError> {
    let days = state.operator.availability(&operator_id).await?;
    Ok(Json(AvailabilityResponse {
        success: true,
        days,
    }))
}

pub async fn replace_availability_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    payload: Result<Json<AvailabilityUpdate>, JsonRejection>,
) -> Result<Json<AvailabilityResponse>, MeetingError> {
    let update = json_body(payload)?;
    let days = state
        .operator
        .replace_availability(&operator_id, update)
        .await?;
    Ok(Json(AvailabilityResponse {
        success: true,
        days,
    }))
}

pub async fn list_time_off_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
) -> Result<Json<TimeOffListResponse>, MeetingError> {
    let items = state.operator.time_off(&operator_id).await?;
    Ok(Json(TimeOffListResponse {
        success: true,
        items,
    }))
}

pub async fn create_time_off_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    payload: Result<Json<TimeOffRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TimeOffResponse>), MeetingError> {
    let request = json_body(payload)?;
    let time_off = state.operator.create_time_off(&operator_id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(TimeOffResponse {
            success: true,
            time_off,
        }),
    ))
}

pub async fn delete_time_off_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, MeetingError> {
    state.operator.delete_time_off(&operator_id, &id).await?;
    Ok(Json(DeletedResponse { success: true }))
}

pub async fn list_meetings_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    params: Result<Query<MeetingListQuery>, QueryRejection>,
) -> Result<Json<MeetingListResponse>, MeetingError> {
    let query = query_params(params)?;
    let page = state.operator.list_meetings(&operator_id, query).await?;
    Ok(Json(MeetingListResponse {
        success: true,
        items: page.items.into_iter().map(Into::into).collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
    }))
}

pub async fn meeting_detail_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Path(id): Path<String>,
) -> Result<Json<MeetingDetailResponse>, MeetingError> {
    let (meeting, audit) = state.operator.meeting_detail(&operator_id, &id).await?;
    Ok(Json(MeetingDetailResponse {
        success: true,
        meeting: meeting.into(),
        audit,
    }))
}

/// Cancels on the operator's behalf. The body is optional.
pub async fn operator_cancel_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Path(id): Path<String>,
    payload: Result<Json<OperatorCancelRequest>, JsonRejection>,
) -> Result<Json<MeetingUpdatedResponse>, MeetingError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => OperatorCancelRequest::default(),
        Err(rejection) => return Err(MeetingError::Validation(rejection.body_text())),
    };
    let meeting = state
        .booking
        .cancel_as_operator(&operator_id, &id, request.reason, Utc::now())
        .await?;
    info!(operator_id = %operator_id, meeting_id = %id, "Operator cancelled meeting");
    Ok(Json(MeetingUpdatedResponse {
        success: true,
        meeting: meeting.into(),
    }))
}

pub async fn set_status_handler<S: SchedulingStore>(
    State(state): SharedState<S>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<Json<MeetingUpdatedResponse>, MeetingError> {
    let request = json_body(payload)?;
    let meeting = state
        .booking
        .set_status(&operator_id, &id, request.status, request.reason, Utc::now())
        .await?;
    Ok(Json(MeetingUpdatedResponse {
        success: true,
        meeting: meeting.into(),
    }))
}
