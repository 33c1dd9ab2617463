use axum::{
    Router,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{post, put},
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::availability;
use crate::establish_connection;
use crate::slots::{self, NewSlot, SlotChanges};

use super::error::ApiError;
use super::extract_principal;
use super::models::*;

pub fn router() -> Router {
    Router::new()
        .route("/time-slots/", post(create_time_slot).get(list_time_slots))
        .route(
            "/time-slots/{id}/",
            put(update_time_slot).delete(delete_time_slot),
        )
        .route("/time-slots/{id}/toggle-active/", post(toggle_time_slot))
        .route("/time-slots/check-availability/", post(check_availability))
}

#[derive(Debug, Deserialize)]
pub struct ListSlotsQuery {
    pub restaurant_id: Uuid,
    pub active_only: Option<bool>,
}

#[utoipa::path(
    post,
    path = "/time-slots/check-availability/",
    request_body = CheckAvailabilityRequest,
    responses(
        (status = 200, description = "Availability for the requested slot or day", body = CheckAvailabilityResponse),
        (status = 404, description = "Restaurant or time slot not found", body = ErrorResponse),
    ),
    tag = "time-slots"
)]
#[instrument]
pub async fn check_availability(
    Json(payload): Json<CheckAvailabilityRequest>,
) -> Result<Json<CheckAvailabilityResponse>, ApiError> {
    let conn = &mut establish_connection();

    let response = match payload.time_slot_id {
        Some(time_slot_id) => {
            let availability = availability::availability_for_slot(
                conn,
                payload.restaurant_id,
                payload.date,
                time_slot_id,
            )?;
            CheckAvailabilityResponse::Slot(SlotCheckResponse {
                available: availability.available,
                current_bookings: availability.current_bookings,
                max_bookings: availability.slot.max_bookings,
                time_slot: TimeSlotResponse::from(&availability.slot),
            })
        }
        None => {
            let all =
                availability::availability_for_date(conn, payload.restaurant_id, payload.date)?;
            CheckAvailabilityResponse::Date(AvailableSlotsResponse {
                date: payload.date,
                available_slots: all.iter().map(SlotAvailabilityResponse::from).collect(),
            })
        }
    };

    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/time-slots/",
    params(
        ("restaurant_id" = Uuid, Query, description = "Restaurant whose slots to list"),
        ("active_only" = Option<bool>, Query, description = "Only return active slots"),
    ),
    responses(
        (status = 200, description = "Time slots ordered by start time", body = Vec<TimeSlotResponse>),
    ),
    tag = "time-slots"
)]
#[instrument]
pub async fn list_time_slots(
    Query(query): Query<ListSlotsQuery>,
) -> Result<Json<Vec<TimeSlotResponse>>, ApiError> {
    let conn = &mut establish_connection();

    let all = slots::list_slots(conn, query.restaurant_id, query.active_only.unwrap_or(false))?;

    Ok(Json(all.iter().map(TimeSlotResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/time-slots/",
    request_body = CreateTimeSlotRequest,
    responses(
        (status = 201, description = "Time slot created", body = TimeSlotResponse),
        (status = 400, description = "Invalid slot definition", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the restaurant's partner", body = ErrorResponse),
        (status = 409, description = "Start time already taken", body = ErrorResponse),
    ),
    tag = "time-slots"
)]
#[instrument(skip(headers, payload))]
pub async fn create_time_slot(
    headers: HeaderMap,
    Json(payload): Json<CreateTimeSlotRequest>,
) -> Result<(StatusCode, Json<TimeSlotResponse>), ApiError> {
    let principal = extract_principal(&headers)?;
    let conn = &mut establish_connection();

    let slot = slots::create_slot(
        conn,
        &principal,
        NewSlot {
            restaurant_id: payload.restaurant_id,
            start_time: parse_time("start_time", &payload.start_time).map_err(ApiError::Core)?,
            end_time: parse_time("end_time", &payload.end_time).map_err(ApiError::Core)?,
            max_bookings: payload.max_bookings,
            is_active: payload.is_active.unwrap_or(true),
        },
    )?;

    Ok((StatusCode::CREATED, Json(TimeSlotResponse::from(&slot))))
}

#[utoipa::path(
    put,
    path = "/time-slots/{id}/",
    params(("id" = Uuid, Path, description = "Time slot ID")),
    request_body = UpdateTimeSlotRequest,
    responses(
        (status = 200, description = "Time slot updated", body = TimeSlotResponse),
        (status = 400, description = "Invalid slot definition", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the restaurant's partner", body = ErrorResponse),
        (status = 404, description = "Time slot not found", body = ErrorResponse),
        (status = 409, description = "Start time already taken", body = ErrorResponse),
    ),
    tag = "time-slots"
)]
#[instrument(skip(headers, payload))]
pub async fn update_time_slot(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTimeSlotRequest>,
) -> Result<Json<TimeSlotResponse>, ApiError> {
    let principal = extract_principal(&headers)?;
    let conn = &mut establish_connection();

    let start_time = payload
        .start_time
        .as_deref()
        .map(|value| parse_time("start_time", value))
        .transpose()
        .map_err(ApiError::Core)?;
    let end_time = payload
        .end_time
        .as_deref()
        .map(|value| parse_time("end_time", value))
        .transpose()
        .map_err(ApiError::Core)?;

    let slot = slots::update_slot(
        conn,
        &principal,
        id,
        SlotChanges {
            start_time,
            end_time,
            max_bookings: payload.max_bookings.map(Some),
            is_active: payload.is_active,
        },
    )?;

    Ok(Json(TimeSlotResponse::from(&slot)))
}

#[utoipa::path(
    delete,
    path = "/time-slots/{id}/",
    params(("id" = Uuid, Path, description = "Time slot ID")),
    responses(
        (status = 204, description = "Time slot deleted"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the restaurant's partner", body = ErrorResponse),
        (status = 404, description = "Time slot not found", body = ErrorResponse),
        (status = 409, description = "Slot has upcoming bookings", body = ErrorResponse),
    ),
    tag = "time-slots"
)]
#[instrument(skip(headers))]
pub async fn delete_time_slot(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let principal = extract_principal(&headers)?;
    let conn = &mut establish_connection();

    slots::delete_slot(conn, &principal, id)?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/time-slots/{id}/toggle-active/",
    params(("id" = Uuid, Path, description = "Time slot ID")),
    responses(
        (status = 200, description = "Time slot toggled", body = TimeSlotResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the restaurant's partner", body = ErrorResponse),
        (status = 404, description = "Time slot not found", body = ErrorResponse),
        (status = 409, description = "Start time already taken by another active slot", body = ErrorResponse),
    ),
    tag = "time-slots"
)]
#[instrument(skip(headers))]
pub async fn toggle_time_slot(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<TimeSlotResponse>, ApiError> {
    let principal = extract_principal(&headers)?;
    let conn = &mut establish_connection();

    let slot = slots::toggle_slot(conn, &principal, id)?;

    Ok(Json(TimeSlotResponse::from(&slot)))
}
