use axum::{
    Router,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post, put},
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::engine::{self, BookingFilter, BookingOrder, BookingRequest};
use crate::error::CoreError;
use crate::establish_connection;
use crate::models::Principal;

use super::error::ApiError;
use super::extract_principal;
use super::models::*;

pub fn router() -> Router {
    Router::new()
        .route("/bookings/", post(create_booking).get(list_bookings))
        .route("/bookings/{id}/", get(get_booking))
        .route("/bookings/{id}/cancel/", put(cancel_booking))
        .route("/bookings/{id}/confirm/", put(confirm_booking))
        .route("/bookings/{id}/reject/", put(reject_booking))
        .route("/bookings/{id}/complete/", put(complete_booking))
        .route("/bookings/{id}/no-show/", put(no_show_booking))
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<String>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
    pub restaurant_id: Option<Uuid>,
    pub order_by: Option<String>,
}

impl ListBookingsQuery {
    fn into_filter(self) -> Result<BookingFilter, CoreError> {
        let status = self
            .status
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| CoreError::validation("status", "Unknown booking status"))
            })
            .transpose()?;
        let order_by = self
            .order_by
            .map(|value| {
                value.parse::<BookingOrder>().map_err(|_| {
                    CoreError::validation("order_by", "Unknown ordering field")
                })
            })
            .transpose()?
            .unwrap_or_default();

        Ok(BookingFilter {
            status,
            start_date: self.start_date,
            end_date: self.end_date,
            restaurant_id: self.restaurant_id,
            order_by,
        })
    }
}

#[utoipa::path(
    post,
    path = "/bookings/",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created successfully", body = BookingEnvelope),
        (status = 400, description = "Invalid booking request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Caller may not create bookings", body = ErrorResponse),
        (status = 404, description = "Time slot not found", body = ErrorResponse),
        (status = 409, description = "Slot is fully booked", body = ErrorResponse),
    ),
    tag = "bookings"
)]
#[instrument(skip(headers, payload))]
pub async fn create_booking(
    headers: HeaderMap,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingEnvelope>), ApiError> {
    let principal = extract_principal(&headers)?;
    let conn = &mut establish_connection();

    let booking = engine::create_booking(
        conn,
        &principal,
        BookingRequest {
            restaurant_id: payload.restaurant,
            time_slot_id: payload.time_slot,
            booking_date: payload.booking_date,
            number_of_guests: payload.number_of_guests,
            special_request: payload.special_request,
        },
    )?;
    let record = engine::get_booking(conn, &principal, booking.id)?;

    Ok((
        StatusCode::CREATED,
        Json(BookingEnvelope::new("Booking created successfully", &record)),
    ))
}

#[utoipa::path(
    get,
    path = "/bookings/",
    params(
        ("status" = Option<String>, Query, description = "Filter by booking status"),
        ("start_date" = Option<String>, Query, description = "Earliest booking date (inclusive)"),
        ("end_date" = Option<String>, Query, description = "Latest booking date (inclusive)"),
        ("restaurant_id" = Option<Uuid>, Query, description = "Restrict to one restaurant (partner/admin)"),
        ("order_by" = Option<String>, Query, description = "created_at, -created_at, booking_date or -booking_date"),
    ),
    responses(
        (status = 200, description = "Bookings visible to the caller", body = BookingListEnvelope),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    ),
    tag = "bookings"
)]
#[instrument(skip(headers))]
pub async fn list_bookings(
    headers: HeaderMap,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<BookingListEnvelope>, ApiError> {
    let principal = extract_principal(&headers)?;
    let filter = query.into_filter().map_err(ApiError::Core)?;
    let conn = &mut establish_connection();

    let records = engine::list_bookings(conn, &principal, &filter)?;

    Ok(Json(BookingListEnvelope {
        message: "Bookings retrieved successfully".to_string(),
        data: records.iter().map(BookingResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/bookings/{id}/",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking details", body = BookingEnvelope),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
    ),
    tag = "bookings"
)]
#[instrument(skip(headers))]
pub async fn get_booking(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingEnvelope>, ApiError> {
    let principal = extract_principal(&headers)?;
    let conn = &mut establish_connection();

    let record = engine::get_booking(conn, &principal, id)?;

    Ok(Json(BookingEnvelope::new(
        "Booking retrieved successfully",
        &record,
    )))
}

fn transition(
    headers: &HeaderMap,
    id: Uuid,
    message: &str,
    apply: impl FnOnce(
        &mut diesel::PgConnection,
        &Principal,
        Uuid,
    ) -> Result<crate::models::Booking, CoreError>,
) -> Result<Json<BookingEnvelope>, ApiError> {
    let principal = extract_principal(headers)?;
    let conn = &mut establish_connection();
    let booking = apply(conn, &principal, id)?;
    let record = engine::get_booking(conn, &principal, booking.id)?;
    Ok(Json(BookingEnvelope::new(message, &record)))
}

#[utoipa::path(
    put,
    path = "/bookings/{id}/cancel/",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking cancelled successfully", body = BookingEnvelope),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the booking's customer", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Booking can no longer be cancelled", body = ErrorResponse),
    ),
    tag = "bookings"
)]
#[instrument(skip(headers))]
pub async fn cancel_booking(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingEnvelope>, ApiError> {
    transition(&headers, id, "Booking cancelled successfully", |conn, principal, id| {
        engine::cancel_booking(conn, principal, id)
    })
}

#[utoipa::path(
    put,
    path = "/bookings/{id}/confirm/",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking confirmed successfully", body = BookingEnvelope),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the restaurant's partner", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Booking is not pending", body = ErrorResponse),
    ),
    tag = "bookings"
)]
#[instrument(skip(headers))]
pub async fn confirm_booking(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingEnvelope>, ApiError> {
    transition(&headers, id, "Booking confirmed successfully", |conn, principal, id| {
        engine::confirm_booking(conn, principal, id)
    })
}

#[utoipa::path(
    put,
    path = "/bookings/{id}/reject/",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking rejected successfully", body = BookingEnvelope),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the restaurant's partner", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Booking is not pending", body = ErrorResponse),
    ),
    tag = "bookings"
)]
#[instrument(skip(headers))]
pub async fn reject_booking(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingEnvelope>, ApiError> {
    transition(&headers, id, "Booking rejected successfully", |conn, principal, id| {
        engine::reject_booking(conn, principal, id)
    })
}

#[utoipa::path(
    put,
    path = "/bookings/{id}/complete/",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking marked as completed", body = BookingEnvelope),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the restaurant's partner", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Booking is not confirmed", body = ErrorResponse),
    ),
    tag = "bookings"
)]
#[instrument(skip(headers))]
pub async fn complete_booking(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingEnvelope>, ApiError> {
    transition(&headers, id, "Booking marked as completed", |conn, principal, id| {
        engine::complete_booking(conn, principal, id)
    })
}

#[utoipa::path(
    put,
    path = "/bookings/{id}/no-show/",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking marked as no-show", body = BookingEnvelope),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the restaurant's partner", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Booking is not confirmed", body = ErrorResponse),
    ),
    tag = "bookings"
)]
#[instrument(skip(headers))]
pub async fn no_show_booking(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingEnvelope>, ApiError> {
    transition(&headers, id, "Booking marked as no-show", |conn, principal, id| {
        engine::mark_no_show(conn, principal, id)
    })
}
