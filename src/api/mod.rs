pub mod bookings;
pub mod error;
pub mod models;
pub mod restaurants;
pub mod slots;

pub use bookings::router as bookings_router;
pub use restaurants::router as restaurants_router;
pub use slots::router as slots_router;

use axum::http::HeaderMap;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::models::{Principal, Role};
use error::ApiError;

/// Resolves the caller from the identity headers the edge gateway injects
/// after verifying the session token.
fn extract_principal(headers: &HeaderMap) -> Result<Principal, ApiError> {
    let user_id = headers
        .get("x-user-id")
        .ok_or(ApiError::Unauthorized)?
        .to_str()
        .ok()
        .and_then(|value| value.parse::<Uuid>().ok())
        .ok_or(ApiError::Unauthorized)?;

    let role = headers
        .get("x-user-role")
        .ok_or(ApiError::Unauthorized)?
        .to_str()
        .ok()
        .and_then(|value| value.parse::<Role>().ok())
        .ok_or(ApiError::Unauthorized)?;

    Ok(Principal { user_id, role })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        restaurants::available_slots,
        slots::check_availability,
        slots::list_time_slots,
        slots::create_time_slot,
        slots::update_time_slot,
        slots::delete_time_slot,
        slots::toggle_time_slot,
        bookings::create_booking,
        bookings::list_bookings,
        bookings::get_booking,
        bookings::cancel_booking,
        bookings::confirm_booking,
        bookings::reject_booking,
        bookings::complete_booking,
        bookings::no_show_booking,
    ),
    components(schemas(
        models::TimeSlotResponse,
        models::SlotAvailabilityResponse,
        models::AvailableSlotsResponse,
        models::CheckAvailabilityRequest,
        models::SlotCheckResponse,
        models::CheckAvailabilityResponse,
        models::CreateTimeSlotRequest,
        models::UpdateTimeSlotRequest,
        models::CreateBookingRequest,
        models::TimeSlotInfo,
        models::BookingResponse,
        models::BookingEnvelope,
        models::BookingListEnvelope,
        models::ErrorResponse,
    )),
    tags(
        (name = "restaurants", description = "Restaurant availability"),
        (name = "time-slots", description = "Time slot management"),
        (name = "bookings", description = "Booking lifecycle"),
    ),
    info(
        title = "TableBook Booking Service API",
        description = "Slot availability and booking lifecycle for the TableBook platform",
        version = "0.1.0",
    )
)]
pub struct ApiDoc;
