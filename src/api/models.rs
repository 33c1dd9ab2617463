use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::availability::SlotAvailability;
use crate::engine::BookingRecord;
use crate::models::TimeSlot;

const TIME_FORMAT: &str = "%H:%M";

fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, crate::error::CoreError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|_| crate::error::CoreError::validation(field, "Invalid time format. Use HH:MM"))
}

#[derive(Serialize, ToSchema)]
pub struct TimeSlotResponse {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub start_time: String,
    pub end_time: String,
    pub max_bookings: Option<i32>,
    pub is_active: bool,
}

impl From<&TimeSlot> for TimeSlotResponse {
    fn from(slot: &TimeSlot) -> Self {
        TimeSlotResponse {
            id: slot.id,
            restaurant_id: slot.restaurant_id,
            start_time: format_time(slot.start_time),
            end_time: format_time(slot.end_time),
            max_bookings: slot.max_bookings,
            is_active: slot.is_active,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SlotAvailabilityResponse {
    pub id: Uuid,
    pub start_time: String,
    pub end_time: String,
    pub max_bookings: Option<i32>,
    pub current_bookings: i64,
    pub available: bool,
}

impl From<&SlotAvailability> for SlotAvailabilityResponse {
    fn from(availability: &SlotAvailability) -> Self {
        SlotAvailabilityResponse {
            id: availability.slot.id,
            start_time: format_time(availability.slot.start_time),
            end_time: format_time(availability.slot.end_time),
            max_bookings: availability.slot.max_bookings,
            current_bookings: availability.current_bookings,
            available: availability.available,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AvailableSlotsResponse {
    pub date: NaiveDate,
    pub available_slots: Vec<SlotAvailabilityResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckAvailabilityRequest {
    pub restaurant_id: Uuid,
    pub date: NaiveDate,
    pub time_slot_id: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
pub struct SlotCheckResponse {
    pub available: bool,
    pub time_slot: TimeSlotResponse,
    pub current_bookings: i64,
    pub max_bookings: Option<i32>,
}

/// Availability check result. Shape depends on whether the request named a
/// single slot or a whole day.
#[derive(Serialize, ToSchema)]
#[serde(untagged)]
pub enum CheckAvailabilityResponse {
    Slot(SlotCheckResponse),
    Date(AvailableSlotsResponse),
}

#[derive(Deserialize, ToSchema)]
pub struct CreateTimeSlotRequest {
    pub restaurant_id: Uuid,
    /// "HH:MM"
    pub start_time: String,
    /// "HH:MM"
    pub end_time: String,
    pub max_bookings: Option<i32>,
    pub is_active: Option<bool>,
}

/// Partial update; omitted fields are left untouched.
#[derive(Deserialize, ToSchema)]
pub struct UpdateTimeSlotRequest {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub max_bookings: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub restaurant: Uuid,
    pub time_slot: Uuid,
    pub booking_date: NaiveDate,
    pub number_of_guests: i32,
    pub special_request: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct TimeSlotInfo {
    pub id: Uuid,
    pub start_time: String,
    pub end_time: String,
    pub display: String,
}

impl From<&TimeSlot> for TimeSlotInfo {
    fn from(slot: &TimeSlot) -> Self {
        TimeSlotInfo {
            id: slot.id,
            start_time: format_time(slot.start_time),
            end_time: format_time(slot.end_time),
            display: format!("{} - {}", format_time(slot.start_time), format_time(slot.end_time)),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BookingResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub restaurant_id: Uuid,
    pub restaurant_name: String,
    pub booking_date: NaiveDate,
    pub time_slot_info: TimeSlotInfo,
    pub number_of_guests: i32,
    pub special_request: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub can_cancel: bool,
    pub can_confirm: bool,
    pub can_reject: bool,
}

impl From<&BookingRecord> for BookingResponse {
    fn from(record: &BookingRecord) -> Self {
        let booking = &record.booking;
        BookingResponse {
            id: booking.id,
            customer_id: booking.customer_id,
            restaurant_id: booking.restaurant_id,
            restaurant_name: record.restaurant.name.clone(),
            booking_date: booking.booking_date,
            time_slot_info: TimeSlotInfo::from(&record.slot),
            number_of_guests: booking.number_of_guests,
            special_request: booking.special_request.clone(),
            status: booking.status.to_string(),
            created_at: booking.created_at,
            confirmed_at: booking.confirmed_at,
            can_cancel: booking.can_cancel(),
            can_confirm: booking.can_confirm(),
            can_reject: booking.can_reject(),
        }
    }
}

/// Mutation envelope: `{"message": ..., "data": ...}`.
#[derive(Serialize, ToSchema)]
pub struct BookingEnvelope {
    pub message: String,
    pub data: BookingResponse,
}

impl BookingEnvelope {
    pub fn new(message: &str, record: &BookingRecord) -> Self {
        BookingEnvelope {
            message: message.to_string(),
            data: BookingResponse::from(record),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BookingListEnvelope {
    pub message: String,
    pub data: Vec<BookingResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
