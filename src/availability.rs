use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::result::Error::NotFound;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{BookingStatus, Restaurant, RestaurantStatus, TimeSlot};
use crate::schema;

/// Remaining capacity of one slot on one calendar date.
#[derive(Debug, PartialEq, Clone)]
pub struct SlotAvailability {
    pub slot: TimeSlot,
    pub current_bookings: i64,
    pub available: bool,
}

/// Number of seats held for `(restaurant, slot, date)`. PENDING bookings
/// count alongside CONFIRMED ones: a request that has not been decided yet
/// provisionally holds its seat, so two customers cannot both be promised
/// the last table while the partner is deciding on the first.
pub fn count_held_bookings(
    conn: &mut PgConnection,
    restaurant_id: Uuid,
    time_slot_id: Uuid,
    date: NaiveDate,
) -> Result<i64, CoreError> {
    use schema::bookings::dsl;

    let count = dsl::bookings
        .filter(dsl::restaurant_id.eq(restaurant_id))
        .filter(dsl::time_slot_id.eq(time_slot_id))
        .filter(dsl::booking_date.eq(date))
        .filter(dsl::status.eq_any([BookingStatus::Pending, BookingStatus::Confirmed]))
        .count()
        .get_result::<i64>(conn)?;

    Ok(count)
}

fn availability_of(
    conn: &mut PgConnection,
    slot: TimeSlot,
    date: NaiveDate,
) -> Result<SlotAvailability, CoreError> {
    let current_bookings = count_held_bookings(conn, slot.restaurant_id, slot.id, date)?;
    let available = match slot.max_bookings {
        Some(max) => current_bookings < max as i64,
        None => true,
    };

    Ok(SlotAvailability {
        slot,
        current_bookings,
        available,
    })
}

/// Remaining capacity for every active slot of the restaurant on `date`,
/// ordered by start time. A restaurant that is not APPROVED offers no
/// bookable slots, so the list is simply empty rather than an error.
pub fn availability_for_date(
    conn: &mut PgConnection,
    restaurant_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<SlotAvailability>, CoreError> {
    let restaurant = schema::restaurants::table
        .find(restaurant_id)
        .select(Restaurant::as_select())
        .first(conn)
        .map_err(|err| match err {
            NotFound => CoreError::NotFound("Restaurant"),
            err => CoreError::Database(err),
        })?;

    if restaurant.status != RestaurantStatus::Approved {
        return Ok(vec![]);
    }

    let slots = schema::time_slots::table
        .filter(schema::time_slots::restaurant_id.eq(restaurant_id))
        .filter(schema::time_slots::is_active.eq(true))
        .order(schema::time_slots::start_time.asc())
        .select(TimeSlot::as_select())
        .load::<TimeSlot>(conn)?;

    slots
        .into_iter()
        .map(|slot| availability_of(conn, slot, date))
        .collect()
}

/// Same computation restricted to one slot. The slot must be active and
/// belong to the restaurant, otherwise it does not exist from the caller's
/// point of view.
pub fn availability_for_slot(
    conn: &mut PgConnection,
    restaurant_id: Uuid,
    date: NaiveDate,
    time_slot_id: Uuid,
) -> Result<SlotAvailability, CoreError> {
    let slot = schema::time_slots::table
        .find(time_slot_id)
        .filter(schema::time_slots::restaurant_id.eq(restaurant_id))
        .filter(schema::time_slots::is_active.eq(true))
        .select(TimeSlot::as_select())
        .first(conn)
        .map_err(|err| match err {
            NotFound => CoreError::NotFound("Time slot"),
            err => CoreError::Database(err),
        })?;

    availability_of(conn, slot, date)
}
