use chrono::{NaiveTime, Utc};
use diesel::prelude::*;
use diesel::result::Error::NotFound;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{BookingStatus, Principal, Restaurant, Role, TimeSlot};
use crate::schema;

/// Fields accepted when creating a slot.
#[derive(Debug, Clone)]
pub struct NewSlot {
    pub restaurant_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_bookings: Option<i32>,
    pub is_active: bool,
}

/// Partial update. `None` leaves a field untouched; `Some(None)` for
/// `max_bookings` clears the capacity limit.
#[derive(AsChangeset, Debug, Default, Clone)]
#[diesel(table_name = schema::time_slots)]
pub struct SlotChanges {
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub max_bookings: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

impl SlotChanges {
    fn is_empty(&self) -> bool {
        self.start_time.is_none()
            && self.end_time.is_none()
            && self.max_bookings.is_none()
            && self.is_active.is_none()
    }
}

fn owned_restaurant(
    conn: &mut PgConnection,
    principal: &Principal,
    restaurant_id: Uuid,
) -> Result<Restaurant, CoreError> {
    let restaurant = schema::restaurants::table
        .find(restaurant_id)
        .select(Restaurant::as_select())
        .first(conn)
        .map_err(|err| match err {
            NotFound => CoreError::NotFound("Restaurant"),
            err => CoreError::Database(err),
        })?;

    match principal.role {
        Role::Admin => Ok(restaurant),
        Role::Partner if restaurant.partner_id == principal.user_id => Ok(restaurant),
        _ => Err(CoreError::Forbidden(
            "You can only manage time slots of your own restaurant".to_string(),
        )),
    }
}

fn validate_time_range(start_time: NaiveTime, end_time: NaiveTime) -> Result<(), CoreError> {
    if end_time <= start_time {
        return Err(CoreError::validation(
            "end_time",
            "End time must be after start time",
        ));
    }
    Ok(())
}

fn validate_max_bookings(max_bookings: Option<i32>) -> Result<(), CoreError> {
    if let Some(max) = max_bookings {
        if max < 1 {
            return Err(CoreError::validation(
                "max_bookings",
                "Capacity must be at least 1",
            ));
        }
    }
    Ok(())
}

/// Two active slots of one restaurant must not share a start time, or they
/// would form duplicate capacity pools for the same window.
fn assert_start_time_free(
    conn: &mut PgConnection,
    restaurant_id: Uuid,
    start_time: NaiveTime,
    exclude: Option<Uuid>,
) -> Result<(), CoreError> {
    use schema::time_slots::dsl;

    let mut query = dsl::time_slots
        .filter(dsl::restaurant_id.eq(restaurant_id))
        .filter(dsl::start_time.eq(start_time))
        .filter(dsl::is_active.eq(true))
        .into_boxed();
    if let Some(slot_id) = exclude {
        query = query.filter(dsl::id.ne(slot_id));
    }

    let duplicate = diesel::select(diesel::dsl::exists(query)).get_result::<bool>(conn)?;
    if duplicate {
        return Err(CoreError::Conflict(
            "An active time slot with this start time already exists".to_string(),
        ));
    }
    Ok(())
}

pub fn create_slot(
    conn: &mut PgConnection,
    principal: &Principal,
    new_slot: NewSlot,
) -> Result<TimeSlot, CoreError> {
    validate_time_range(new_slot.start_time, new_slot.end_time)?;
    validate_max_bookings(new_slot.max_bookings)?;

    conn.transaction(|conn| {
        owned_restaurant(conn, principal, new_slot.restaurant_id)?;
        if new_slot.is_active {
            assert_start_time_free(conn, new_slot.restaurant_id, new_slot.start_time, None)?;
        }

        let slot = TimeSlot {
            id: Uuid::new_v4(),
            restaurant_id: new_slot.restaurant_id,
            start_time: new_slot.start_time,
            end_time: new_slot.end_time,
            max_bookings: new_slot.max_bookings,
            is_active: new_slot.is_active,
        };
        diesel::insert_into(schema::time_slots::table)
            .values(&slot)
            .execute(conn)?;

        Ok(slot)
    })
}

/// Partial update. Lowering `max_bookings` never touches bookings already
/// admitted; the new capacity only applies to future creations.
pub fn update_slot(
    conn: &mut PgConnection,
    principal: &Principal,
    slot_id: Uuid,
    changes: SlotChanges,
) -> Result<TimeSlot, CoreError> {
    use schema::time_slots::dsl;

    conn.transaction(|conn| {
        let slot = dsl::time_slots
            .find(slot_id)
            .select(TimeSlot::as_select())
            .for_update()
            .first::<TimeSlot>(conn)
            .map_err(|err| match err {
                NotFound => CoreError::NotFound("Time slot"),
                err => CoreError::Database(err),
            })?;
        owned_restaurant(conn, principal, slot.restaurant_id)?;

        let start_time = changes.start_time.unwrap_or(slot.start_time);
        let end_time = changes.end_time.unwrap_or(slot.end_time);
        let max_bookings = changes.max_bookings.unwrap_or(slot.max_bookings);
        let is_active = changes.is_active.unwrap_or(slot.is_active);
        validate_time_range(start_time, end_time)?;
        validate_max_bookings(max_bookings)?;
        if is_active {
            assert_start_time_free(conn, slot.restaurant_id, start_time, Some(slot.id))?;
        }

        if changes.is_empty() {
            return Ok(slot);
        }
        diesel::update(dsl::time_slots.find(slot_id))
            .set(&changes)
            .execute(conn)?;

        dsl::time_slots
            .find(slot_id)
            .select(TimeSlot::as_select())
            .first(conn)
            .map_err(CoreError::Database)
    })
}

/// Flip `is_active`. Deactivation is the soft-delete path for slots still
/// referenced by bookings.
pub fn toggle_slot(
    conn: &mut PgConnection,
    principal: &Principal,
    slot_id: Uuid,
) -> Result<TimeSlot, CoreError> {
    use schema::time_slots::dsl;

    conn.transaction(|conn| {
        let slot = dsl::time_slots
            .find(slot_id)
            .select(TimeSlot::as_select())
            .for_update()
            .first::<TimeSlot>(conn)
            .map_err(|err| match err {
                NotFound => CoreError::NotFound("Time slot"),
                err => CoreError::Database(err),
            })?;
        owned_restaurant(conn, principal, slot.restaurant_id)?;

        if !slot.is_active {
            assert_start_time_free(conn, slot.restaurant_id, slot.start_time, Some(slot.id))?;
        }

        diesel::update(dsl::time_slots.find(slot_id))
            .set(dsl::is_active.eq(!slot.is_active))
            .execute(conn)?;

        Ok(TimeSlot {
            is_active: !slot.is_active,
            ..slot
        })
    })
}

/// Physical deletion is only permitted when no undecided or upcoming stay
/// references the slot; history with terminal bookings keeps the row via
/// deactivation instead.
pub fn delete_slot(
    conn: &mut PgConnection,
    principal: &Principal,
    slot_id: Uuid,
) -> Result<(), CoreError> {
    use schema::time_slots::dsl;

    conn.transaction(|conn| {
        let slot = dsl::time_slots
            .find(slot_id)
            .select(TimeSlot::as_select())
            .for_update()
            .first::<TimeSlot>(conn)
            .map_err(|err| match err {
                NotFound => CoreError::NotFound("Time slot"),
                err => CoreError::Database(err),
            })?;
        owned_restaurant(conn, principal, slot.restaurant_id)?;

        let today = Utc::now().date_naive();
        let blocking = diesel::select(diesel::dsl::exists(
            schema::bookings::table
                .filter(schema::bookings::time_slot_id.eq(slot_id))
                .filter(schema::bookings::booking_date.ge(today))
                .filter(
                    schema::bookings::status
                        .eq_any([BookingStatus::Pending, BookingStatus::Confirmed]),
                ),
        ))
        .get_result::<bool>(conn)?;
        if blocking {
            return Err(CoreError::Conflict(
                "Time slot has upcoming bookings; deactivate it instead".to_string(),
            ));
        }

        diesel::delete(dsl::time_slots.find(slot_id)).execute(conn)?;
        Ok(())
    })
}

pub fn list_slots(
    conn: &mut PgConnection,
    restaurant_id: Uuid,
    active_only: bool,
) -> Result<Vec<TimeSlot>, CoreError> {
    use schema::time_slots::dsl;

    let mut query = dsl::time_slots
        .filter(dsl::restaurant_id.eq(restaurant_id))
        .order(dsl::start_time.asc())
        .select(TimeSlot::as_select())
        .into_boxed();
    if active_only {
        query = query.filter(dsl::is_active.eq(true));
    }

    query.load(conn).map_err(CoreError::Database)
}
