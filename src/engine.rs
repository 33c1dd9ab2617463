use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::result::Error::NotFound;
use uuid::Uuid;

use crate::availability::count_held_bookings;
use crate::error::CoreError;
use crate::events::BookingEventPublisher;
use crate::models::{
    Booking, BookingStatus, Principal, Restaurant, RestaurantStatus, Role, TimeSlot,
};
use crate::schema;

/// Upper bound on party size, carried over from the booking form.
pub const MAX_GUESTS: i32 = 50;

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub restaurant_id: Uuid,
    pub time_slot_id: Uuid,
    pub booking_date: NaiveDate,
    pub number_of_guests: i32,
    pub special_request: Option<String>,
}

/// A booking joined with the slot and restaurant it references.
#[derive(Debug)]
pub struct BookingRecord {
    pub booking: Booking,
    pub slot: TimeSlot,
    pub restaurant: Restaurant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingOrder {
    CreatedAtAsc,
    #[default]
    CreatedAtDesc,
    BookingDateAsc,
    BookingDateDesc,
}

impl std::str::FromStr for BookingOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(BookingOrder::CreatedAtAsc),
            "-created_at" => Ok(BookingOrder::CreatedAtDesc),
            "booking_date" => Ok(BookingOrder::BookingDateAsc),
            "-booking_date" => Ok(BookingOrder::BookingDateDesc),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub restaurant_id: Option<Uuid>,
    pub order_by: BookingOrder,
}

/// Admits a new booking. The capacity check and the insert run inside one
/// transaction holding a lock on the slot row, so concurrent requests for
/// the same slot are admitted strictly one at a time and the count can never
/// overshoot `max_bookings`.
pub fn create_booking(
    conn: &mut PgConnection,
    principal: &Principal,
    request: BookingRequest,
) -> Result<Booking, CoreError> {
    if principal.role != Role::Customer {
        return Err(CoreError::Forbidden(
            "Only customers can create bookings".to_string(),
        ));
    }
    if request.number_of_guests < 1 {
        return Err(CoreError::validation(
            "number_of_guests",
            "Number of guests must be greater than zero",
        ));
    }
    if request.number_of_guests > MAX_GUESTS {
        return Err(CoreError::validation(
            "number_of_guests",
            format!("Number of guests must not exceed {}", MAX_GUESTS),
        ));
    }
    if request.booking_date < Utc::now().date_naive() {
        return Err(CoreError::validation(
            "booking_date",
            "Cannot book a table for a past date",
        ));
    }

    conn.transaction(|conn| {
        let slot = schema::time_slots::table
            .find(request.time_slot_id)
            .select(TimeSlot::as_select())
            .for_update()
            .first::<TimeSlot>(conn)
            .map_err(|err| match err {
                NotFound => CoreError::NotFound("Time slot"),
                err => CoreError::Database(err),
            })?;
        if slot.restaurant_id != request.restaurant_id {
            return Err(CoreError::validation(
                "time_slot",
                "Time slot does not belong to this restaurant",
            ));
        }
        if !slot.is_active {
            return Err(CoreError::validation(
                "time_slot",
                "Time slot is currently unavailable",
            ));
        }

        let restaurant = schema::restaurants::table
            .find(request.restaurant_id)
            .select(Restaurant::as_select())
            .first::<Restaurant>(conn)
            .map_err(|err| match err {
                NotFound => CoreError::NotFound("Restaurant"),
                err => CoreError::Database(err),
            })?;
        if restaurant.status != RestaurantStatus::Approved {
            return Err(CoreError::validation(
                "restaurant",
                "Restaurant is not accepting bookings",
            ));
        }

        let current = count_held_bookings(
            conn,
            request.restaurant_id,
            request.time_slot_id,
            request.booking_date,
        )?;
        if let Some(max) = slot.max_bookings {
            if current >= max as i64 {
                return Err(CoreError::CapacityExceeded { current, max });
            }
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            customer_id: principal.user_id,
            restaurant_id: request.restaurant_id,
            time_slot_id: request.time_slot_id,
            booking_date: request.booking_date,
            number_of_guests: request.number_of_guests,
            special_request: request.special_request,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
            confirmed_at: None,
        };
        diesel::insert_into(schema::bookings::table)
            .values(&booking)
            .execute(conn)?;

        let mut publisher = BookingEventPublisher::new(conn);
        publisher.booking_created(&booking, restaurant.partner_id)?;

        Ok(booking)
    })
}

fn locked_booking(conn: &mut PgConnection, booking_id: Uuid) -> Result<Booking, CoreError> {
    schema::bookings::table
        .find(booking_id)
        .select(Booking::as_select())
        .for_update()
        .first::<Booking>(conn)
        .map_err(|err| match err {
            NotFound => CoreError::NotFound("Booking"),
            err => CoreError::Database(err),
        })
}

fn load_restaurant(conn: &mut PgConnection, restaurant_id: Uuid) -> Result<Restaurant, CoreError> {
    schema::restaurants::table
        .find(restaurant_id)
        .select(Restaurant::as_select())
        .first::<Restaurant>(conn)
        .map_err(|err| match err {
            NotFound => CoreError::NotFound("Restaurant"),
            err => CoreError::Database(err),
        })
}

fn assert_owning_partner(
    principal: &Principal,
    restaurant: &Restaurant,
    action: &str,
) -> Result<(), CoreError> {
    if principal.role != Role::Partner || restaurant.partner_id != principal.user_id {
        return Err(CoreError::Forbidden(format!(
            "You are not allowed to {} this booking",
            action
        )));
    }
    Ok(())
}

/// PENDING -> CONFIRMED, by the partner owning the restaurant.
pub fn confirm_booking(
    conn: &mut PgConnection,
    principal: &Principal,
    booking_id: Uuid,
) -> Result<Booking, CoreError> {
    conn.transaction(|conn| {
        let booking = locked_booking(conn, booking_id)?;
        let restaurant = load_restaurant(conn, booking.restaurant_id)?;
        assert_owning_partner(principal, &restaurant, "confirm")?;
        if booking.status != BookingStatus::Pending {
            return Err(CoreError::InvalidTransition {
                current: booking.status,
                attempted: BookingStatus::Confirmed,
            });
        }

        let now = Utc::now();
        diesel::update(schema::bookings::table.find(booking_id))
            .set((
                schema::bookings::status.eq(BookingStatus::Confirmed),
                schema::bookings::confirmed_at.eq(now),
            ))
            .execute(conn)?;

        let booking = Booking {
            status: BookingStatus::Confirmed,
            confirmed_at: Some(now),
            ..booking
        };
        let mut publisher = BookingEventPublisher::new(conn);
        publisher.booking_confirmed(&booking)?;

        Ok(booking)
    })
}

/// PENDING -> REJECTED, by the partner owning the restaurant. Releases the
/// seat held by the pending request.
pub fn reject_booking(
    conn: &mut PgConnection,
    principal: &Principal,
    booking_id: Uuid,
) -> Result<Booking, CoreError> {
    conn.transaction(|conn| {
        let booking = locked_booking(conn, booking_id)?;
        let restaurant = load_restaurant(conn, booking.restaurant_id)?;
        assert_owning_partner(principal, &restaurant, "reject")?;
        if booking.status != BookingStatus::Pending {
            return Err(CoreError::InvalidTransition {
                current: booking.status,
                attempted: BookingStatus::Rejected,
            });
        }

        diesel::update(schema::bookings::table.find(booking_id))
            .set(schema::bookings::status.eq(BookingStatus::Rejected))
            .execute(conn)?;

        let booking = Booking {
            status: BookingStatus::Rejected,
            ..booking
        };
        let mut publisher = BookingEventPublisher::new(conn);
        publisher.booking_rejected(&booking)?;

        Ok(booking)
    })
}

/// PENDING or CONFIRMED -> CANCELLED, by the customer who owns the booking.
pub fn cancel_booking(
    conn: &mut PgConnection,
    principal: &Principal,
    booking_id: Uuid,
) -> Result<Booking, CoreError> {
    conn.transaction(|conn| {
        let booking = locked_booking(conn, booking_id)?;
        if principal.role != Role::Customer || booking.customer_id != principal.user_id {
            return Err(CoreError::Forbidden(
                "You are not allowed to cancel this booking".to_string(),
            ));
        }
        if !booking.can_cancel() {
            return Err(CoreError::InvalidTransition {
                current: booking.status,
                attempted: BookingStatus::Cancelled,
            });
        }
        let restaurant = load_restaurant(conn, booking.restaurant_id)?;

        diesel::update(schema::bookings::table.find(booking_id))
            .set(schema::bookings::status.eq(BookingStatus::Cancelled))
            .execute(conn)?;

        let booking = Booking {
            status: BookingStatus::Cancelled,
            ..booking
        };
        let mut publisher = BookingEventPublisher::new(conn);
        publisher.booking_cancelled(&booking, restaurant.partner_id)?;

        Ok(booking)
    })
}

/// CONFIRMED -> COMPLETED, by the partner owning the restaurant.
pub fn complete_booking(
    conn: &mut PgConnection,
    principal: &Principal,
    booking_id: Uuid,
) -> Result<Booking, CoreError> {
    conn.transaction(|conn| {
        let booking = locked_booking(conn, booking_id)?;
        let restaurant = load_restaurant(conn, booking.restaurant_id)?;
        assert_owning_partner(principal, &restaurant, "update")?;
        if booking.status != BookingStatus::Confirmed {
            return Err(CoreError::InvalidTransition {
                current: booking.status,
                attempted: BookingStatus::Completed,
            });
        }

        diesel::update(schema::bookings::table.find(booking_id))
            .set(schema::bookings::status.eq(BookingStatus::Completed))
            .execute(conn)?;

        let booking = Booking {
            status: BookingStatus::Completed,
            ..booking
        };
        let mut publisher = BookingEventPublisher::new(conn);
        publisher.booking_completed(&booking)?;

        Ok(booking)
    })
}

/// CONFIRMED -> NO_SHOW, by the partner owning the restaurant.
pub fn mark_no_show(
    conn: &mut PgConnection,
    principal: &Principal,
    booking_id: Uuid,
) -> Result<Booking, CoreError> {
    conn.transaction(|conn| {
        let booking = locked_booking(conn, booking_id)?;
        let restaurant = load_restaurant(conn, booking.restaurant_id)?;
        assert_owning_partner(principal, &restaurant, "update")?;
        if booking.status != BookingStatus::Confirmed {
            return Err(CoreError::InvalidTransition {
                current: booking.status,
                attempted: BookingStatus::NoShow,
            });
        }

        diesel::update(schema::bookings::table.find(booking_id))
            .set(schema::bookings::status.eq(BookingStatus::NoShow))
            .execute(conn)?;

        let booking = Booking {
            status: BookingStatus::NoShow,
            ..booking
        };
        let mut publisher = BookingEventPublisher::new(conn);
        publisher.booking_no_show(&booking)?;

        Ok(booking)
    })
}

fn visible_to(principal: &Principal, booking: &Booking, restaurant: &Restaurant) -> bool {
    match principal.role {
        Role::Customer => booking.customer_id == principal.user_id,
        Role::Partner => restaurant.partner_id == principal.user_id,
        Role::Admin => true,
    }
}

/// Fetches one booking with its slot and restaurant. A booking the caller
/// may not see is indistinguishable from one that does not exist.
pub fn get_booking(
    conn: &mut PgConnection,
    principal: &Principal,
    booking_id: Uuid,
) -> Result<BookingRecord, CoreError> {
    let (booking, slot, restaurant) = schema::bookings::table
        .find(booking_id)
        .inner_join(
            schema::time_slots::table
                .on(schema::time_slots::id.eq(schema::bookings::time_slot_id)),
        )
        .inner_join(
            schema::restaurants::table
                .on(schema::restaurants::id.eq(schema::bookings::restaurant_id)),
        )
        .select((
            Booking::as_select(),
            TimeSlot::as_select(),
            Restaurant::as_select(),
        ))
        .first::<(Booking, TimeSlot, Restaurant)>(conn)
        .map_err(|err| match err {
            NotFound => CoreError::NotFound("Booking"),
            err => CoreError::Database(err),
        })?;

    if !visible_to(principal, &booking, &restaurant) {
        return Err(CoreError::NotFound("Booking"));
    }

    Ok(BookingRecord {
        booking,
        slot,
        restaurant,
    })
}

/// Lists bookings visible to the caller: customers see their own, partners
/// see every booking of restaurants they own, admins see everything.
pub fn list_bookings(
    conn: &mut PgConnection,
    principal: &Principal,
    filter: &BookingFilter,
) -> Result<Vec<BookingRecord>, CoreError> {
    use schema::bookings;

    let mut query = bookings::table
        .inner_join(
            schema::time_slots::table.on(schema::time_slots::id.eq(bookings::time_slot_id)),
        )
        .inner_join(
            schema::restaurants::table.on(schema::restaurants::id.eq(bookings::restaurant_id)),
        )
        .select((
            Booking::as_select(),
            TimeSlot::as_select(),
            Restaurant::as_select(),
        ))
        .into_boxed();

    query = match principal.role {
        Role::Customer => query.filter(bookings::customer_id.eq(principal.user_id)),
        Role::Partner => query.filter(schema::restaurants::partner_id.eq(principal.user_id)),
        Role::Admin => query,
    };

    if let Some(status) = filter.status {
        query = query.filter(bookings::status.eq(status));
    }
    if let Some(start_date) = filter.start_date {
        query = query.filter(bookings::booking_date.ge(start_date));
    }
    if let Some(end_date) = filter.end_date {
        query = query.filter(bookings::booking_date.le(end_date));
    }
    if let Some(restaurant_id) = filter.restaurant_id {
        // Customers are already scoped to their own bookings; the
        // restaurant filter is a partner/admin dashboard concern.
        if principal.role != Role::Customer {
            query = query.filter(bookings::restaurant_id.eq(restaurant_id));
        }
    }

    query = match filter.order_by {
        BookingOrder::CreatedAtAsc => query.order(bookings::created_at.asc()),
        BookingOrder::CreatedAtDesc => query.order(bookings::created_at.desc()),
        BookingOrder::BookingDateAsc => query.order(bookings::booking_date.asc()),
        BookingOrder::BookingDateDesc => query.order(bookings::booking_date.desc()),
    };

    let rows = query.load::<(Booking, TimeSlot, Restaurant)>(conn)?;
    Ok(rows
        .into_iter()
        .map(|(booking, slot, restaurant)| BookingRecord {
            booking,
            slot,
            restaurant,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::availability_for_slot;
    use crate::models::RestaurantStatus;
    use crate::testutil::{
        customer_of, future_date, insert_restaurant, insert_slot, partner_of, some_customer,
    };
    use crate::{establish_connection, EVENT_CHANNEL};

    fn request(restaurant: &Restaurant, slot: &TimeSlot) -> BookingRequest {
        BookingRequest {
            restaurant_id: restaurant.id,
            time_slot_id: slot.id,
            booking_date: future_date(14),
            number_of_guests: 2,
            special_request: None,
        }
    }

    fn outbox_events_for(conn: &mut PgConnection, booking_id: Uuid) -> Vec<serde_json::Value> {
        use crate::schema::outbox::dsl::*;
        outbox
            .filter(topic.eq(EVENT_CHANNEL))
            .order(id.asc())
            .select(value)
            .load::<serde_json::Value>(conn)
            .unwrap()
            .into_iter()
            .filter(|v| v["booking_id"] == serde_json::json!(booking_id))
            .collect()
    }

    #[test]
    fn create_admits_pending_booking_and_emits_event() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, restaurant.id, "10:00", "12:00", Some(3), true);
        let customer = some_customer();

        let booking = create_booking(conn, &customer, request(&restaurant, &slot)).unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.customer_id, customer.user_id);
        assert!(booking.confirmed_at.is_none());

        let events = outbox_events_for(conn, booking.id);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["type"], "BOOKING");
        assert_eq!(events[0]["new_status"], "PENDING");
        assert_eq!(
            events[0]["recipient_id"],
            serde_json::json!(restaurant.partner_id)
        );
    }

    #[test]
    fn create_validates_input() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, restaurant.id, "10:00", "12:00", Some(3), true);
        let customer = some_customer();

        let mut bad = request(&restaurant, &slot);
        bad.number_of_guests = 0;
        assert!(matches!(
            create_booking(conn, &customer, bad),
            Err(CoreError::Validation { field: "number_of_guests", .. })
        ));

        let mut bad = request(&restaurant, &slot);
        bad.number_of_guests = MAX_GUESTS + 1;
        assert!(matches!(
            create_booking(conn, &customer, bad),
            Err(CoreError::Validation { field: "number_of_guests", .. })
        ));

        let mut bad = request(&restaurant, &slot);
        bad.booking_date = Utc::now().date_naive() - chrono::Days::new(1);
        assert!(matches!(
            create_booking(conn, &customer, bad),
            Err(CoreError::Validation { field: "booking_date", .. })
        ));
    }

    #[test]
    fn create_rejects_foreign_or_inactive_slot() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let other = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, other.id, "10:00", "12:00", Some(3), true);
        let inactive = insert_slot(conn, restaurant.id, "14:00", "16:00", Some(3), false);
        let customer = some_customer();

        // Slot belongs to a different restaurant.
        assert!(matches!(
            create_booking(conn, &customer, request(&restaurant, &slot)),
            Err(CoreError::Validation { field: "time_slot", .. })
        ));
        assert!(matches!(
            create_booking(conn, &customer, request(&restaurant, &inactive)),
            Err(CoreError::Validation { field: "time_slot", .. })
        ));
    }

    #[test]
    fn create_requires_approved_restaurant() {
        let conn = &mut establish_connection();
        for status in [
            RestaurantStatus::Pending,
            RestaurantStatus::Suspended,
            RestaurantStatus::Closed,
        ] {
            let restaurant = insert_restaurant(conn, status);
            let slot = insert_slot(conn, restaurant.id, "10:00", "12:00", Some(3), true);
            assert!(matches!(
                create_booking(conn, &some_customer(), request(&restaurant, &slot)),
                Err(CoreError::Validation { field: "restaurant", .. })
            ));
        }
    }

    #[test]
    fn create_is_customer_only() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, restaurant.id, "10:00", "12:00", Some(3), true);

        let partner = partner_of(&restaurant);
        assert!(matches!(
            create_booking(conn, &partner, request(&restaurant, &slot)),
            Err(CoreError::Forbidden(_))
        ));
    }

    #[test]
    fn create_fails_when_slot_is_full() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, restaurant.id, "10:00", "12:00", Some(2), true);

        create_booking(conn, &some_customer(), request(&restaurant, &slot)).unwrap();
        create_booking(conn, &some_customer(), request(&restaurant, &slot)).unwrap();
        let result = create_booking(conn, &some_customer(), request(&restaurant, &slot));
        assert!(matches!(
            result,
            Err(CoreError::CapacityExceeded { current: 2, max: 2 })
        ));

        // The same slot on another date is an independent capacity pool.
        let mut other_day = request(&restaurant, &slot);
        other_day.booking_date = future_date(15);
        create_booking(conn, &some_customer(), other_day).unwrap();
    }

    #[test]
    fn concurrent_admissions_never_exceed_capacity() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, restaurant.id, "19:00", "21:00", Some(3), true);
        let day = future_date(21);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let restaurant_id = restaurant.id;
                let slot_id = slot.id;
                std::thread::spawn(move || {
                    let conn = &mut establish_connection();
                    create_booking(
                        conn,
                        &some_customer(),
                        BookingRequest {
                            restaurant_id,
                            time_slot_id: slot_id,
                            booking_date: day,
                            number_of_guests: 2,
                            special_request: None,
                        },
                    )
                })
            })
            .collect();

        let mut admitted = 0;
        let mut capacity_errors = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(booking) => {
                    assert_eq!(booking.status, BookingStatus::Pending);
                    admitted += 1;
                }
                Err(CoreError::CapacityExceeded { .. }) => capacity_errors += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(admitted, 3);
        assert_eq!(capacity_errors, 5);

        let a = availability_for_slot(conn, restaurant.id, day, slot.id).unwrap();
        assert_eq!(a.current_bookings, 3);
        assert!(!a.available);
    }

    #[test]
    fn confirm_sets_confirmed_at() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, restaurant.id, "10:00", "12:00", Some(3), true);
        let booking = create_booking(conn, &some_customer(), request(&restaurant, &slot)).unwrap();

        let confirmed = confirm_booking(conn, &partner_of(&restaurant), booking.id).unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert!(confirmed.confirmed_at.is_some());

        let events = outbox_events_for(conn, booking.id);
        assert_eq!(events.last().unwrap()["new_status"], "CONFIRMED");
        assert_eq!(
            events.last().unwrap()["recipient_id"],
            serde_json::json!(booking.customer_id)
        );
    }

    #[test]
    fn double_confirm_fails() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, restaurant.id, "10:00", "12:00", Some(3), true);
        let booking = create_booking(conn, &some_customer(), request(&restaurant, &slot)).unwrap();
        let partner = partner_of(&restaurant);

        confirm_booking(conn, &partner, booking.id).unwrap();
        let result = confirm_booking(conn, &partner, booking.id);
        assert!(matches!(
            result,
            Err(CoreError::InvalidTransition {
                current: BookingStatus::Confirmed,
                attempted: BookingStatus::Confirmed,
            })
        ));
    }

    #[test]
    fn cancel_works_from_pending_and_confirmed() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, restaurant.id, "10:00", "12:00", Some(3), true);
        let partner = partner_of(&restaurant);

        let pending = create_booking(conn, &some_customer(), request(&restaurant, &slot)).unwrap();
        let cancelled = cancel_booking(conn, &customer_of(&pending), pending.id).unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let confirmed =
            create_booking(conn, &some_customer(), request(&restaurant, &slot)).unwrap();
        confirm_booking(conn, &partner, confirmed.id).unwrap();
        let cancelled = cancel_booking(conn, &customer_of(&confirmed), confirmed.id).unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        // A confirmed-then-cancelled booking keeps its confirmation stamp.
        assert!(cancelled.confirmed_at.is_some());
    }

    #[test]
    fn terminal_states_accept_no_transition() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, restaurant.id, "10:00", "12:00", None, true);
        let partner = partner_of(&restaurant);

        let terminal: Vec<Booking> = [
            BookingStatus::Rejected,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
            BookingStatus::NoShow,
        ]
        .into_iter()
        .map(|target| {
            let booking =
                create_booking(conn, &some_customer(), request(&restaurant, &slot)).unwrap();
            match target {
                BookingStatus::Rejected => reject_booking(conn, &partner, booking.id).unwrap(),
                BookingStatus::Cancelled => {
                    cancel_booking(conn, &customer_of(&booking), booking.id).unwrap()
                }
                BookingStatus::Completed => {
                    confirm_booking(conn, &partner, booking.id).unwrap();
                    complete_booking(conn, &partner, booking.id).unwrap()
                }
                BookingStatus::NoShow => {
                    confirm_booking(conn, &partner, booking.id).unwrap();
                    mark_no_show(conn, &partner, booking.id).unwrap()
                }
                _ => unreachable!(),
            }
        })
        .collect();

        for booking in terminal {
            assert!(booking.status.is_terminal());
            assert!(matches!(
                confirm_booking(conn, &partner, booking.id),
                Err(CoreError::InvalidTransition { .. })
            ));
            assert!(matches!(
                reject_booking(conn, &partner, booking.id),
                Err(CoreError::InvalidTransition { .. })
            ));
            assert!(matches!(
                cancel_booking(conn, &customer_of(&booking), booking.id),
                Err(CoreError::InvalidTransition { .. })
            ));
            assert!(matches!(
                complete_booking(conn, &partner, booking.id),
                Err(CoreError::InvalidTransition { .. })
            ));
            assert!(matches!(
                mark_no_show(conn, &partner, booking.id),
                Err(CoreError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn transitions_are_role_gated() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, restaurant.id, "10:00", "12:00", Some(3), true);
        let booking = create_booking(conn, &some_customer(), request(&restaurant, &slot)).unwrap();
        let owner = customer_of(&booking);

        // The customer who owns the booking still cannot act as the partner.
        assert!(matches!(
            confirm_booking(conn, &owner, booking.id),
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            reject_booking(conn, &owner, booking.id),
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            complete_booking(conn, &owner, booking.id),
            Err(CoreError::Forbidden(_))
        ));

        // A partner of a different restaurant owns nothing here.
        let other = insert_restaurant(conn, RestaurantStatus::Approved);
        assert!(matches!(
            confirm_booking(conn, &partner_of(&other), booking.id),
            Err(CoreError::Forbidden(_))
        ));

        // Partners cannot cancel on the customer's behalf.
        assert!(matches!(
            cancel_booking(conn, &partner_of(&restaurant), booking.id),
            Err(CoreError::Forbidden(_))
        ));

        // A different customer cannot cancel someone else's booking.
        assert!(matches!(
            cancel_booking(conn, &some_customer(), booking.id),
            Err(CoreError::Forbidden(_))
        ));
    }

    #[test]
    fn booking_lifecycle_end_to_end() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, restaurant.id, "10:00", "12:00", Some(1), true);
        let partner = partner_of(&restaurant);
        let day = future_date(30);

        let book = |conn: &mut PgConnection, customer: &Principal| {
            create_booking(
                conn,
                customer,
                BookingRequest {
                    restaurant_id: restaurant.id,
                    time_slot_id: slot.id,
                    booking_date: day,
                    number_of_guests: 2,
                    special_request: Some("Window seat please".to_string()),
                },
            )
        };

        // Customer A takes the only seat.
        let customer_a = some_customer();
        let booking = book(conn, &customer_a).unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        let a = availability_for_slot(conn, restaurant.id, day, slot.id).unwrap();
        assert_eq!(a.current_bookings, 1);
        assert!(!a.available);

        // Customer B loses the race.
        let customer_b = some_customer();
        assert!(matches!(
            book(conn, &customer_b),
            Err(CoreError::CapacityExceeded { .. })
        ));

        // Confirmation does not change the seat count.
        let confirmed = confirm_booking(conn, &partner, booking.id).unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert!(confirmed.confirmed_at.is_some());
        let a = availability_for_slot(conn, restaurant.id, day, slot.id).unwrap();
        assert_eq!(a.current_bookings, 1);

        // Cancellation releases the seat and customer B can retry.
        cancel_booking(conn, &customer_a, booking.id).unwrap();
        let a = availability_for_slot(conn, restaurant.id, day, slot.id).unwrap();
        assert_eq!(a.current_bookings, 0);
        assert!(a.available);

        let retry = book(conn, &customer_b).unwrap();
        assert_eq!(retry.status, BookingStatus::Pending);
    }

    #[test]
    fn visibility_follows_ownership() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, restaurant.id, "10:00", "12:00", Some(5), true);
        let booking = create_booking(conn, &some_customer(), request(&restaurant, &slot)).unwrap();

        // Owner and owning partner see it.
        get_booking(conn, &customer_of(&booking), booking.id).unwrap();
        get_booking(conn, &partner_of(&restaurant), booking.id).unwrap();
        let admin = Principal {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        get_booking(conn, &admin, booking.id).unwrap();

        // Everyone else gets a 404-equivalent, not a 403.
        assert!(matches!(
            get_booking(conn, &some_customer(), booking.id),
            Err(CoreError::NotFound(_))
        ));
        let other = insert_restaurant(conn, RestaurantStatus::Approved);
        assert!(matches!(
            get_booking(conn, &partner_of(&other), booking.id),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn list_filters_and_orders() {
        let conn = &mut establish_connection();
        let restaurant = insert_restaurant(conn, RestaurantStatus::Approved);
        let slot = insert_slot(conn, restaurant.id, "10:00", "12:00", None, true);
        let partner = partner_of(&restaurant);
        let customer = some_customer();

        let mut early = request(&restaurant, &slot);
        early.booking_date = future_date(7);
        let first = create_booking(conn, &customer, early).unwrap();
        let mut late = request(&restaurant, &slot);
        late.booking_date = future_date(28);
        let second = create_booking(conn, &customer, late).unwrap();
        confirm_booking(conn, &partner, second.id).unwrap();

        // Customers only ever see their own bookings.
        let mine = list_bookings(conn, &customer, &BookingFilter::default()).unwrap();
        assert_eq!(mine.len(), 2);
        // Default order is newest first.
        assert_eq!(mine[0].booking.id, second.id);

        let stranger = list_bookings(conn, &some_customer(), &BookingFilter::default()).unwrap();
        assert!(stranger.is_empty());

        let pending_only = list_bookings(
            conn,
            &partner,
            &BookingFilter {
                status: Some(BookingStatus::Pending),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(pending_only.len(), 1);
        assert_eq!(pending_only[0].booking.id, first.id);

        let windowed = list_bookings(
            conn,
            &partner,
            &BookingFilter {
                start_date: Some(future_date(14)),
                end_date: Some(future_date(35)),
                order_by: BookingOrder::BookingDateAsc,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].booking.id, second.id);
    }
}
