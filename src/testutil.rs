//! Fixtures for the DB-backed test suites. Every fixture uses fresh UUIDs so
//! suites can run concurrently against one database.

use chrono::{NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, Principal, Restaurant, RestaurantStatus, Role, TimeSlot,
};
use crate::schema;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

pub fn future_date(days: u64) -> NaiveDate {
    Utc::now().date_naive() + chrono::Days::new(days)
}

pub fn partner_of(restaurant: &Restaurant) -> Principal {
    Principal {
        user_id: restaurant.partner_id,
        role: Role::Partner,
    }
}

pub fn customer_of(booking: &Booking) -> Principal {
    Principal {
        user_id: booking.customer_id,
        role: Role::Customer,
    }
}

pub fn some_customer() -> Principal {
    Principal {
        user_id: Uuid::new_v4(),
        role: Role::Customer,
    }
}

pub fn insert_restaurant(conn: &mut PgConnection, status: RestaurantStatus) -> Restaurant {
    let restaurant = Restaurant {
        id: Uuid::new_v4(),
        partner_id: Uuid::new_v4(),
        name: "Test Restaurant".to_string(),
        status,
    };
    diesel::insert_into(schema::restaurants::table)
        .values(&restaurant)
        .execute(conn)
        .unwrap();
    restaurant
}

pub fn insert_slot(
    conn: &mut PgConnection,
    restaurant_id: Uuid,
    start: &str,
    end: &str,
    max_bookings: Option<i32>,
    is_active: bool,
) -> TimeSlot {
    let slot = TimeSlot {
        id: Uuid::new_v4(),
        restaurant_id,
        start_time: time(start),
        end_time: time(end),
        max_bookings,
        is_active,
    };
    diesel::insert_into(schema::time_slots::table)
        .values(&slot)
        .execute(conn)
        .unwrap();
    slot
}

/// Inserts a booking directly, bypassing the engine. For seeding state the
/// engine itself would not produce (historical or terminal rows).
pub fn insert_booking(
    conn: &mut PgConnection,
    restaurant: &Restaurant,
    slot: &TimeSlot,
    booking_date: NaiveDate,
    status: BookingStatus,
) -> Booking {
    let confirmed_at = match status {
        BookingStatus::Confirmed | BookingStatus::Completed | BookingStatus::NoShow => {
            Some(Utc::now())
        }
        _ => None,
    };
    let booking = Booking {
        id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        restaurant_id: restaurant.id,
        time_slot_id: slot.id,
        booking_date,
        number_of_guests: 2,
        special_request: None,
        status,
        created_at: Utc::now(),
        confirmed_at,
    };
    diesel::insert_into(schema::bookings::table)
        .values(&booking)
        .execute(conn)
        .unwrap();
    booking
}
