use std::io::Write;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{bookings, outbox, restaurants, time_slots};

#[derive(
    FromSqlRow, AsExpression, Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Debug, Hash,
)]
#[diesel(sql_type = crate::schema::sql_types::BookingStatus)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
    Completed,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::NoShow => "NO_SHOW",
        }
    }

    /// Statuses which hold a seat against slot capacity. A PENDING request
    /// provisionally occupies a seat until the partner decides on it.
    pub fn counts_against_capacity(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// No transition is permitted out of a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected
                | BookingStatus::Cancelled
                | BookingStatus::Completed
                | BookingStatus::NoShow
        )
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "REJECTED" => Ok(BookingStatus::Rejected),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "NO_SHOW" => Ok(BookingStatus::NoShow),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql<crate::schema::sql_types::BookingStatus, Pg> for BookingStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::BookingStatus, Pg> for BookingStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"PENDING" => Ok(BookingStatus::Pending),
            b"CONFIRMED" => Ok(BookingStatus::Confirmed),
            b"REJECTED" => Ok(BookingStatus::Rejected),
            b"CANCELLED" => Ok(BookingStatus::Cancelled),
            b"COMPLETED" => Ok(BookingStatus::Completed),
            b"NO_SHOW" => Ok(BookingStatus::NoShow),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[derive(FromSqlRow, AsExpression, Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Debug)]
#[diesel(sql_type = crate::schema::sql_types::RestaurantStatus)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestaurantStatus {
    Pending,
    Approved,
    Suspended,
    Closed,
}

impl ToSql<crate::schema::sql_types::RestaurantStatus, Pg> for RestaurantStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            RestaurantStatus::Pending => out.write_all(b"PENDING")?,
            RestaurantStatus::Approved => out.write_all(b"APPROVED")?,
            RestaurantStatus::Suspended => out.write_all(b"SUSPENDED")?,
            RestaurantStatus::Closed => out.write_all(b"CLOSED")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::RestaurantStatus, Pg> for RestaurantStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"PENDING" => Ok(RestaurantStatus::Pending),
            b"APPROVED" => Ok(RestaurantStatus::Approved),
            b"SUSPENDED" => Ok(RestaurantStatus::Suspended),
            b"CLOSED" => Ok(RestaurantStatus::Closed),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl std::str::FromStr for RestaurantStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RestaurantStatus::Pending),
            "APPROVED" => Ok(RestaurantStatus::Approved),
            "SUSPENDED" => Ok(RestaurantStatus::Suspended),
            "CLOSED" => Ok(RestaurantStatus::Closed),
            _ => Err(()),
        }
    }
}

/// Role of the authenticated caller, as asserted by the upstream gateway.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Role {
    Customer,
    Partner,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CUSTOMER" => Ok(Role::Customer),
            "PARTNER" => Ok(Role::Partner),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// Request-scoped authenticated caller. Authentication itself is handled
/// upstream; every core operation receives the principal explicitly.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

/// Local replica of the restaurant service's records, maintained by the
/// event consumer. The booking core only ever reads it.
#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, PartialEq)]
#[diesel(table_name = restaurants)]
pub struct Restaurant {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub name: String,
    pub status: RestaurantStatus,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, Debug, PartialEq, Clone)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = time_slots)]
pub struct TimeSlot {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_bookings: Option<i32>,
    pub is_active: bool,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, Debug, PartialEq, Clone)]
#[diesel(belongs_to(Restaurant))]
#[diesel(belongs_to(TimeSlot))]
#[diesel(table_name = bookings)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub restaurant_id: Uuid,
    pub time_slot_id: Uuid,
    pub booking_date: NaiveDate,
    pub number_of_guests: i32,
    pub special_request: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn can_cancel(&self) -> bool {
        matches!(self.status, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn can_confirm(&self) -> bool {
        self.status == BookingStatus::Pending
    }

    pub fn can_reject(&self) -> bool {
        self.status == BookingStatus::Pending
    }

    pub fn can_complete(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    pub fn can_mark_no_show(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

#[derive(Queryable, Selectable, Debug, PartialEq)]
#[diesel(table_name = outbox)]
pub struct Outbox {
    pub id: i32,
    pub topic: String,
    pub key: String,
    pub value: Value,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = outbox)]
pub struct NewOutbox {
    pub topic: String,
    pub key: String,
    pub value: Value,
}
