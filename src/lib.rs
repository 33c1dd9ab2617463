use std::env;

use diesel::{Connection, PgConnection};
use dotenvy::dotenv;

pub mod api;
pub mod availability;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod schema;
pub mod slots;

#[cfg(test)]
pub mod testutil;

pub const EVENT_CHANNEL: &str = "booking.event";
pub const RESTAURANT_EVENT_CHANNEL: &str = "restaurant.event";

pub fn establish_connection() -> PgConnection {
    dotenv().ok();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgConnection::establish(&database_url)
        .unwrap_or_else(|_| panic!("Error connecting to {}", database_url))
}
