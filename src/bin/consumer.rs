use std::{env, thread::sleep, time::Duration};

use diesel::{dsl::insert_into, ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl};
use dotenvy::dotenv;
use kafka::{
    client::{FetchOffset, GroupOffsetStorage},
    consumer::Consumer,
};
use serde::Deserialize;
use uuid::Uuid;

use tablebook_booking_service::models::{Restaurant, RestaurantStatus};
use tablebook_booking_service::{establish_connection, schema, RESTAURANT_EVENT_CHANNEL};

const GROUP: &str = "booking-service";

/// Events the restaurant service publishes about its own aggregate. Only the
/// fields the booking replica needs are deserialized.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RestaurantEvent {
    #[serde(rename = "RESTAURANT_CREATED")]
    Created {
        id: Uuid,
        partner_id: Uuid,
        name: String,
        status: RestaurantStatus,
    },
    #[serde(rename = "RESTAURANT_STATUS_CHANGED")]
    StatusChanged { id: Uuid, status: RestaurantStatus },
    #[serde(rename = "RESTAURANT_UPDATED")]
    Updated { id: Uuid, name: String },
    #[serde(other)]
    Ignored,
}

impl RestaurantEvent {
    fn from(topic: &str, value: &[u8]) -> Option<Self> {
        match topic {
            RESTAURANT_EVENT_CHANNEL => match serde_json::from_slice(value) {
                Ok(event) => Some(event),
                Err(err) => {
                    tracing::warn!("Cannot decode restaurant event: {err}");
                    None
                }
            },
            _ => None,
        }
    }

    fn process(self, conn: &mut PgConnection) {
        use schema::restaurants::dsl::*;

        match self {
            RestaurantEvent::Created {
                id: rid,
                partner_id: pid,
                name: restaurant_name,
                status: restaurant_status,
            } => {
                let restaurant = Restaurant {
                    id: rid,
                    partner_id: pid,
                    name: restaurant_name,
                    status: restaurant_status,
                };
                insert_into(restaurants)
                    .values(&restaurant)
                    .on_conflict(id)
                    .do_update()
                    .set((
                        partner_id.eq(restaurant.partner_id),
                        name.eq(restaurant.name.clone()),
                        status.eq(restaurant.status),
                    ))
                    .execute(conn)
                    .expect("Error while upserting restaurant");
            }
            RestaurantEvent::StatusChanged {
                id: rid,
                status: new_status,
            } => {
                diesel::update(restaurants.filter(id.eq(rid)))
                    .set(status.eq(new_status))
                    .execute(conn)
                    .expect("Error while updating restaurant status");
            }
            RestaurantEvent::Updated {
                id: rid,
                name: new_name,
            } => {
                diesel::update(restaurants.filter(id.eq(rid)))
                    .set(name.eq(new_name))
                    .execute(conn)
                    .expect("Error while updating restaurant");
            }
            RestaurantEvent::Ignored => {}
        }
    }
}

fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();
    let kafka_url = env::var("KAFKA_URL").expect("KAFKA_URL must be set");

    let mut conn = establish_connection();
    let mut consumer = Consumer::from_hosts(vec![kafka_url])
        .with_topic(RESTAURANT_EVENT_CHANNEL.to_string())
        .with_group(GROUP.to_string())
        .with_fallback_offset(FetchOffset::Earliest)
        .with_offset_storage(Some(GroupOffsetStorage::Kafka))
        .create()
        .unwrap();

    loop {
        let mss = consumer.poll().expect("Cannot poll messages");
        if mss.is_empty() {
            sleep(Duration::from_secs(1));
            continue;
        }

        for ms in mss.iter() {
            for m in ms.messages() {
                if let Some(event) = RestaurantEvent::from(ms.topic(), m.value) {
                    event.process(&mut conn);
                }
            }
            let _ = consumer.consume_messageset(ms);
        }
        consumer
            .commit_consumed()
            .expect("Error while commit consumed");
    }
}
