use diesel::{prelude::*, PgConnection};
use serde_json::json;
use uuid::Uuid;

use crate::models::{Booking, NewOutbox};
use crate::schema;
use crate::EVENT_CHANNEL;

/// Writes booking lifecycle events into the transactional outbox. The
/// producer binary drains the outbox to kafka, where the notification
/// service picks them up; delivery and formatting are its concern, not ours.
///
/// Must be called inside the same transaction as the status change so an
/// event exists exactly when the transition committed.
pub struct BookingEventPublisher<'a> {
    conn: &'a mut PgConnection,
}

impl<'a> BookingEventPublisher<'a> {
    pub fn new(conn: &'a mut PgConnection) -> Self {
        Self { conn }
    }

    /// New PENDING booking. Routed to the partner owning the restaurant.
    pub fn booking_created(
        &mut self,
        booking: &Booking,
        partner_id: Uuid,
    ) -> Result<(), diesel::result::Error> {
        self.publish(booking, partner_id)
    }

    /// Partner confirmed. Routed to the customer.
    pub fn booking_confirmed(&mut self, booking: &Booking) -> Result<(), diesel::result::Error> {
        self.publish(booking, booking.customer_id)
    }

    /// Partner rejected. Routed to the customer.
    pub fn booking_rejected(&mut self, booking: &Booking) -> Result<(), diesel::result::Error> {
        self.publish(booking, booking.customer_id)
    }

    /// Customer cancelled. Routed to the partner owning the restaurant.
    pub fn booking_cancelled(
        &mut self,
        booking: &Booking,
        partner_id: Uuid,
    ) -> Result<(), diesel::result::Error> {
        self.publish(booking, partner_id)
    }

    /// Visit completed. Routed to the customer.
    pub fn booking_completed(&mut self, booking: &Booking) -> Result<(), diesel::result::Error> {
        self.publish(booking, booking.customer_id)
    }

    /// Customer did not show up. Routed to the customer.
    pub fn booking_no_show(&mut self, booking: &Booking) -> Result<(), diesel::result::Error> {
        self.publish(booking, booking.customer_id)
    }

    fn publish(
        &mut self,
        booking: &Booking,
        recipient_id: Uuid,
    ) -> Result<(), diesel::result::Error> {
        let event = json!({
            "type": "BOOKING",
            "booking_id": booking.id,
            "new_status": booking.status,
            "recipient_id": recipient_id,
            "restaurant_id": booking.restaurant_id,
            "booking_date": booking.booking_date,
        });

        diesel::insert_into(schema::outbox::table)
            .values(NewOutbox {
                topic: EVENT_CHANNEL.to_string(),
                key: booking.restaurant_id.to_string(),
                value: event,
            })
            .execute(self.conn)?;

        Ok(())
    }
}
