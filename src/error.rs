use thiserror::Error;

use crate::models::BookingStatus;

/// Outcome taxonomy shared by the registry, the availability calculator and
/// the lifecycle engine. Every variant is an expected, local result of
/// contention or invalid input; nothing here is fatal to the process.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Time slot is fully booked ({current}/{max})")]
    CapacityExceeded { current: i64, max: i32 },
    #[error("Cannot move booking from {current} to {attempted}")]
    InvalidTransition {
        current: BookingStatus,
        attempted: BookingStatus,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Unexpected database error")]
    Database(#[from] diesel::result::Error),
}

impl CoreError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field,
            message: message.into(),
        }
    }
}
