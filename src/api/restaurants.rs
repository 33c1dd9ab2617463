use axum::{
    Router,
    extract::{Path, Query},
    response::Json,
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::availability;
use crate::error::CoreError;
use crate::establish_connection;

use super::error::ApiError;
use super::models::*;

pub fn router() -> Router {
    Router::new().route(
        "/restaurants/{id}/available-slots/",
        get(available_slots),
    )
}

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub date: Option<String>,
}

#[utoipa::path(
    get,
    path = "/restaurants/{id}/available-slots/",
    params(
        ("id" = Uuid, Path, description = "Restaurant ID"),
        ("date" = String, Query, description = "Date to check, YYYY-MM-DD"),
    ),
    responses(
        (status = 200, description = "Availability of every active slot on the date", body = AvailableSlotsResponse),
        (status = 400, description = "Missing or malformed date", body = ErrorResponse),
        (status = 404, description = "Restaurant not found", body = ErrorResponse),
    ),
    tag = "restaurants"
)]
#[instrument]
pub async fn available_slots(
    Path(id): Path<Uuid>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<AvailableSlotsResponse>, ApiError> {
    let date = query
        .date
        .ok_or_else(|| CoreError::validation("date", "Date parameter is required"))
        .and_then(|value| {
            NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                .map_err(|_| CoreError::validation("date", "Invalid date format. Use YYYY-MM-DD"))
        })
        .map_err(ApiError::Core)?;

    let conn = &mut establish_connection();
    let all = availability::availability_for_date(conn, id, date)?;

    Ok(Json(AvailableSlotsResponse {
        date,
        available_slots: all.iter().map(SlotAvailabilityResponse::from).collect(),
    }))
}
