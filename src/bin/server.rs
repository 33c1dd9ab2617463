use std::env;

use axum::Router;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tablebook_booking_service::api::{
    bookings_router, restaurants_router, slots_router, ApiDoc,
};
use tablebook_booking_service::establish_connection;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let conn = &mut establish_connection();
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Error while running migrations");

    let app = Router::new()
        .merge(restaurants_router())
        .merge(slots_router())
        .merge(bookings_router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive());

    let addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8105".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Booking service listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
