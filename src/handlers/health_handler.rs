use actix_web::{get, web, HttpResponse};

use crate::{app_state::AppState, models::dto::response::HealthResponse};

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let database = match &state.db {
        Some(db) => match db.health_check().await {
            Ok(()) => "ok",
            Err(err) => {
                log::warn!("Database health check failed: {}", err);
                "error"
            }
        },
        None => "not_configured",
    };

    let response = HealthResponse {
        status: if database == "error" { "degraded" } else { "healthy" }.to_string(),
        database: database.to_string(),
    };

    if database == "error" {
        HttpResponse::ServiceUnavailable().json(response)
    } else {
        HttpResponse::Ok().json(response)
    }
}
