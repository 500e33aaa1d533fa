pub mod health_handler;
pub mod leaderboard_handler;
pub mod mcq_handler;

use actix_web::web;

use crate::errors::AppError;

pub use health_handler::health_check;
pub use leaderboard_handler::{get_leaderboard, submit_score};
pub use mcq_handler::ask;

/// Registers every route plus a JSON extractor that reports malformed bodies
/// in the standard error payload.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(64 * 1024).error_handler(|err, _req| {
        AppError::ValidationError(err.to_string()).into()
    }))
    .service(ask)
    .service(submit_score)
    .service(get_leaderboard)
    .service(health_check);
}
