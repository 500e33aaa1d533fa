use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::{request::SubmitScoreRequest, response::MessageResponse},
};

#[post("/leaderboard")]
pub async fn submit_score(
    state: web::Data<AppState>,
    request: web::Json<SubmitScoreRequest>,
) -> Result<HttpResponse, AppError> {
    state
        .leaderboard_service
        .submit_score(request.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Score saved successfully".to_string(),
    }))
}

#[get("/leaderboard")]
pub async fn get_leaderboard(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let entries = state.leaderboard_service.top_scores().await?;
    Ok(HttpResponse::Ok().json(entries))
}
