use actix_web::{post, web, HttpRequest, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    middleware::get_request_id,
    models::dto::{request::AskRequest, response::AskResponse},
};

#[post("/ask")]
pub async fn ask(
    req: HttpRequest,
    state: web::Data<AppState>,
    request: web::Json<AskRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    log::info!(
        "[{}] /ask category={} chapter={:?} count={} session={}",
        get_request_id(&req).unwrap_or_default(),
        request.category,
        request.chapter,
        request.count,
        request.session_id
    );

    let records = state.mcq_service.ask(request).await?;
    Ok(HttpResponse::Ok().json(AskResponse::from_records(records)))
}
