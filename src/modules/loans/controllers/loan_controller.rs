use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::Local;
use serde_json::json;

use crate::core::error::AppError;
use crate::modules::loans::models::LoanRequest;
use crate::modules::loans::services::LoanService;

/// Create a loan and its weekly bill schedule
/// POST /loans
pub async fn create_loan(
    service: web::Data<Arc<LoanService>>,
    request: web::Json<LoanRequest>,
) -> Result<HttpResponse, AppError> {
    let loan = service
        .create_loan(request.into_inner(), Local::now().date_naive())
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Loan created",
        "data": loan,
    })))
}

/// GET /loans/{id}
pub async fn get_loan(
    service: web::Data<Arc<LoanService>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let loan = service.get_loan(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "data": loan })))
}

/// List a user's loans with their bills
/// GET /users/{user_id}/loans
pub async fn list_user_loans(
    service: web::Data<Arc<LoanService>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let loans = service.get_loans_with_bills(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "data": loans })))
}

/// Configure loan routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/loans")
            .route("", web::post().to(create_loan))
            .route("/{id}", web::get().to(get_loan)),
    )
    .service(web::scope("/users").route("/{user_id}/loans", web::get().to(list_user_loans)));
}
