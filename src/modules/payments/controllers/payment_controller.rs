use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::core::error::AppError;
use crate::modules::payments::models::PaymentRequest;
use crate::modules::payments::services::PaymentService;

/// Pay one loan bill
/// POST /payments
///
/// The payment is stored PENDING and queued; settlement happens asynchronously.
pub async fn create_payment(
    service: web::Data<Arc<PaymentService>>,
    request: web::Json<PaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let payment = service.submit(&request).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Payment accepted for processing",
        "data": payment,
    })))
}

/// GET /payments/{id}
pub async fn get_payment(
    service: web::Data<Arc<PaymentService>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let payment = service.get_payment(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "data": payment })))
}

/// Configure payment routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("", web::post().to(create_payment))
            .route("/{id}", web::get().to(get_payment)),
    );
}
