use std::sync::Arc;

use actix_web::{web, HttpResponse};
use tracing::Instrument;

use crate::core::AppError;
use crate::middleware::RequestIdValue;
use crate::modules::receipts::models::CreateReceiptRequest;
use crate::modules::receipts::services::ReceiptService;

/// Issue a receipt for a fully settled invoice
/// POST /invoices/{id}/receipts
pub async fn issue_receipt(
    service: web::Data<Arc<ReceiptService>>,
    request_id: RequestIdValue,
    path: web::Path<String>,
    request: web::Json<CreateReceiptRequest>,
) -> Result<HttpResponse, AppError> {
    let receipt = service
        .issue_receipt(&path.into_inner(), request.into_inner())
        .instrument(tracing::info_span!("issue_receipt", request_id = %request_id))
        .await?;

    Ok(HttpResponse::Created().json(receipt))
}

/// GET /invoices/{id}/receipts
pub async fn list_receipts(
    service: web::Data<Arc<ReceiptService>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let receipts = service.list_receipts(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(receipts))
}

/// GET /receipts/{id}
pub async fn get_receipt(
    service: web::Data<Arc<ReceiptService>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let receipt = service.get_receipt(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(receipt))
}

/// Configure receipt routes
pub fn configure_receipt_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/invoices/{id}/receipts")
            .route(web::post().to(issue_receipt))
            .route(web::get().to(list_receipts)),
    )
    .service(web::resource("/receipts/{id}").route(web::get().to(get_receipt)));
}
